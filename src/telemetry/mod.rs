//! Tracing initialization with optional OpenTelemetry export.
//!
//! Console logging is always on. When `otel.enabled` is set, spans are also
//! exported over OTLP gRPC to a collector such as Jaeger or Tempo.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RUST_LOG` | Log filter directives | `info` |
//! | `OTEL__ENABLED` | Enable OpenTelemetry tracing | `false` |
//! | `OTEL__ENDPOINT` | OTLP gRPC endpoint | `http://localhost:4317` |
//! | `OTEL__SERVICE_NAME` | Service name in traces | `quiz-realtime-service` |
//! | `OTEL__SAMPLING_RATIO` | Trace sampling ratio (0.0-1.0) | `1.0` |

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::OtelConfig;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to build OTLP exporter: {0}")]
    ExporterBuild(String),
}

/// Keeps the tracer provider alive; flushes pending spans on drop.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            tracing::info!("Shutting down OpenTelemetry tracer provider");
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down tracer provider: {}", e);
            }
        }
    }
}

/// Install the global tracing subscriber.
///
/// The returned guard must be held for the lifetime of the process.
pub fn init_telemetry(config: &OtelConfig) -> TelemetryResult<TelemetryGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if config.enabled {
        let provider = init_otel_tracer(config)?;
        let tracer = provider.tracer("quiz-realtime-service");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .with(otel_layer)
            .init();

        tracing::info!(
            endpoint = %config.endpoint,
            service_name = %config.service_name,
            sampling_ratio = %config.sampling_ratio,
            "OpenTelemetry tracing initialized"
        );

        Ok(TelemetryGuard {
            provider: Some(provider),
        })
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();

        tracing::info!("Tracing initialized (OpenTelemetry disabled)");

        Ok(TelemetryGuard { provider: None })
    }
}

fn init_otel_tracer(config: &OtelConfig) -> TelemetryResult<SdkTracerProvider> {
    use opentelemetry::KeyValue;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| TelemetryError::ExporterBuild(e.to_string()))?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_sampler(sampler_for(config.sampling_ratio))
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ),
        ]))
        .build();

    Ok(provider)
}

fn sampler_for(ratio: f64) -> Sampler {
    if ratio >= 1.0 {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OtelConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.endpoint, "http://localhost:4317");
        assert_eq!(config.service_name, "quiz-realtime-service");
        assert_eq!(config.sampling_ratio, 1.0);
    }

    #[test]
    fn test_sampler_bounds() {
        assert!(matches!(sampler_for(1.5), Sampler::AlwaysOn));
        assert!(matches!(sampler_for(-0.1), Sampler::AlwaysOff));
        assert!(matches!(sampler_for(0.25), Sampler::TraceIdRatioBased(r) if r == 0.25));
    }

    #[test]
    fn test_telemetry_guard_without_provider() {
        let guard = TelemetryGuard { provider: None };
        drop(guard);
    }
}
