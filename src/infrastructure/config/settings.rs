use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sse: SseConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Credentials for the event publishing routes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// Expected `X-API-Key` value; publishing is open when unset
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseConfig {
    /// Heartbeat interval in seconds (comment frame per connection)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: u64,
    /// Frames buffered per client before writes start waiting
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Health snapshot reporting interval in seconds
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_heartbeat_interval() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    64
}

fn default_report_interval() -> u64 {
    30
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "quiz-realtime-service".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("sse.heartbeat_interval", 30)?
            .set_default("sse.channel_capacity", 64)?
            .set_default("health.report_interval", 30)?
            .set_default("otel.enabled", false)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SERVER__PORT, API__KEY, SSE__HEARTBEAT_INTERVAL, OTEL__ENABLED, ...
            .add_source(
                Environment::default()
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the runtime cannot work with (zero timer periods, zero-sized buffers)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sse.heartbeat_interval == 0 {
            return Err(ConfigError::Message(
                "sse.heartbeat_interval must be at least 1 second".to_string(),
            ));
        }
        if self.sse.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "sse.channel_capacity must be at least 1".to_string(),
            ));
        }
        if self.health.report_interval == 0 {
            return Err(ConfigError::Message(
                "health.report_interval must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: default_heartbeat_interval(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            report_interval: default_report_interval(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}
