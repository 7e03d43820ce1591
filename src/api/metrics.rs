//! Prometheus metrics endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::metrics::{self, MemoryMetrics, SessionMetrics};
use crate::server::AppState;

/// GET /metrics - Prometheus metrics endpoint
pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    update_metrics_from_state(&state);

    match metrics::encode_metrics() {
        Ok(output) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode Prometheus metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(axum::http::header::CONTENT_TYPE, "text/plain")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Refresh gauges from the live registry before encoding
fn update_metrics_from_state(state: &AppState) {
    let health = state.broadcast_manager.get_health_metrics();
    SessionMetrics::update(health.active_sessions, health.total_clients);
    MemoryMetrics::update_process(health.memory.resident_bytes, health.uptime_seconds);
}
