use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

use crate::server::middleware::api_key_auth;
use crate::server::AppState;

use super::events::{broadcast_event, publish_event};
use super::health::{health, list_sessions, session_stats};
use super::metrics::prometheus_metrics;

/// Largest event body accepted by the publishing endpoints
const MAX_EVENT_BODY_BYTES: usize = 64 * 1024;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{code}/stats", get(session_stats))
        // Publishing endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route("/sessions/{code}/events", post(publish_event))
                .route("/sessions/{code}/broadcast", post(broadcast_event))
                .layer(RequestBodyLimitLayer::new(MAX_EVENT_BODY_BYTES))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
