use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::api_routes;
use crate::sse::sse_handler;

use super::AppState;

pub fn create_app(state: AppState) -> Router {
    // Viewers may be served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // SSE endpoint
        .route("/api/sessions/{code}/stream", get(sse_handler))
        // Merge API routes
        .merge(api_routes(state.clone()))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Add state
        .with_state(state)
}
