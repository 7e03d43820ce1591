//! API layer - HTTP endpoint handlers organized by domain.

mod events;
mod health;
mod metrics;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use events::{broadcast_event, publish_event, BroadcastRequest, BroadcastResponse, PublishResponse};
pub use health::{health, list_sessions, session_stats, HealthResponse, SessionListResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
