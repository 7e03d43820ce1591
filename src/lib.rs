// Infrastructure layer (shared components)
pub mod infrastructure;

// Re-export infrastructure modules at the crate root
pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;

// Domain layer
pub mod realtime;

// Application layer
pub mod api;
pub mod server;
pub mod sse;

// Supporting modules
pub mod tasks;
pub mod telemetry;
