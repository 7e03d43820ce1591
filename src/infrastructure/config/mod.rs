mod settings;

pub use settings::{ApiConfig, HealthConfig, OtelConfig, ServerConfig, Settings, SseConfig};
