//! Background tasks.

mod health_reporter;

pub use health_reporter::HealthReporter;
