pub mod health;

pub use health::{AppStartTime, HealthService, health_routes};
