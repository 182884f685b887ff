pub mod app_config;
pub mod observability;
pub mod scheduling;

// Re-export main types for easier imports
pub use app_config::AppConfig;
pub use observability::ObservabilityConfig;
pub use scheduling::{RetryPolicyConfig, SchedulingConfig};
