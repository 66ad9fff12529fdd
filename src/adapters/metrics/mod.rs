//! Metrics and Monitoring Adapters
//!
//! Prometheus metrics export and health probes, served as unauthenticated
//! routes on the API listener.

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use prometheus::MetricsRegistry;
