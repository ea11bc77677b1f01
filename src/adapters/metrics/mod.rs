//! Metrics and Monitoring Adapters
//!
//! Per-connector Prometheus registry plus an optional axum server
//! exposing /live, /ready and /metrics.

pub mod health;
pub mod prometheus;

pub use health::HealthServer;
pub use prometheus::ConnectorMetrics;
