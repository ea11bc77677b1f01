//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Concrete implementations of the port traits in `crate::ports`.
//!
//! - `transport`: HTTP status/snapshot requests and the WebSocket push stream
//! - `auth`: credential-injecting pre-connect hook
//! - `metrics`: Prometheus registry and the health/metrics HTTP server

pub mod auth;
pub mod metrics;
pub mod transport;
