//! Domain layer - Connector value types and pure logic.
//!
//! No I/O lives here (hexagonal architecture inner ring). Values are
//! immutable once built and safe to share across tasks.

pub mod backoff;
pub mod decoder;
pub mod opportunity;
pub mod state;

// Re-export core types for convenience
pub use backoff::BackoffPolicy;
pub use decoder::Decoder;
pub use opportunity::{Category, ConnectorEvent, Opportunity, RawRecord, StatusSnapshot};
pub use state::ConnectionState;
