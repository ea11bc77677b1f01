//! Ports Layer - Trait Interfaces (Hexagonal Architecture)
//!
//! Defines the boundaries between the connector's use cases and the
//! outside world. Adapters implement these; tests script or mock them.

pub mod connect_hook;
pub mod transport;

pub use connect_hook::{ConnectHook, ConnectRequest};
pub use transport::{Frame, FrameStream, Transport};
