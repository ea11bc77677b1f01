//! Use Cases Layer - Connector Runtime
//!
//! Orchestrates domain logic with the transport port:
//! - `EventChannel`: bounded, backpressured delivery to the consumer
//! - `ConnectionSupervisor`: connect / stream / backoff / reconnect
//! - `StatusPoller`: periodic status queries
//! - `Connector`: the façade the consumer instantiates

pub mod connector;
pub mod event_channel;
pub mod status_poller;
pub mod supervisor;

pub use connector::Connector;
pub use event_channel::{EventSender, EventStream, PushOutcome, event_channel};
pub use status_poller::StatusPoller;
pub use supervisor::ConnectionSupervisor;
