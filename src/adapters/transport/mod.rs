//! Wire transports for the MEV Shield service.

pub mod ws;

pub use ws::WsTransport;
