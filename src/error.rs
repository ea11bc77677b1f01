//! Connector Error Taxonomy
//!
//! Transient faults (`Network`, `StreamClosed`) are absorbed by the
//! supervisor and retried through backoff. `Decode` is per-frame and
//! never fatal. Only `Config` and `Shutdown` reach the caller directly.

use rust_decimal::Decimal;
use thiserror::Error;

/// Why a single payload could not be turned into a typed value.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid JSON.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload parsed, but is not a structured record.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Profit field present but not a number.
    #[error("profit field `{field}` is not numeric: {value}")]
    InvalidProfit { field: &'static str, value: String },

    /// Profit is numeric but beyond what a `Decimal` can hold.
    #[error("profit field `{field}` is out of range: {value}")]
    ProfitOutOfRange { field: &'static str, value: String },

    /// Profit field parsed to a negative amount.
    #[error("profit must be non-negative, got {0}")]
    NegativeProfit(Decimal),
}

/// Errors surfaced by transports, the supervisor and the connector façade.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Connect or request failure; always retried by the supervisor.
    #[error("network error: {0}")]
    Network(String),

    /// The peer closed the push stream or the socket errored mid-read.
    #[error("stream closed: {0}")]
    StreamClosed(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Invalid configuration, reported before any loop starts.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Lifecycle misuse of the connector façade.
    #[error("shutdown error: {0}")]
    Shutdown(ShutdownReason),
}

/// Lifecycle misuse reported by [`ConnectorError::Shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShutdownReason {
    #[error("connector was never started")]
    NotStarted,
    #[error("connector is already running")]
    AlreadyStarted,
    #[error("connector is already stopped")]
    AlreadyStopped,
}

impl ConnectorError {
    /// Whether the supervisor should retry after this error.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::StreamClosed(_))
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ConnectorError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Network(e.to_string())
    }
}
