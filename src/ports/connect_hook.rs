//! Connect Hook Port - Pre-connect Authentication Interface
//!
//! Runs before every outbound request and stream open. The connector
//! does not prescribe a scheme; implementors add whatever headers the
//! deployment needs.

use async_trait::async_trait;

use crate::error::ConnectorError;

/// Outbound request being prepared by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
  /// Fully qualified target URL (http(s) or ws(s)).
  pub url: String,
  /// Extra headers to send, in insertion order.
  pub headers: Vec<(String, String)>,
}

impl ConnectRequest {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      headers: Vec::new(),
    }
  }

  /// Append a header.
  pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.headers.push((name.into(), value.into()));
  }
}

/// Pluggable pre-connect hook (authentication, tracing headers, ...).
///
/// An error aborts the attempt and is handled like a network failure.
#[async_trait]
pub trait ConnectHook: Send + Sync + 'static {
  async fn prepare(&self, request: &mut ConnectRequest) -> Result<(), ConnectorError>;
}
