//! Transport Port - Request/Response and Push Channel Interface
//!
//! A thin I/O boundary: no retries, no decoding. The supervisor and the
//! status poller own all recovery, so tests can swap in a scripted or
//! mocked transport.

use async_trait::async_trait;

use crate::error::ConnectorError;

/// One raw message as delivered by the push channel.
pub type Frame = Vec<u8>;

/// Handle to an open push stream.
///
/// Yields one decodable unit per call. Reassembly of partial messages
/// is the implementor's job.
#[async_trait]
pub trait FrameStream: Send {
  /// Wait for the next frame.
  ///
  /// Fails with `StreamClosed` when the peer closes or the socket errors.
  /// Must be cancel-safe: dropping the future must not lose a frame
  /// that was not yet returned.
  async fn next_frame(&mut self) -> Result<Frame, ConnectorError>;
}

/// Connection to the remote MEV Shield service.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
  /// Fetch the raw status record.
  async fn request_status(&self) -> Result<Vec<u8>, ConnectorError>;

  /// Fetch the raw list of currently active opportunities.
  async fn request_opportunities(&self) -> Result<Vec<u8>, ConnectorError>;

  /// Open a fresh push stream.
  async fn open_stream(&self) -> Result<Box<dyn FrameStream>, ConnectorError>;
}
