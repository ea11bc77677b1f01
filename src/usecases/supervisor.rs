//! Connection Supervisor - Connect / Stream / Backoff / Reconnect
//!
//! Owns the push stream and the published `ConnectionState`:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting ...
//!                      \________________________/
//!                        open_stream() failed
//! any non-terminal state -> Closed (shutdown)
//! ```
//!
//! Every frame goes through the decoder; decoded opportunities are pushed
//! into the event channel in arrival order, undecodable frames are counted
//! and skipped. After a lost stream is re-established a `Gap` marker is
//! emitted before the first new event.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::event_channel::{EventSender, PushOutcome};
use crate::adapters::metrics::ConnectorMetrics;
use crate::domain::{BackoffPolicy, ConnectionState, ConnectorEvent, Decoder};
use crate::error::ConnectorError;
use crate::ports::transport::{FrameStream, Transport};

/// How a streaming session ended.
enum SessionEnd {
  /// Shutdown requested or the consumer went away.
  Shutdown,
  /// Read failed; reconnect.
  Lost(ConnectorError),
}

/// Drives the reconnect state machine for one transport.
pub struct ConnectionSupervisor<T: Transport> {
  /// Push/request transport.
  transport: Arc<T>,
  /// Frame decoder.
  decoder: Decoder,
  /// Reconnect delay policy.
  backoff: BackoffPolicy,
  /// Producer half of the event channel.
  events: EventSender,
  /// Sole writer of the published connection state.
  state_tx: watch::Sender<ConnectionState>,
  /// Shared metrics.
  metrics: Arc<ConnectorMetrics>,
  /// Jitter source.
  rng: StdRng,
}

impl<T: Transport> ConnectionSupervisor<T> {
  /// Create a supervisor. It publishes states through `state_tx`.
  pub fn new(
    transport: Arc<T>,
    backoff: BackoffPolicy,
    events: EventSender,
    state_tx: watch::Sender<ConnectionState>,
    metrics: Arc<ConnectorMetrics>,
  ) -> Self {
    Self {
      transport,
      decoder: Decoder::new(),
      backoff,
      events,
      state_tx,
      metrics,
      rng: StdRng::from_entropy(),
    }
  }

  /// Run until shutdown. Ends in `Closed`.
  ///
  /// Failures never escape: failed connects and lost streams are retried
  /// after a jittered, bounded backoff. A non-transient failure (a hook
  /// rejecting credentials, say) is logged at error level and jumps the
  /// backoff straight to its cap. The attempt counter resets on every
  /// successful connect.
  #[instrument(skip_all, name = "connection_supervisor")]
  pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut attempt: u32 = 0;
    let mut lost_at: Option<Instant> = None;

    self.transition(ConnectionState::Connecting);

    loop {
      let opened = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => break,
        result = self.transport.open_stream() => result,
      };

      match opened {
        Ok(stream) => {
          self.transition(ConnectionState::Connected);
          attempt = 0;

          if let Some(since) = lost_at.take() {
            let disconnected_for = since.elapsed();
            self.metrics.reconnects.inc();
            info!(
              disconnected_ms = disconnected_for.as_millis(),
              "Stream re-established, emitting gap marker"
            );
            if !self.emit(ConnectorEvent::Gap { disconnected_for }).await {
              break;
            }
          }

          match self.stream_session(stream, &mut shutdown_rx).await {
            SessionEnd::Shutdown => break,
            SessionEnd::Lost(e) => {
              warn!(error = %e, "Push stream lost");
              lost_at = Some(Instant::now());
            }
          }
        }
        Err(e) if e.is_transient() => {
          warn!(error = %e, attempt, "Failed to open push stream");
        }
        Err(e) => {
          error!(error = %e, attempt, "Push stream rejected, retrying at the backoff cap");
          attempt = attempt.max(self.backoff.attempts_to_cap());
        }
      }

      self.transition(ConnectionState::Reconnecting);

      let delay = self.backoff.delay(attempt, &mut self.rng);
      attempt = attempt.saturating_add(1);
      debug!(delay_ms = delay.as_millis(), attempt, "Backing off before reconnect");

      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => break,
        () = tokio::time::sleep(delay) => {}
      }

      self.transition(ConnectionState::Connecting);
    }

    self.transition(ConnectionState::Closed);
    info!("Connection supervisor stopped");
  }

  /// Read frames until the stream fails or shutdown is requested.
  async fn stream_session(
    &self,
    mut stream: Box<dyn FrameStream>,
    shutdown_rx: &mut broadcast::Receiver<()>,
  ) -> SessionEnd {
    loop {
      let frame = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => return SessionEnd::Shutdown,
        frame = stream.next_frame() => frame,
      };

      match frame {
        Ok(raw) => {
          if !self.forward(&raw).await {
            return SessionEnd::Shutdown;
          }
        }
        Err(e) => return SessionEnd::Lost(e),
      }
    }
  }

  /// Decode one frame and push it. Returns false once the channel is closed.
  async fn forward(&self, raw: &[u8]) -> bool {
    self.metrics.frames_received.inc();

    match self.decoder.decode(raw) {
      Ok(opportunity) => {
        self.metrics.opportunities_decoded.inc();
        self
          .emit(ConnectorEvent::Opportunity(Arc::new(opportunity)))
          .await
      }
      Err(e) => {
        self.metrics.decode_errors.inc();
        debug!(error = %e, len = raw.len(), "Skipping undecodable frame");
        true
      }
    }
  }

  async fn emit(&self, event: ConnectorEvent) -> bool {
    let outcome = self.events.push(event).await;
    self.metrics.record_push(outcome);
    outcome != PushOutcome::Closed
  }

  /// Publish a new state. Only legal edges are taken.
  fn transition(&self, next: ConnectionState) {
    let current = *self.state_tx.borrow();
    if current == next {
      return;
    }
    debug_assert!(
      current.can_transition_to(next),
      "illegal connection state transition {current} -> {next}"
    );
    self.state_tx.send_replace(next);
    self.metrics.set_state(next);
    info!(from = %current, to = %next, "Connection state changed");
  }
}
