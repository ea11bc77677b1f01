//! Status Poller - Periodic Health Query
//!
//! Queries the status endpoint on a fixed interval regardless of the
//! push stream's state. A failed poll becomes a `StatusUnavailable`
//! event for the consumer and is never escalated to the supervisor.
//! Polls are sequential, so snapshots arrive in request order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use super::event_channel::{EventSender, PushOutcome};
use crate::adapters::metrics::ConnectorMetrics;
use crate::domain::{ConnectorEvent, Decoder};
use crate::error::ConnectorError;
use crate::ports::transport::Transport;

/// Periodic status poller.
pub struct StatusPoller<T: Transport> {
  transport: Arc<T>,
  decoder: Decoder,
  interval: Duration,
  events: EventSender,
  metrics: Arc<ConnectorMetrics>,
}

impl<T: Transport> StatusPoller<T> {
  pub fn new(
    transport: Arc<T>,
    interval: Duration,
    events: EventSender,
    metrics: Arc<ConnectorMetrics>,
  ) -> Self {
    Self {
      transport,
      decoder: Decoder::new(),
      interval,
      events,
      metrics,
    }
  }

  /// Poll until shutdown. The first poll fires immediately.
  #[instrument(skip_all, name = "status_poller", fields(interval_ms = self.interval.as_millis()))]
  pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
      tokio::select! {
        biased;
        _ = shutdown_rx.recv() => break,
        _ = ticker.tick() => {}
      }

      let started = Instant::now();
      let result = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => break,
        result = self.transport.request_status() => result,
      };

      let event = self.to_event(result, started.elapsed());
      let outcome = self.events.push(event).await;
      self.metrics.record_push(outcome);
      if outcome == PushOutcome::Closed {
        debug!("Event channel closed, stopping status poller");
        break;
      }
    }

    info!("Status poller stopped");
  }

  fn to_event(&self, result: Result<Vec<u8>, ConnectorError>, latency: Duration) -> ConnectorEvent {
    let decoded = result.and_then(|raw| {
      self
        .decoder
        .decode_status(&raw, latency)
        .map_err(ConnectorError::from)
    });

    match decoded {
      Ok(snapshot) => {
        self.metrics.status_latency.observe(latency.as_secs_f64());
        debug!(latency_ms = latency.as_millis(), "Status poll succeeded");
        ConnectorEvent::Status(Arc::new(snapshot))
      }
      Err(e) => {
        self.metrics.status_failures.inc();
        warn!(error = %e, "Status poll failed");
        ConnectorEvent::StatusUnavailable {
          reason: e.to_string(),
        }
      }
    }
  }
}
