//! Connector Facade - One Object for the Consumer
//!
//! `new()` rejects invalid configuration up front. `start()` wires the
//! event channel and spawns the supervisor and status poller on the
//! current Tokio runtime.
//! `stop()` closes the channel first (so nothing is delivered after it
//! returns), signals both loops, and waits for them within the configured
//! shutdown timeout before aborting stragglers.
//!
//! Both methods take `&self`, so a connector behind an `Arc` can be
//! stopped from any task.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::event_channel::{EventSender, EventStream, event_channel};
use super::status_poller::StatusPoller;
use super::supervisor::ConnectionSupervisor;
use crate::adapters::metrics::ConnectorMetrics;
use crate::adapters::transport::WsTransport;
use crate::config::ConnectorConfig;
use crate::domain::{ConnectionState, Decoder, Opportunity, StatusSnapshot};
use crate::error::{ConnectorError, ShutdownReason};
use crate::ports::connect_hook::ConnectHook;
use crate::ports::transport::Transport;

/// Tasks and signals of a started connector.
struct Running {
  shutdown_tx: broadcast::Sender<()>,
  events: EventSender,
  tasks: Vec<(&'static str, JoinHandle<()>)>,
}

enum Lifecycle {
  Idle(watch::Sender<ConnectionState>),
  Running(Running),
  Stopped,
}

/// Client-side connector for the MEV Shield service.
pub struct Connector<T: Transport> {
  transport: Arc<T>,
  config: ConnectorConfig,
  decoder: Decoder,
  metrics: Arc<ConnectorMetrics>,
  state_rx: watch::Receiver<ConnectionState>,
  lifecycle: Mutex<Lifecycle>,
}

impl Connector<WsTransport> {
  /// Build a connector over the WebSocket/HTTP transport.
  pub fn from_config(config: ConnectorConfig) -> Result<Self, ConnectorError> {
    config.validate()?;
    let transport = WsTransport::new(&config)?;
    Self::new(transport, config)
  }

  /// Same as [`from_config`](Self::from_config) with a pre-connect hook.
  pub fn with_hook(
    config: ConnectorConfig,
    hook: Arc<dyn ConnectHook>,
  ) -> Result<Self, ConnectorError> {
    config.validate()?;
    let transport = WsTransport::new(&config)?.with_hook(hook);
    Self::new(transport, config)
  }
}

impl<T: Transport> Connector<T> {
  /// Create a connector over any transport.
  ///
  /// Fails with `Config` before anything is spawned.
  pub fn new(transport: T, config: ConnectorConfig) -> Result<Self, ConnectorError> {
    config.validate()?;

    let metrics = ConnectorMetrics::new()
      .map_err(|e| ConnectorError::Config(format!("metrics registry: {e}")))?;
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    Ok(Self {
      transport: Arc::new(transport),
      config,
      decoder: Decoder::new(),
      metrics: Arc::new(metrics),
      state_rx,
      lifecycle: Mutex::new(Lifecycle::Idle(state_tx)),
    })
  }

  /// Spawn the supervisor and status poller and hand out the event stream.
  ///
  /// Must be called from within a Tokio runtime. A connector starts once.
  #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
  pub fn start(&self) -> Result<EventStream, ConnectorError> {
    let mut lifecycle = self.lifecycle.lock();
    let state_tx = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
      Lifecycle::Idle(state_tx) => state_tx,
      Lifecycle::Running(running) => {
        *lifecycle = Lifecycle::Running(running);
        return Err(ConnectorError::Shutdown(ShutdownReason::AlreadyStarted));
      }
      Lifecycle::Stopped => {
        return Err(ConnectorError::Shutdown(ShutdownReason::AlreadyStopped));
      }
    };

    let (events, stream) = event_channel(
      self.config.event_channel_capacity,
      self.config.backpressure_policy,
      self.config.block_timeout(),
    );
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let supervisor = ConnectionSupervisor::new(
      Arc::clone(&self.transport),
      self.config.backoff(),
      events.clone(),
      state_tx,
      Arc::clone(&self.metrics),
    );
    let poller = StatusPoller::new(
      Arc::clone(&self.transport),
      self.config.status_poll_interval(),
      events.clone(),
      Arc::clone(&self.metrics),
    );

    let tasks = vec![
      ("supervisor", tokio::spawn(supervisor.run(shutdown_tx.subscribe()))),
      ("status_poller", tokio::spawn(poller.run(shutdown_tx.subscribe()))),
    ];

    *lifecycle = Lifecycle::Running(Running {
      shutdown_tx,
      events,
      tasks,
    });

    info!(
      capacity = self.config.event_channel_capacity,
      policy = ?self.config.backpressure_policy,
      "Connector started"
    );
    Ok(stream)
  }

  /// Stop both loops and close the event stream.
  ///
  /// Fails with `Shutdown` if the connector was never started or is
  /// already stopped. No event is delivered after this returns.
  pub async fn stop(&self) -> Result<(), ConnectorError> {
    let running = {
      let mut lifecycle = self.lifecycle.lock();
      match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
        Lifecycle::Running(running) => running,
        Lifecycle::Idle(state_tx) => {
          *lifecycle = Lifecycle::Idle(state_tx);
          return Err(ConnectorError::Shutdown(ShutdownReason::NotStarted));
        }
        Lifecycle::Stopped => {
          return Err(ConnectorError::Shutdown(ShutdownReason::AlreadyStopped));
        }
      }
    };

    info!("Stopping connector");
    running.events.close();
    let _ = running.shutdown_tx.send(());

    let timeout = self.config.shutdown_timeout();
    for (name, handle) in running.tasks {
      let abort = handle.abort_handle();
      match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(())) => debug!(task = name, "Task finished"),
        Ok(Err(e)) => warn!(task = name, error = %e, "Task ended abnormally"),
        Err(_) => {
          warn!(task = name, timeout_ms = timeout.as_millis(), "Task did not stop in time, aborting");
          abort.abort();
        }
      }
    }

    info!("Connector stopped");
    Ok(())
  }

  /// Latest published connection state.
  pub fn state(&self) -> ConnectionState {
    if matches!(*self.lifecycle.lock(), Lifecycle::Stopped) {
      return ConnectionState::Closed;
    }
    *self.state_rx.borrow()
  }

  /// Watch connection state changes.
  pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
    self.state_rx.clone()
  }

  /// One-shot status query, independent of the poller.
  pub async fn fetch_status(&self) -> Result<StatusSnapshot, ConnectorError> {
    let started = tokio::time::Instant::now();
    let raw = self.transport.request_status().await?;
    Ok(self.decoder.decode_status(&raw, started.elapsed())?)
  }

  /// One-shot query of the currently active opportunities.
  ///
  /// Entries that fail to decode are skipped and counted as decode errors.
  pub async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, ConnectorError> {
    let raw = self.transport.request_opportunities().await?;
    let entries = self.decoder.decode_batch(&raw)?;

    let mut opportunities = Vec::with_capacity(entries.len());
    for entry in entries {
      match entry {
        Ok(opportunity) => opportunities.push(opportunity),
        Err(e) => {
          self.metrics.decode_errors.inc();
          debug!(error = %e, "Skipping undecodable snapshot entry");
        }
      }
    }
    Ok(opportunities)
  }

  pub fn metrics(&self) -> Arc<ConnectorMetrics> {
    Arc::clone(&self.metrics)
  }

  pub const fn config(&self) -> &ConnectorConfig {
    &self.config
  }
}
