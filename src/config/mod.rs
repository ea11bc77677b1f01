//! Configuration Module - TOML-based Connector Configuration
//!
//! Loads and validates configuration from `config.toml`. Every tunable
//! of the connector lives here; nothing is hardcoded in the use cases.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::BackoffPolicy;
use crate::error::ConnectorError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Connection, backoff and channel settings.
  #[serde(default)]
  pub connector: ConnectorConfig,
  /// Log output.
  #[serde(default)]
  pub logging: LoggingConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// What the event channel does when the consumer falls behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackpressurePolicy {
  /// Evict the oldest buffered event to admit the new one.
  #[default]
  DropOldest,
  /// Wait up to `block_timeout_ms` for space, then drop the new event.
  BlockWithTimeout,
}

/// Connector settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
  /// Service address as `host:port`.
  #[serde(default = "default_endpoint")]
  pub endpoint: String,
  /// Use https/wss instead of http/ws.
  #[serde(default)]
  pub tls: bool,
  /// Status endpoint path.
  #[serde(default = "default_status_path")]
  pub status_path: String,
  /// Push stream path.
  #[serde(default = "default_stream_path")]
  pub stream_path: String,
  /// Opportunity snapshot path.
  #[serde(default = "default_opportunities_path")]
  pub opportunities_path: String,
  /// First reconnect delay (milliseconds).
  #[serde(default = "default_backoff_base")]
  pub backoff_base_ms: u64,
  /// Upper bound on the un-jittered reconnect delay (milliseconds).
  #[serde(default = "default_backoff_cap")]
  pub backoff_cap_ms: u64,
  /// Status poll period (milliseconds).
  #[serde(default = "default_poll_interval")]
  pub status_poll_interval_ms: u64,
  /// Event channel capacity.
  #[serde(default = "default_capacity")]
  pub event_channel_capacity: usize,
  /// Backpressure policy when the channel is full.
  #[serde(default)]
  pub backpressure_policy: BackpressurePolicy,
  /// Max stall under `block-with-timeout` (milliseconds).
  #[serde(default = "default_block_timeout")]
  pub block_timeout_ms: u64,
  /// HTTP request / WebSocket handshake timeout (milliseconds).
  #[serde(default = "default_request_timeout")]
  pub request_timeout_ms: u64,
  /// How long `stop()` waits for the loops before aborting them (milliseconds).
  #[serde(default = "default_shutdown_timeout")]
  pub shutdown_timeout_ms: u64,
}

impl Default for ConnectorConfig {
  fn default() -> Self {
    Self {
      endpoint: default_endpoint(),
      tls: false,
      status_path: default_status_path(),
      stream_path: default_stream_path(),
      opportunities_path: default_opportunities_path(),
      backoff_base_ms: default_backoff_base(),
      backoff_cap_ms: default_backoff_cap(),
      status_poll_interval_ms: default_poll_interval(),
      event_channel_capacity: default_capacity(),
      backpressure_policy: BackpressurePolicy::default(),
      block_timeout_ms: default_block_timeout(),
      request_timeout_ms: default_request_timeout(),
      shutdown_timeout_ms: default_shutdown_timeout(),
    }
  }
}

impl ConnectorConfig {
  /// Defaults for everything except the endpoint.
  pub fn new(endpoint: impl Into<String>) -> Self {
    Self {
      endpoint: endpoint.into(),
      ..Self::default()
    }
  }

  /// Check every field; the first violation becomes a `Config` error.
  pub fn validate(&self) -> Result<(), ConnectorError> {
    let bad = |msg: String| Err(ConnectorError::Config(msg));

    match self.endpoint.rsplit_once(':') {
      Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {}
      _ => return bad(format!("endpoint must be host:port, got {:?}", self.endpoint)),
    }
    for (name, path) in [
      ("status_path", &self.status_path),
      ("stream_path", &self.stream_path),
      ("opportunities_path", &self.opportunities_path),
    ] {
      if !path.starts_with('/') {
        return bad(format!("{name} must start with '/', got {path:?}"));
      }
    }
    if self.backoff_base_ms == 0 {
      return bad("backoff_base_ms must be positive".into());
    }
    if self.backoff_cap_ms < self.backoff_base_ms {
      return bad(format!(
        "backoff_cap_ms ({}) must be >= backoff_base_ms ({})",
        self.backoff_cap_ms, self.backoff_base_ms
      ));
    }
    if self.status_poll_interval_ms == 0 {
      return bad("status_poll_interval_ms must be positive".into());
    }
    if self.event_channel_capacity == 0 {
      return bad("event_channel_capacity must be positive".into());
    }
    if self.block_timeout_ms == 0 {
      return bad("block_timeout_ms must be positive".into());
    }
    if self.request_timeout_ms == 0 {
      return bad("request_timeout_ms must be positive".into());
    }
    // Zero would abort the loops before they publish `Closed`.
    if self.shutdown_timeout_ms == 0 {
      return bad("shutdown_timeout_ms must be positive".into());
    }
    Ok(())
  }

  pub fn backoff(&self) -> BackoffPolicy {
    BackoffPolicy::new(
      Duration::from_millis(self.backoff_base_ms),
      Duration::from_millis(self.backoff_cap_ms),
    )
  }

  pub const fn status_poll_interval(&self) -> Duration {
    Duration::from_millis(self.status_poll_interval_ms)
  }

  pub const fn block_timeout(&self) -> Duration {
    Duration::from_millis(self.block_timeout_ms)
  }

  pub const fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }

  pub const fn shutdown_timeout(&self) -> Duration {
    Duration::from_millis(self.shutdown_timeout_ms)
  }

  /// Base URL for request/response calls, e.g. `http://localhost:8765`.
  pub fn http_base(&self) -> String {
    let scheme = if self.tls { "https" } else { "http" };
    format!("{scheme}://{}", self.endpoint)
  }

  /// Full push stream URL, e.g. `ws://localhost:8765/ws`.
  pub fn stream_url(&self) -> String {
    let scheme = if self.tls { "wss" } else { "ws" };
    format!("{scheme}://{}{}", self.endpoint, self.stream_path)
  }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Emit JSON lines instead of human-readable output.
  #[serde(default)]
  pub json: bool,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      json: false,
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve /live, /ready and /metrics.
  #[serde(default)]
  pub enabled: bool,
  /// Bind address for the health/metrics server.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

// Default value functions for serde

fn default_endpoint() -> String {
  "localhost:8765".to_string()
}

fn default_status_path() -> String {
  "/status".to_string()
}

fn default_stream_path() -> String {
  "/ws".to_string()
}

fn default_opportunities_path() -> String {
  "/opportunities".to_string()
}

const fn default_backoff_base() -> u64 {
  250
}

const fn default_backoff_cap() -> u64 {
  30_000
}

const fn default_poll_interval() -> u64 {
  5_000
}

const fn default_capacity() -> usize {
  1024
}

const fn default_block_timeout() -> u64 {
  50
}

const fn default_request_timeout() -> u64 {
  10_000
}

const fn default_shutdown_timeout() -> u64 {
  5_000
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}
