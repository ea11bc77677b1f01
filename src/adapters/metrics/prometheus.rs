//! Prometheus Metrics Registry - Connector Observability
//!
//! Counters for frames, decode failures, drops and reconnects, a gauge
//! mirroring the published connection state, and a status latency
//! histogram. All metric names share the `mev_connector_` prefix.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

use crate::domain::ConnectionState;
use crate::usecases::event_channel::PushOutcome;

/// Centralized Prometheus metrics for one connector instance.
///
/// Each instance owns its own registry so several connectors (and
/// parallel tests) never collide on registration.
pub struct ConnectorMetrics {
    /// Prometheus registry.
    registry: Registry,
    /// Raw frames read from the push stream.
    pub frames_received: IntCounter,
    /// Frames that decoded into an opportunity.
    pub opportunities_decoded: IntCounter,
    /// Frames rejected by the decoder (skipped, never fatal).
    pub decode_errors: IntCounter,
    /// Events discarded by the backpressure policy.
    pub events_dropped: IntCounter,
    /// Streams re-established after a loss.
    pub reconnects: IntCounter,
    /// Failed status polls.
    pub status_failures: IntCounter,
    /// Current connection state (see `ConnectionState::as_gauge`).
    pub connection_state: IntGauge,
    /// Status request round-trip in seconds.
    pub status_latency: Histogram,
}

impl ConnectorMetrics {
    /// Create and register all metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let frames_received = IntCounter::new(
            "mev_connector_frames_received_total",
            "Raw frames read from the push stream",
        )?;
        let opportunities_decoded = IntCounter::new(
            "mev_connector_opportunities_decoded_total",
            "Frames decoded into opportunities",
        )?;
        let decode_errors = IntCounter::new(
            "mev_connector_decode_errors_total",
            "Frames rejected by the decoder",
        )?;
        let events_dropped = IntCounter::new(
            "mev_connector_events_dropped_total",
            "Events discarded by the backpressure policy",
        )?;
        let reconnects = IntCounter::new(
            "mev_connector_reconnects_total",
            "Push streams re-established after a loss",
        )?;
        let status_failures = IntCounter::new(
            "mev_connector_status_failures_total",
            "Failed status polls",
        )?;
        let connection_state = IntGauge::new(
            "mev_connector_connection_state",
            "0=disconnected 1=connecting 2=connected 3=reconnecting 4=closed",
        )?;
        let status_latency = Histogram::with_opts(
            HistogramOpts::new(
                "mev_connector_status_latency_seconds",
                "Status request round-trip",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(frames_received.clone()))?;
        registry.register(Box::new(opportunities_decoded.clone()))?;
        registry.register(Box::new(decode_errors.clone()))?;
        registry.register(Box::new(events_dropped.clone()))?;
        registry.register(Box::new(reconnects.clone()))?;
        registry.register(Box::new(status_failures.clone()))?;
        registry.register(Box::new(connection_state.clone()))?;
        registry.register(Box::new(status_latency.clone()))?;

        Ok(Self {
            registry,
            frames_received,
            opportunities_decoded,
            decode_errors,
            events_dropped,
            reconnects,
            status_failures,
            connection_state,
            status_latency,
        })
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.connection_state.set(state.as_gauge());
    }

    /// Count a lossy push outcome.
    pub fn record_push(&self, outcome: PushOutcome) {
        if matches!(outcome, PushOutcome::Evicted | PushOutcome::Dropped) {
            self.events_dropped.inc();
        }
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
