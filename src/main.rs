//! MEV Shield Connector - Entry Point
//!
//! Connects to the configured MEV Shield service and logs every event
//! until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (path overridable via MEV_SHIELD_CONFIG) + validate
//! 2. Init tracing (EnvFilter, optional JSON lines)
//! 3. Load optional credentials from env (MEV_SHIELD_API_KEY or USER/PASSWORD)
//! 4. Build the connector, one-shot status + snapshot query
//! 5. Spawn the health/metrics server if enabled
//! 6. Start the connector and log events
//! 7. Wait for SIGINT, then stop the connector and the health server

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use mev_shield_connector::adapters::auth::HeaderAuth;
use mev_shield_connector::adapters::metrics::HealthServer;
use mev_shield_connector::config::{self, LoggingConfig};
use mev_shield_connector::{Connector, ConnectorEvent, EventStream};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let path = std::env::var("MEV_SHIELD_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&path).context("Failed to load configuration")?;

    // ── 2. Initialize logging ───────────────────────────────
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.connector.endpoint,
        tls = config.connector.tls,
        "Starting MEV Shield connector"
    );

    // ── 3. Optional credentials ─────────────────────────────
    let connector = match HeaderAuth::from_env() {
        Some(auth) => {
            info!(header = auth.header_name(), "Credentials loaded from environment");
            Connector::with_hook(config.connector.clone(), Arc::new(auth))
        }
        None => Connector::from_config(config.connector.clone()),
    }
    .context("Failed to create connector")?;

    // ── 4. One-shot queries (failures are not fatal) ────────
    match connector.fetch_status().await {
        Ok(status) => info!(
            latency_ms = status.latency().as_millis(),
            fields = status.fields().len(),
            "Service status"
        ),
        Err(e) => warn!(error = %e, "Initial status query failed"),
    }
    match connector.fetch_opportunities().await {
        Ok(active) => info!(count = active.len(), "Active opportunities snapshot"),
        Err(e) => warn!(error = %e, "Initial snapshot query failed"),
    }

    // ── 5. Health/metrics server ────────────────────────────
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let health_handle = if config.metrics.enabled {
        let server = HealthServer::new(
            connector.subscribe_state(),
            connector.metrics(),
            config.metrics.bind_address.clone(),
        );
        let shutdown_rx = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(shutdown_rx).await {
                error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    // ── 6. Start streaming ──────────────────────────────────
    let events = connector.start().context("Failed to start connector")?;

    tokio::select! {
        () = consume(events) => warn!("Event stream ended"),
        _ = signal::ctrl_c() => info!("SIGINT received, initiating graceful shutdown"),
    }

    // ── 7. Graceful shutdown ────────────────────────────────
    if let Err(e) = connector.stop().await {
        warn!(error = %e, "Connector stop reported an error");
    }
    let _ = shutdown_tx.send(());
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(connector.config().shutdown_timeout(), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn consume(mut events: EventStream) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectorEvent::Opportunity(opp) => info!(
                id = opp.id(),
                category = %opp.category(),
                profit_eth = %opp.estimated_profit(),
                "Opportunity"
            ),
            ConnectorEvent::Gap { disconnected_for } => warn!(
                disconnected_ms = disconnected_for.as_millis(),
                "Stream gap, events may have been missed"
            ),
            ConnectorEvent::Dropped { count } => {
                warn!(count, "Events dropped by backpressure");
            }
            ConnectorEvent::Status(status) => info!(
                latency_ms = status.latency().as_millis(),
                state = status.field_str("status").unwrap_or("unknown"),
                "Status"
            ),
            ConnectorEvent::StatusUnavailable { reason } => {
                warn!(reason = %reason, "Status unavailable");
            }
        }
    }
}
