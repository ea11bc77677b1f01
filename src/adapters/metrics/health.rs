//! Health Check Server - Liveness, Readiness and Scrape Endpoint
//!
//! Exposes /live, /ready and /metrics via axum 0.7. Readiness follows
//! the connector's published state: 200 only while the push stream is
//! connected.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument, warn};

use super::prometheus::ConnectorMetrics;
use crate::domain::ConnectionState;

/// Shared state behind the probe handlers.
#[derive(Clone)]
struct Probe {
    state_rx: watch::Receiver<ConnectionState>,
    metrics: Arc<ConnectorMetrics>,
}

/// Axum-based health and metrics HTTP server.
pub struct HealthServer {
    probe: Probe,
    /// Listen address, e.g. `0.0.0.0:9090`.
    bind_address: String,
}

impl HealthServer {
    pub fn new(
        state_rx: watch::Receiver<ConnectionState>,
        metrics: Arc<ConnectorMetrics>,
        bind_address: impl Into<String>,
    ) -> Self {
        Self {
            probe: Probe { state_rx, metrics },
            bind_address: bind_address.into(),
        }
    }

    /// Route table, split out so handlers can be exercised without a socket.
    fn router(&self) -> Router {
        Router::new()
            .route("/live", get(Self::liveness))
            .route("/ready", get(Self::readiness))
            .route("/metrics", get(Self::scrape))
            .with_state(self.probe.clone())
    }

    /// Serve until the shutdown signal fires.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;

        info!("Health server started");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        info!("Health server stopped");
        Ok(())
    }

    async fn liveness() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    async fn readiness(State(probe): State<Probe>) -> impl IntoResponse {
        let state = *probe.state_rx.borrow();
        if state == ConnectionState::Connected {
            (StatusCode::OK, "READY".to_string())
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, format!("NOT READY ({state})"))
        }
    }

    async fn scrape(State(probe): State<Probe>) -> impl IntoResponse {
        match probe.metrics.render() {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => {
                warn!(error = %e, "Failed to render metrics");
                (StatusCode::INTERNAL_SERVER_ERROR, String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(state: ConnectionState) -> (watch::Sender<ConnectionState>, Probe) {
        let (tx, state_rx) = watch::channel(state);
        let metrics = Arc::new(ConnectorMetrics::new().unwrap());
        (tx, Probe { state_rx, metrics })
    }

    #[tokio::test]
    async fn test_ready_only_when_connected() {
        let (tx, p) = probe(ConnectionState::Connecting);
        let resp = HealthServer::readiness(State(p.clone())).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        tx.send_replace(ConnectionState::Connected);
        let resp = HealthServer::readiness(State(p)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_scrape_ok() {
        let (_tx, p) = probe(ConnectionState::Disconnected);
        p.metrics.reconnects.inc();
        let resp = HealthServer::scrape(State(p)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let (_tx, p) = probe(ConnectionState::Connected);
        let server = HealthServer::new(p.state_rx, p.metrics, "127.0.0.1:0");
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(server.run(shutdown_rx));
        tokio::task::yield_now().await;
        shutdown_tx.send(()).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
