//! WebSocket/HTTP Transport - MEV Shield Wire Adapter
//!
//! Status and snapshot queries go over HTTP (`reqwest`); the push
//! channel is a WebSocket (`tokio-tungstenite`). One text or binary
//! message is one frame. No retries here: the supervisor and poller
//! own recovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::ports::connect_hook::{ConnectHook, ConnectRequest};
use crate::ports::transport::{Frame, FrameStream, Transport};

/// HTTP + WebSocket transport for the MEV Shield API.
pub struct WsTransport {
    /// Shared HTTP client (connection pooling, request timeout).
    http: Client,
    /// Full status URL.
    status_url: String,
    /// Full opportunity snapshot URL.
    opportunities_url: String,
    /// Full push stream URL.
    stream_url: String,
    /// Upper bound on the WebSocket handshake.
    handshake_timeout: Duration,
    /// Optional pre-connect hook (auth headers).
    hook: Option<Arc<dyn ConnectHook>>,
}

impl WsTransport {
    /// Build the transport from connector config.
    pub fn new(config: &ConnectorConfig) -> Result<Self, ConnectorError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| ConnectorError::Config(format!("failed to build HTTP client: {e}")))?;

        let base = config.http_base();
        Ok(Self {
            http,
            status_url: format!("{base}{}", config.status_path),
            opportunities_url: format!("{base}{}", config.opportunities_path),
            stream_url: config.stream_url(),
            handshake_timeout: config.request_timeout(),
            hook: None,
        })
    }

    /// Attach a pre-connect hook run before every request and stream open.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn ConnectHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    async fn prepare(&self, url: &str) -> Result<ConnectRequest, ConnectorError> {
        let mut request = ConnectRequest::new(url);
        if let Some(hook) = &self.hook {
            hook.prepare(&mut request).await?;
        }
        Ok(request)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ConnectorError> {
        let prepared = self.prepare(url).await?;

        let mut request = self.http.get(&prepared.url);
        for (name, value) in &prepared.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::Network(format!(
                "GET {} returned {status}",
                prepared.url
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn request_status(&self) -> Result<Vec<u8>, ConnectorError> {
        self.get_bytes(&self.status_url).await
    }

    async fn request_opportunities(&self) -> Result<Vec<u8>, ConnectorError> {
        self.get_bytes(&self.opportunities_url).await
    }

    async fn open_stream(&self) -> Result<Box<dyn FrameStream>, ConnectorError> {
        let prepared = self.prepare(&self.stream_url).await?;

        let mut request = prepared.url.as_str().into_client_request()?;
        for (name, value) in &prepared.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConnectorError::Network(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConnectorError::Network(format!("invalid header value: {e}")))?;
            request.headers_mut().insert(name, value);
        }

        let (ws, response) = tokio::time::timeout(self.handshake_timeout, connect_async(request))
            .await
            .map_err(|_| ConnectorError::Network("WebSocket handshake timed out".into()))??;

        info!(url = %self.stream_url, status = %response.status(), "Push stream connected");
        Ok(Box::new(WsFrameStream { ws }))
    }
}

/// Open WebSocket yielding text/binary messages as frames.
struct WsFrameStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next_frame(&mut self) -> Result<Frame, ConnectorError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.into_bytes()),
                Some(Ok(Message::Binary(data))) => return Ok(data),
                Some(Ok(Message::Ping(data))) => {
                    // Pong is queued automatically by tungstenite
                    debug!(len = data.len(), "Ping received");
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map_or_else(
                        || "no close frame".to_string(),
                        |f| format!("{} {}", f.code, f.reason),
                    );
                    return Err(ConnectorError::StreamClosed(format!("peer closed: {reason}")));
                }
                Some(Err(e)) => return Err(ConnectorError::StreamClosed(e.to_string())),
                None => return Err(ConnectorError::StreamClosed("stream ended".into())),
            }
        }
    }
}
