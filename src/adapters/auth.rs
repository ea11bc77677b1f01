//! Header Authentication - Pre-connect Credential Injection
//!
//! A `ConnectHook` that adds one static credential header to every
//! status request and stream handshake. Credentials come from the
//! environment (MEV_SHIELD_API_KEY, or MEV_SHIELD_USER plus
//! MEV_SHIELD_PASSWORD for basic auth) and are never logged.

use std::fmt;

use async_trait::async_trait;
use base64::Engine;

use crate::error::ConnectorError;
use crate::ports::connect_hook::{ConnectHook, ConnectRequest};

/// Header name used for API key auth.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Static header credential.
#[derive(Clone)]
pub struct HeaderAuth {
    name: String,
    value: String,
}

impl HeaderAuth {
    /// `X-API-Key: <key>`.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            name: API_KEY_HEADER.to_string(),
            value: key.into(),
        }
    }

    /// `Authorization: Bearer <token>`.
    pub fn bearer(token: &str) -> Self {
        Self {
            name: "Authorization".to_string(),
            value: format!("Bearer {token}"),
        }
    }

    /// `Authorization: Basic base64(user:password)`.
    pub fn basic(user: &str, password: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        Self {
            name: "Authorization".to_string(),
            value: format!("Basic {encoded}"),
        }
    }

    /// Load credentials from the environment, if any are set.
    ///
    /// MEV_SHIELD_API_KEY wins over MEV_SHIELD_USER/MEV_SHIELD_PASSWORD.
    /// Empty values count as unset.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(key) = var("MEV_SHIELD_API_KEY") {
            return Some(Self::api_key(key));
        }
        match (var("MEV_SHIELD_USER"), var("MEV_SHIELD_PASSWORD")) {
            (Some(user), Some(password)) => Some(Self::basic(&user, &password)),
            _ => None,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for HeaderAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderAuth")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl ConnectHook for HeaderAuth {
    async fn prepare(&self, request: &mut ConnectRequest) -> Result<(), ConnectorError> {
        request.header(self.name.clone(), self.value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_key_header_added() {
        let auth = HeaderAuth::api_key("k-123");
        let mut req = ConnectRequest::new("ws://localhost:8765/ws");
        auth.prepare(&mut req).await.unwrap();
        assert_eq!(req.headers, vec![("X-API-Key".to_string(), "k-123".to_string())]);
        assert_eq!(req.url, "ws://localhost:8765/ws");
    }

    #[tokio::test]
    async fn test_basic_encoding() {
        let auth = HeaderAuth::basic("alice", "s3cret");
        let mut req = ConnectRequest::new("http://localhost:8765/status");
        auth.prepare(&mut req).await.unwrap();
        assert_eq!(req.headers[0].0, "Authorization");
        assert_eq!(req.headers[0].1, "Basic YWxpY2U6czNjcmV0");
    }

    #[test]
    fn test_bearer() {
        let auth = HeaderAuth::bearer("tok");
        assert_eq!(auth.header_name(), "Authorization");
        assert_eq!(auth.value, "Bearer tok");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let auth = HeaderAuth::api_key("super-secret");
        let printed = format!("{auth:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }
}
