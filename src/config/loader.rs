//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    endpoint = %config.connector.endpoint,
    capacity = config.connector.event_channel_capacity,
    policy = ?config.connector.backpressure_policy,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig = toml::from_str(content)
    .with_context(|| "Failed to parse config.toml")?;

  config
    .connector
    .validate()
    .context("Invalid [connector] section")?;

  anyhow::ensure!(
    !config.metrics.enabled || !config.metrics.bind_address.is_empty(),
    "metrics.bind_address must not be empty when metrics are enabled"
  );

  Ok(config)
}
