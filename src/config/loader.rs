//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
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
    sources = config.sources.len(),
    products = config.aggregation.product_ids.len(),
    max_retries = config.retry.max_retries,
    fetch_mode = ?config.fetch.mode,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Response format tags are deliberately not checked here: a source with an
/// unknown tag is reported as failed in every round it takes part in.
fn validate_config(config: &AppConfig) -> Result<()> {
  // Retry validation
  anyhow::ensure!(
    config.retry.backoff_multiplier >= 1.0,
    "retry.backoff_multiplier must be >= 1, got {}",
    config.retry.backoff_multiplier
  );

  // Cache validation
  anyhow::ensure!(
    !config.cache.key_prefix.is_empty(),
    "cache.key_prefix must not be empty"
  );

  // Fetch validation
  anyhow::ensure!(
    (0.0..=1.0).contains(&config.fetch.failure_rate),
    "fetch.failure_rate must be in [0, 1], got {}",
    config.fetch.failure_rate
  );
  anyhow::ensure!(
    config.fetch.min_latency_ms <= config.fetch.max_latency_ms,
    "fetch.min_latency_ms ({}) exceeds fetch.max_latency_ms ({})",
    config.fetch.min_latency_ms,
    config.fetch.max_latency_ms
  );

  // Source validation
  let mut names = HashSet::new();
  for (i, source) in config.sources.iter().enumerate() {
    anyhow::ensure!(
      !source.name.trim().is_empty(),
      "Source {i} has an empty name"
    );
    anyhow::ensure!(
      names.insert(source.name.as_str()),
      "Source name {:?} is configured more than once",
      source.name
    );
    anyhow::ensure!(
      source.timeout_seconds > 0,
      "Source {:?} has timeout_seconds = 0",
      source.name
    );
  }

  // Aggregation validation
  anyhow::ensure!(
    config.aggregation.product_ids.iter().all(|id| !id.trim().is_empty()),
    "aggregation.product_ids must not contain empty ids"
  );

  Ok(())
}
