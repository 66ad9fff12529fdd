//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Source
//! definitions, retry policy, cache TTLs and the API surface are all
//! externalized here - nothing is hardcoded in the use cases.

pub mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::domain::source::SourceDescriptor;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the first aggregation round.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub service: ServiceConfig,
  /// Retry policy for raw source fetches.
  #[serde(default)]
  pub retry: RetryConfig,
  /// Cache namespace and TTLs.
  #[serde(default)]
  pub cache: CacheConfig,
  /// Raw fetch adapter selection and simulation knobs.
  #[serde(default)]
  pub fetch: FetchConfig,
  /// Aggregation round behavior.
  #[serde(default)]
  pub aggregation: AggregationConfig,
  /// HTTP read/trigger API.
  #[serde(default)]
  pub api: ApiConfig,
  /// Lowest-price persistence.
  #[serde(default)]
  pub persistence: PersistenceConfig,
  /// Configured price sources, in query order.
  #[serde(default)]
  pub sources: Vec<SourceDescriptor>,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
  /// Human-readable service name.
  #[serde(default = "default_service_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      name: default_service_name(),
      log_level: default_log_level(),
    }
  }
}

/// Retry policy for raw fetches.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
  /// Retries after the first attempt.
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  /// Delay before the first retry (milliseconds).
  #[serde(default = "default_base_delay_ms")]
  pub base_delay_ms: u64,
  /// Growth factor per retry (>= 1).
  #[serde(default = "default_backoff_multiplier")]
  pub backoff_multiplier: f64,
}

impl RetryConfig {
  pub const fn base_delay(&self) -> Duration {
    Duration::from_millis(self.base_delay_ms)
  }
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_retries: default_max_retries(),
      base_delay_ms: default_base_delay_ms(),
      backoff_multiplier: default_backoff_multiplier(),
    }
  }
}

/// Cache namespace and TTLs.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Prefix applied to every key so `clear` only sweeps ours.
  #[serde(default = "default_key_prefix")]
  pub key_prefix: String,
  /// Raw records per source and product (seconds).
  #[serde(default = "default_source_ttl")]
  pub source_ttl_secs: u64,
  /// Aggregation result per product (seconds).
  #[serde(default = "default_product_ttl")]
  pub product_ttl_secs: u64,
  /// All-products listing (seconds).
  #[serde(default = "default_all_prices_ttl")]
  pub all_prices_ttl_secs: u64,
  /// Expired-entry sweep interval for the in-memory store (seconds, 0 = off).
  #[serde(default = "default_sweep_interval")]
  pub sweep_interval_secs: u64,
}

impl CacheConfig {
  pub const fn source_ttl(&self) -> Duration {
    Duration::from_secs(self.source_ttl_secs)
  }

  pub const fn product_ttl(&self) -> Duration {
    Duration::from_secs(self.product_ttl_secs)
  }

  pub const fn all_prices_ttl(&self) -> Duration {
    Duration::from_secs(self.all_prices_ttl_secs)
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      key_prefix: default_key_prefix(),
      source_ttl_secs: default_source_ttl(),
      product_ttl_secs: default_product_ttl(),
      all_prices_ttl_secs: default_all_prices_ttl(),
      sweep_interval_secs: default_sweep_interval(),
    }
  }
}

/// Which raw fetch adapter talks to sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
  /// Serve each descriptor's catalog with injected latency and failures.
  #[default]
  Simulated,
  /// GET `{base_url}/{product_id}` over HTTP.
  Http,
}

/// Raw fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
  /// Adapter selection.
  #[serde(default)]
  pub mode: FetchMode,
  /// Lower bound of simulated latency (milliseconds).
  #[serde(default = "default_min_latency")]
  pub min_latency_ms: u64,
  /// Upper bound of simulated latency (milliseconds).
  #[serde(default = "default_max_latency")]
  pub max_latency_ms: u64,
  /// Probability of a simulated transient failure per attempt.
  #[serde(default = "default_failure_rate")]
  pub failure_rate: f64,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      mode: FetchMode::default(),
      min_latency_ms: default_min_latency(),
      max_latency_ms: default_max_latency(),
      failure_rate: default_failure_rate(),
    }
  }
}

/// Aggregation round configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
  /// Products aggregated at startup and on every refresh.
  #[serde(default = "default_product_ids")]
  pub product_ids: Vec<String>,
  /// Query sources of a round concurrently instead of one by one.
  #[serde(default)]
  pub concurrent_sources: bool,
  /// Periodic refresh interval (seconds, 0 = off).
  #[serde(default)]
  pub refresh_interval_secs: u64,
  /// Sweep our cache namespace before the first round.
  #[serde(default)]
  pub clear_cache_on_start: bool,
}

impl Default for AggregationConfig {
  fn default() -> Self {
    Self {
      product_ids: default_product_ids(),
      concurrent_sources: false,
      refresh_interval_secs: 0,
      clear_cache_on_start: false,
    }
  }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Enable the HTTP server.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Server bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
  /// Shared secret for `X-API-Key`; `PRICE_API_KEY` takes precedence.
  #[serde(default)]
  pub api_key: Option<String>,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_bind_address(),
      api_key: None,
    }
  }
}

/// Persistence configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistenceConfig {
  /// Directory for the `prices.json` snapshot. Unset keeps prices in memory.
  #[serde(default)]
  pub data_dir: Option<String>,
}

// Default value functions for serde

fn default_service_name() -> String {
  "price-aggregator".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_max_retries() -> u32 {
  3
}

fn default_base_delay_ms() -> u64 {
  1000
}

fn default_backoff_multiplier() -> f64 {
  2.0
}

fn default_key_prefix() -> String {
  "price_cache:".to_string()
}

fn default_source_ttl() -> u64 {
  300 // 5 min
}

fn default_product_ttl() -> u64 {
  600 // 10 min
}

fn default_all_prices_ttl() -> u64 {
  300
}

fn default_sweep_interval() -> u64 {
  60
}

fn default_min_latency() -> u64 {
  50
}

fn default_max_latency() -> u64 {
  200
}

fn default_failure_rate() -> f64 {
  0.05
}

fn default_product_ids() -> Vec<String> {
  ["123", "456", "789", "101", "102"]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_bind_address() -> String {
  "0.0.0.0:8080".to_string()
}
