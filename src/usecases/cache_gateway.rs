//! Cache Gateway - Best-effort Typed Cache
//!
//! Wraps a [`CacheStore`] with a key prefix and JSON (de)serialization.
//! Every operation is infallible to callers: store errors are logged and
//! reported as a miss or `false`, so a cache outage can never fail a round.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info};

use crate::domain::error::AggregatorError;
use crate::ports::cache_store::CacheStore;

/// Derives the unprefixed cache keys used by the use cases.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeys;

impl CacheKeys {
  /// Aggregation result for a product.
  pub fn product(product_id: &str) -> String {
    format!("product:{product_id}")
  }

  /// Listing of every lowest price.
  pub fn all_prices() -> String {
    "all_prices".to_string()
  }

  /// Raw records of one source for one product.
  pub fn source(source_name: &str, product_id: &str) -> String {
    format!("api_source:{source_name}:{product_id}")
  }

  /// Read-through copy of a stored lowest price.
  pub fn lowest(product_id: &str) -> String {
    format!("lowest:{product_id}")
  }
}

/// Prefixed, typed, failure-absorbing cache access.
#[derive(Clone)]
pub struct CacheGateway {
  store: Arc<dyn CacheStore>,
  key_prefix: String,
}

impl CacheGateway {
  pub fn new(store: Arc<dyn CacheStore>, key_prefix: impl Into<String>) -> Self {
    Self {
      store,
      key_prefix: key_prefix.into(),
    }
  }

  fn full_key(&self, key: &str) -> String {
    format!("{}{key}", self.key_prefix)
  }

  /// Read and decode a value. Store errors and undecodable values are misses.
  pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.store.get(&self.full_key(key)).await {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        log_failure("get", key, &e);
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(value) => {
        debug!(key, "Cache hit");
        Some(value)
      }
      Err(e) => {
        error!(key, error = %e, "Cached value could not be decoded, treating as miss");
        None
      }
    }
  }

  /// Encode and write a value with a TTL.
  pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
    let encoded = match serde_json::to_string(value) {
      Ok(encoded) => encoded,
      Err(e) => {
        error!(key, error = %e, "Cache value could not be encoded");
        return false;
      }
    };

    match self.store.set_ex(&self.full_key(key), encoded, ttl).await {
      Ok(()) => {
        debug!(key, ttl_secs = ttl.as_secs(), "Cache set");
        true
      }
      Err(e) => {
        log_failure("set", key, &e);
        false
      }
    }
  }

  /// Delete a key. `true` only if something was removed.
  pub async fn delete(&self, key: &str) -> bool {
    match self.store.delete(&self.full_key(key)).await {
      Ok(removed) => {
        debug!(key, removed, "Cache delete");
        removed
      }
      Err(e) => {
        log_failure("delete", key, &e);
        false
      }
    }
  }

  /// Sweep every key under our prefix.
  pub async fn clear(&self) -> bool {
    match self.store.delete_prefix(&self.key_prefix).await {
      Ok(removed) => {
        info!(prefix = %self.key_prefix, removed, "Cache cleared");
        true
      }
      Err(e) => {
        log_failure("clear", &self.key_prefix, &e);
        false
      }
    }
  }

  pub async fn has(&self, key: &str) -> bool {
    match self.store.exists(&self.full_key(key)).await {
      Ok(exists) => exists,
      Err(e) => {
        log_failure("has", key, &e);
        false
      }
    }
  }
}

/// Store failures stop here: log them as cache errors and move on.
fn log_failure(operation: &str, key: &str, source: &anyhow::Error) {
  let err = AggregatorError::Cache(format!("{operation} {key}: {source:#}"));
  error!(operation, key, kind = %err.kind(), error = %err, "Cache store error");
}
