//! Cache Store Port - Key/Value Store with TTL
//!
//! Raw string storage underneath the cache gateway. Implementations may fail
//! (networked stores do); the gateway turns every failure into a miss, so
//! callers above it never see these errors.

use std::time::Duration;

use async_trait::async_trait;

/// Trait for TTL key/value stores.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
  /// Read a live value.
  async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

  /// Write a value expiring after `ttl`.
  async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;

  /// Delete a key. Returns whether it existed.
  async fn delete(&self, key: &str) -> anyhow::Result<bool>;

  /// Whether a live value exists.
  async fn exists(&self, key: &str) -> anyhow::Result<bool>;

  /// Delete every key starting with `prefix`. Returns the count removed.
  async fn delete_prefix(&self, prefix: &str) -> anyhow::Result<usize>;
}
