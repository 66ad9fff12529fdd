//! In-memory Cache Store - Process-local TTL Map
//!
//! Entries carry their own expiry instant. Expired entries are invisible to
//! reads and are evicted lazily on access or in bulk by `purge_expired`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::ports::cache_store::CacheStore;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL cache held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict every expired entry. Returns the count removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        let purged = before - entries.len();

        if purged > 0 {
            debug!(purged, remaining = entries.len(), "Expired cache entries purged");
        }
        purged
    }

    /// Live and expired entries currently held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // expired: evict unless someone refreshed it in between
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| anyhow::anyhow!("TTL {ttl:?} overflows the clock"))?;

        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(Instant::now())))
    }

    async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn delete_prefix(&self, prefix: &str) -> anyhow::Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before - entries.len())
    }
}
