//! Aggregation Coordinator - Lowest Price Rounds
//!
//! Runs one round per product:
//! 1. Returns the cached result for the product if present
//! 2. Queries every active source through the source fetcher
//! 3. Picks the cheapest quote (earliest wins ties)
//! 4. Replaces the product's persisted lowest price
//! 5. Caches the result and invalidates dependent read caches
//!
//! Persistence only happens after every source has been attempted, and
//! rounds for the same product never interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::domain::aggregation::{AggregationResult, PriceResponse, SourceFailure};
use crate::domain::error::AggregatorError;
use crate::domain::product_price::{ProductPrice, select_lowest};
use crate::domain::quote::Quote;
use crate::domain::source::SourceDescriptor;
use crate::ports::clock::Clock;
use crate::ports::metrics::{AggregationMetrics, FetchOutcome, RoundOutcome};
use crate::ports::price_store::PriceStore;
use crate::ports::source_catalog::SourceCatalog;

use super::cache_gateway::{CacheGateway, CacheKeys};
use super::source_fetcher::SourceFetcher;

type RoundLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Shared handle on a product's round lock. The entry leaves the table
/// when the last lease for the product is dropped, even if the round was
/// cancelled.
struct RoundLease<'a> {
  locks: &'a RoundLocks,
  product_id: &'a str,
  lock: Arc<Mutex<()>>,
}

impl Drop for RoundLease<'_> {
  fn drop(&mut self) {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    // the table's own reference plus ours
    if Arc::strong_count(&self.lock) == 2 {
      locks.remove(self.product_id);
    }
  }
}

/// Coordinates aggregation rounds across all active sources.
pub struct AggregationCoordinator {
  /// Lowest-price persistence.
  store: Arc<dyn PriceStore>,
  /// Source descriptors.
  catalog: Arc<dyn SourceCatalog>,
  /// Per-source fetch and normalization.
  fetcher: SourceFetcher,
  /// Product and listing caches.
  cache: CacheGateway,
  /// Round timestamp source.
  clock: Arc<dyn Clock>,
  /// TTL of cached round results.
  product_ttl: Duration,
  /// Fetch all sources of a round at once.
  concurrent_sources: bool,
  /// One lock per product id with a round running or waiting.
  round_locks: RoundLocks,
  /// Optional metrics sink.
  metrics: Option<Arc<dyn AggregationMetrics>>,
}

impl AggregationCoordinator {
  pub fn new(
    store: Arc<dyn PriceStore>,
    catalog: Arc<dyn SourceCatalog>,
    fetcher: SourceFetcher,
    cache: CacheGateway,
    clock: Arc<dyn Clock>,
    product_ttl: Duration,
  ) -> Self {
    Self {
      store,
      catalog,
      fetcher,
      cache,
      clock,
      product_ttl,
      concurrent_sources: false,
      round_locks: StdMutex::new(HashMap::new()),
      metrics: None,
    }
  }

  /// Query the sources of a round concurrently.
  #[must_use]
  pub const fn with_concurrent_sources(mut self, enabled: bool) -> Self {
    self.concurrent_sources = enabled;
    self
  }

  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<dyn AggregationMetrics>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Aggregate the lowest price of one product.
  ///
  /// # Errors
  /// Source catalog or price store failures. Source failures are reported
  /// inside the result instead.
  #[instrument(skip(self))]
  pub async fn aggregate_one(&self, product_id: &str) -> Result<AggregationResult> {
    let lease = self.round_lock(product_id);
    let _guard = lease.lock.lock().await;
    self.run_round(product_id).await
  }

  async fn run_round(&self, product_id: &str) -> Result<AggregationResult> {
    let product_key = CacheKeys::product(product_id);
    if let Some(cached) = self.cache.get::<AggregationResult>(&product_key).await {
      debug!("Returning cached aggregation result");
      self.record_round(RoundOutcome::Cached);
      return Ok(cached);
    }

    let started = Instant::now();
    let sources = self
      .catalog
      .find_all_active()
      .await
      .context("Failed to load active sources")?;

    info!(sources = sources.len(), "Starting aggregation round");

    let now = self.clock.now();
    let outcomes = self.fetch_all(&sources, product_id).await;

    let mut prices = Vec::new();
    let mut errors = Vec::new();
    let mut successful_sources = 0;

    for (source, outcome) in sources.iter().zip(outcomes) {
      match outcome {
        Ok(quotes) if quotes.is_empty() => {
          debug!(source = %source.name, "Source returned no quotes");
          self.record_fetch(&source.name, FetchOutcome::Empty);
        }
        Ok(quotes) => {
          debug!(source = %source.name, quotes = quotes.len(), "Source returned quotes");
          prices.extend(
            quotes
              .iter()
              .map(|quote| ProductPrice::from_quote(product_id, quote, now)),
          );
          successful_sources += 1;
          self.record_fetch(&source.name, FetchOutcome::Quotes);
        }
        Err(e) => {
          warn!(source = %source.name, error = %e, "Source failed");
          errors.push(SourceFailure {
            source: source.name.clone(),
            error: e.to_string(),
          });
          self.record_fetch(&source.name, FetchOutcome::Failed);
        }
      }
    }

    let total_sources_checked = sources.len();
    let lowest_price = match select_lowest(&prices) {
      Some(lowest) => {
        self
          .store
          .remove_by_product_id(product_id)
          .await
          .context("Failed to remove previous lowest price")?;
        self
          .store
          .save(lowest)
          .await
          .context("Failed to save lowest price")?;

        info!(
          vendor = %lowest.vendor_name,
          price = %lowest.price,
          quotes = prices.len(),
          "Lowest price persisted"
        );
        Some(PriceResponse::from(lowest))
      }
      None => {
        warn!("No quotes found from any source");
        None
      }
    };

    let result = AggregationResult {
      product_id: product_id.to_string(),
      total_sources_checked,
      successful_sources,
      failed_sources: total_sources_checked - successful_sources,
      lowest_price,
      errors,
    };

    self.cache.set(&product_key, &result, self.product_ttl).await;
    self.cache.delete(&CacheKeys::all_prices()).await;
    self.cache.delete(&CacheKeys::lowest(product_id)).await;

    let outcome = if result.is_successful() {
      RoundOutcome::Priced
    } else {
      RoundOutcome::NoQuotes
    };
    self.record_round(outcome);
    if let Some(metrics) = &self.metrics {
      metrics.observe_round_duration(outcome, started.elapsed().as_secs_f64());
    }

    info!(
      successful = result.successful_sources,
      failed = result.failed_sources,
      elapsed_ms = started.elapsed().as_millis(),
      "Aggregation round complete"
    );

    Ok(result)
  }

  /// Log the configured sources and count the ones a round would query.
  ///
  /// Inactive sources and sources with an unknown response format are
  /// reported but not counted.
  ///
  /// # Errors
  /// Source catalog failures.
  pub async fn audit_sources(&self) -> Result<usize> {
    let sources = self
      .catalog
      .find_all()
      .await
      .context("Failed to load sources")?;

    let mut usable = 0;
    for source in &sources {
      if !source.is_active {
        info!(source = %source.name, "Source inactive");
        continue;
      }
      match source.format() {
        Ok(format) => {
          debug!(source = %source.name, %format, "Source ready");
          usable += 1;
        }
        Err(e) => warn!(source = %source.name, error = %e, "Source will fail every round"),
      }
    }

    info!(total = sources.len(), usable, "Source catalog audited");
    Ok(usable)
  }

  /// Aggregate several products one after another, in input order.
  ///
  /// # Errors
  /// The first product whose round fails; later products are not attempted.
  #[instrument(skip(self, product_ids), fields(products = product_ids.len()))]
  pub async fn aggregate_many(&self, product_ids: &[String]) -> Result<Vec<AggregationResult>> {
    let mut results = Vec::with_capacity(product_ids.len());
    for product_id in product_ids {
      let result = self
        .aggregate_one(product_id)
        .await
        .with_context(|| format!("Aggregation failed for product {product_id}"))?;
      results.push(result);
    }

    let priced = results.iter().filter(|r| r.is_successful()).count();
    info!(priced, total = results.len(), "Batch aggregation complete");

    Ok(results)
  }

  /// Drop every cached view of one product.
  pub async fn clear_cache_for_product(&self, product_id: &str) -> bool {
    let product = self.cache.delete(&CacheKeys::product(product_id)).await;
    let lowest = self.cache.delete(&CacheKeys::lowest(product_id)).await;
    self.cache.delete(&CacheKeys::all_prices()).await;

    info!(product_id, "Product cache cleared");
    product || lowest
  }

  /// Sweep every key of this application.
  pub async fn clear_all_cache(&self) -> bool {
    self.cache.clear().await
  }

  /// One outcome slot per source, in source order.
  async fn fetch_all(
    &self,
    sources: &[SourceDescriptor],
    product_id: &str,
  ) -> Vec<Result<Vec<Quote>, AggregatorError>> {
    if self.concurrent_sources {
      return join_all(
        sources
          .iter()
          .map(|source| self.fetcher.fetch(source, product_id)),
      )
      .await;
    }

    let mut outcomes = Vec::with_capacity(sources.len());
    for source in sources {
      outcomes.push(self.fetcher.fetch(source, product_id).await);
    }
    outcomes
  }

  fn round_lock<'a>(&'a self, product_id: &'a str) -> RoundLease<'a> {
    let mut locks = self
      .round_locks
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let lock = Arc::clone(locks.entry(product_id.to_string()).or_default());
    RoundLease {
      locks: &self.round_locks,
      product_id,
      lock,
    }
  }

  fn record_round(&self, outcome: RoundOutcome) {
    if let Some(metrics) = &self.metrics {
      metrics.record_round(outcome);
    }
  }

  fn record_fetch(&self, source: &str, outcome: FetchOutcome) {
    if let Some(metrics) = &self.metrics {
      metrics.record_fetch(source, outcome);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::cache::InMemoryCacheStore;
  use crate::adapters::persistence::PriceTableStore;
  use crate::adapters::sources::{SimulatedQuoteFetcher, StaticSourceCatalog};
  use crate::ports::clock::SystemClock;
  use crate::usecases::retry::RetryExecutor;
  use serde_json::json;

  fn source(name: &str, format: &str, active: bool) -> SourceDescriptor {
    SourceDescriptor {
      name: name.to_string(),
      base_url: "https://example.com".to_string(),
      raw_catalog: HashMap::from([(
        "123".to_string(),
        vec![json!({"vendor": "ShopA", "price": 19.99})],
      )]),
      response_format: format.to_string(),
      is_active: active,
      timeout_seconds: 5,
    }
  }

  fn coordinator(sources: Vec<SourceDescriptor>) -> AggregationCoordinator {
    let cache = CacheGateway::new(Arc::new(InMemoryCacheStore::new()), "test:");
    let fetcher = SourceFetcher::new(
      Arc::new(SimulatedQuoteFetcher::instant()),
      cache.clone(),
      RetryExecutor::new(0, Duration::ZERO, 2.0),
      Duration::from_secs(300),
    );
    AggregationCoordinator::new(
      Arc::new(PriceTableStore::in_memory()),
      Arc::new(StaticSourceCatalog::new(sources)),
      fetcher,
      cache,
      Arc::new(SystemClock),
      Duration::from_secs(3600),
    )
  }

  fn lock_count(coordinator: &AggregationCoordinator) -> usize {
    coordinator.round_locks.lock().unwrap().len()
  }

  #[tokio::test]
  async fn test_round_locks_released_after_many_products() {
    let coordinator = coordinator(Vec::new());

    for i in 0..2_000 {
      coordinator.aggregate_one(&format!("id-{i}")).await.unwrap();
    }

    assert_eq!(lock_count(&coordinator), 0);
  }

  #[tokio::test]
  async fn test_round_lock_kept_while_shared() {
    let coordinator = coordinator(Vec::new());

    let first = coordinator.round_lock("123");
    let second = coordinator.round_lock("123");
    assert!(Arc::ptr_eq(&first.lock, &second.lock));

    drop(first);
    assert_eq!(lock_count(&coordinator), 1);
    drop(second);
    assert_eq!(lock_count(&coordinator), 0);
  }

  #[tokio::test]
  async fn test_cancelled_round_releases_lock() {
    let coordinator = coordinator(vec![source("A", "format_a", true)]);

    let held = coordinator.round_lock("123");
    let guard = held.lock.lock().await;
    // the round queues behind the held lock and is cancelled by the timeout
    let cancelled =
      tokio::time::timeout(Duration::from_millis(20), coordinator.aggregate_one("123")).await;
    assert!(cancelled.is_err());
    drop(guard);
    drop(held);

    assert_eq!(lock_count(&coordinator), 0);
  }

  #[tokio::test]
  async fn test_audit_counts_usable_sources() {
    let coordinator = coordinator(vec![
      source("A", "format_a", true),
      source("B", "format_b", false),
      source("X", "format_x", true),
      source("C", "api_three", true),
    ]);

    assert_eq!(coordinator.audit_sources().await.unwrap(), 2);
  }
}
