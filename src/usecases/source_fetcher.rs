//! Source Fetcher - Per-source Fetch and Normalization
//!
//! Turns one (source, product) pair into validated quotes:
//! 1. Skips inactive sources
//! 2. Resolves the response format (unknown tags fail fast)
//! 3. Serves cached raw records when present
//! 4. Otherwise fetches through the retry executor with a per-attempt deadline
//! 5. Converts records, dropping the ones that do not validate
//!
//! Fetch failures never escape: an unreachable source simply contributes no
//! quotes. Only a misconfigured format is returned as an error.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use crate::domain::error::{AggregatorError, ErrorKind};
use crate::domain::quote::Quote;
use crate::domain::source::{RawQuote, ResponseFormat, SourceDescriptor};
use crate::ports::quote_fetcher::RawQuoteFetcher;

use super::cache_gateway::{CacheGateway, CacheKeys};
use super::retry::RetryExecutor;

const RETRYABLE: &[ErrorKind] = &[ErrorKind::Transient];

/// Fetches and normalizes quotes from a single source.
#[derive(Clone)]
pub struct SourceFetcher {
  /// Raw access to external sources.
  fetcher: Arc<dyn RawQuoteFetcher>,
  /// Raw-record cache.
  cache: CacheGateway,
  /// Retry policy for raw fetches.
  retry: RetryExecutor,
  /// TTL of cached raw records.
  source_ttl: Duration,
}

impl SourceFetcher {
  pub fn new(
    fetcher: Arc<dyn RawQuoteFetcher>,
    cache: CacheGateway,
    retry: RetryExecutor,
    source_ttl: Duration,
  ) -> Self {
    Self {
      fetcher,
      cache,
      retry,
      source_ttl,
    }
  }

  /// Fetch the quotes one source offers for a product.
  ///
  /// # Errors
  /// `AggregatorError::Configuration` when the source's response format tag
  /// is unknown. Every other failure is logged and yields an empty result.
  #[instrument(skip(self, source), fields(source = %source.name))]
  pub async fn fetch(
    &self,
    source: &SourceDescriptor,
    product_id: &str,
  ) -> Result<Vec<Quote>, AggregatorError> {
    if !source.is_active {
      debug!("Source inactive, skipping");
      return Ok(Vec::new());
    }

    let format = source.format()?;
    let cache_key = CacheKeys::source(&source.name, product_id);

    if let Some(raw) = self.cache.get::<Vec<RawQuote>>(&cache_key).await {
      debug!(records = raw.len(), "Serving raw records from cache");
      return Ok(convert_all(format, &raw, &source.name));
    }

    let raw = match self.fetch_with_retry(source, product_id).await {
      Ok(raw) => raw,
      Err(e) => {
        error!(
          error = %e,
          kind = %e.kind(),
          max_retries = self.retry.max_retries(),
          "Source fetch failed, no quotes from this source"
        );
        return Ok(Vec::new());
      }
    };

    self.cache.set(&cache_key, &raw, self.source_ttl).await;

    Ok(convert_all(format, &raw, &source.name))
  }

  async fn fetch_with_retry(
    &self,
    source: &SourceDescriptor,
    product_id: &str,
  ) -> Result<Vec<RawQuote>, AggregatorError> {
    let deadline = source.timeout();

    self
      .retry
      .execute(
        || async move {
          match tokio::time::timeout(deadline, self.fetcher.fetch_raw(source, product_id)).await {
            Ok(result) => result,
            Err(_) => Err(AggregatorError::Transient(format!(
              "{} timed out after {}s",
              source.name,
              deadline.as_secs()
            ))),
          }
        },
        RETRYABLE,
      )
      .await
  }
}

/// Convert a batch, skipping records that fail conversion or validation.
fn convert_all(format: ResponseFormat, raw: &[RawQuote], source_name: &str) -> Vec<Quote> {
  raw
    .iter()
    .filter_map(|record| match format.convert(record) {
      Ok(quote) => Some(quote),
      Err(e) => {
        warn!(source = source_name, error = %e, "Skipping invalid raw record");
        None
      }
    })
    .collect()
}
