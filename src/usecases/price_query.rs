//! Price Query Service - Cache-aside Read Path
//!
//! Serves the current lowest price of one or all products. Reads prefer the
//! caches written by aggregation rounds and fall back to the price store,
//! populating a read-through entry that the next round invalidates.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::domain::aggregation::{AggregationResult, PriceResponse};
use crate::ports::price_store::PriceStore;

use super::cache_gateway::{CacheGateway, CacheKeys};

/// Read-side access to lowest prices.
#[derive(Clone)]
pub struct PriceQueryService {
  store: Arc<dyn PriceStore>,
  cache: CacheGateway,
  /// TTL of the per-product read-through entry.
  product_ttl: Duration,
  /// TTL of the all-products listing.
  all_prices_ttl: Duration,
}

impl PriceQueryService {
  pub fn new(
    store: Arc<dyn PriceStore>,
    cache: CacheGateway,
    product_ttl: Duration,
    all_prices_ttl: Duration,
  ) -> Self {
    Self {
      store,
      cache,
      product_ttl,
      all_prices_ttl,
    }
  }

  /// Current lowest price of a product, `None` if it was never priced.
  ///
  /// # Errors
  /// Price store failures.
  #[instrument(skip(self))]
  pub async fn get_lowest_price_for_product(&self, product_id: &str) -> Result<Option<PriceResponse>> {
    if let Some(result) = self
      .cache
      .get::<AggregationResult>(&CacheKeys::product(product_id))
      .await
    {
      if let Some(lowest) = result.lowest_price {
        debug!("Lowest price served from round cache");
        return Ok(Some(lowest));
      }
    }

    let lowest_key = CacheKeys::lowest(product_id);
    if let Some(lowest) = self.cache.get::<PriceResponse>(&lowest_key).await {
      debug!("Lowest price served from read-through cache");
      return Ok(Some(lowest));
    }

    let Some(row) = self
      .store
      .find_lowest_by_product_id(product_id)
      .await
      .context("Failed to read lowest price")?
    else {
      return Ok(None);
    };

    let response = PriceResponse::from(&row);
    self.cache.set(&lowest_key, &response, self.product_ttl).await;
    Ok(Some(response))
  }

  /// Lowest price of every priced product.
  ///
  /// # Errors
  /// Price store failures.
  #[instrument(skip(self))]
  pub async fn get_all_lowest_prices(&self) -> Result<Vec<PriceResponse>> {
    let key = CacheKeys::all_prices();
    if let Some(prices) = self.cache.get::<Vec<PriceResponse>>(&key).await {
      debug!(count = prices.len(), "All prices served from cache");
      return Ok(prices);
    }

    let prices: Vec<PriceResponse> = self
      .store
      .find_all_lowest()
      .await
      .context("Failed to read lowest prices")?
      .iter()
      .map(PriceResponse::from)
      .collect();

    self.cache.set(&key, &prices, self.all_prices_ttl).await;
    Ok(prices)
  }
}
