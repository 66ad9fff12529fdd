//! Price Store Port - Lowest Price Persistence Interface
//!
//! Holds the current known lowest price per product. The medium and schema
//! belong to the adapter; the coordinator only relies on the operations
//! below and performs delete-then-insert itself.

use async_trait::async_trait;

use crate::domain::product_price::ProductPrice;

/// Trait for lowest-price persistence providers.
#[async_trait]
pub trait PriceStore: Send + Sync + 'static {
  /// Persist a lowest-price row.
  async fn save(&self, price: &ProductPrice) -> anyhow::Result<()>;

  /// Current lowest price for a product, if any.
  async fn find_lowest_by_product_id(
    &self,
    product_id: &str,
  ) -> anyhow::Result<Option<ProductPrice>>;

  /// Every stored lowest price.
  async fn find_all_lowest(&self) -> anyhow::Result<Vec<ProductPrice>>;

  /// Delete the row for a product. Missing rows are not an error.
  async fn remove_by_product_id(&self, product_id: &str) -> anyhow::Result<()>;
}
