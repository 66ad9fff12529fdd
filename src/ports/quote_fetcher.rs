//! Quote Fetcher Port - Raw Source Access
//!
//! The pluggable fetch contract: given a descriptor and a product id, return
//! the source's raw records untouched. Format conversion happens in the core.
//! The default adapter simulates latency and outages; an HTTP adapter can be
//! swapped in without touching the use cases.

use async_trait::async_trait;

use crate::domain::error::AggregatorError;
use crate::domain::source::{RawQuote, SourceDescriptor};

/// Trait for raw quote providers.
#[async_trait]
pub trait RawQuoteFetcher: Send + Sync + 'static {
  /// Fetch raw records for one product from one source.
  ///
  /// # Errors
  /// `Transient` for operational failures worth retrying, `Validation` for
  /// responses that cannot be decoded. A product the source does not carry
  /// is an empty `Ok`, not an error.
  async fn fetch_raw(
    &self,
    source: &SourceDescriptor,
    product_id: &str,
  ) -> Result<Vec<RawQuote>, AggregatorError>;
}
