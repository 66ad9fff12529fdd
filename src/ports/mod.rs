//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `PriceStore`: Current lowest price per product
//! - `SourceCatalog`: Configured price sources
//! - `CacheStore`: TTL key/value storage behind the cache gateway
//! - `RawQuoteFetcher`: Raw access to one external source
//! - `Clock`: Round timestamps
//! - `AggregationMetrics`: Round and fetch outcome counters

pub mod cache_store;
pub mod clock;
pub mod metrics;
pub mod price_store;
pub mod quote_fetcher;
pub mod source_catalog;

pub use cache_store::CacheStore;
pub use clock::{Clock, SystemClock};
pub use metrics::{AggregationMetrics, FetchOutcome, RoundOutcome};
pub use price_store::PriceStore;
pub use quote_fetcher::RawQuoteFetcher;
pub use source_catalog::SourceCatalog;
