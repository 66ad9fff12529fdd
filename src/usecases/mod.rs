//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the aggregator's workflows. Each use case is a self-contained
//! operation over injected ports.
//!
//! Use cases:
//! - `AggregationCoordinator`: Lowest-price rounds across all sources
//! - `SourceFetcher`: Fetch, retry and normalize one source
//! - `PriceQueryService`: Cache-aside lowest price reads
//! - `CacheGateway`: Prefixed, failure-absorbing typed cache
//! - `RetryExecutor`: Bounded retries with exponential backoff

pub mod aggregation;
pub mod cache_gateway;
pub mod price_query;
pub mod retry;
pub mod source_fetcher;

pub use aggregation::AggregationCoordinator;
pub use cache_gateway::{CacheGateway, CacheKeys};
pub use price_query::PriceQueryService;
pub use retry::RetryExecutor;
pub use source_fetcher::SourceFetcher;
