//! Source Adapters - Raw Quote Fetchers and Catalog
//!
//! `SimulatedQuoteFetcher` answers from configured catalogs with injected
//! latency and failures; `HttpQuoteFetcher` talks to real endpoints. Both
//! implement `RawQuoteFetcher` and are selected by `fetch.mode`.

pub mod catalog;
pub mod http;
pub mod simulated;

pub use catalog::StaticSourceCatalog;
pub use http::HttpQuoteFetcher;
pub use simulated::SimulatedQuoteFetcher;
