//! Cache Adapters - TTL Key/Value Storage
//!
//! Implements the `CacheStore` port. The in-memory store is process-local;
//! a networked store can implement the same trait.

pub mod memory;

pub use memory::InMemoryCacheStore;
