//! Persistence Adapters - JSON-snapshotted Price Table
//!
//! Implements the `PriceStore` port with an in-memory table that can be
//! mirrored to an atomic JSON snapshot. No database dependency.

pub mod price_table;

pub use price_table::PriceTableStore;
