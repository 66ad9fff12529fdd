//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! infrastructure (HTTP, in-memory stores, file snapshots). Each
//! sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: axum read/trigger routes with API key auth
//! - `cache`: TTL key/value stores
//! - `metrics`: Prometheus export and health probes
//! - `persistence`: Lowest-price table with JSON snapshots
//! - `sources`: Raw quote fetchers and the source catalog

pub mod api;
pub mod cache;
pub mod metrics;
pub mod persistence;
pub mod sources;
