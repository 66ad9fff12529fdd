//! HTTP API Adapter
//!
//! axum routes for reading lowest prices and triggering aggregation,
//! guarded by a shared-secret header.
//!
//! Sub-modules:
//! - `auth`: `X-API-Key` middleware
//! - `server`: Routes, handlers and the serve loop

pub mod auth;
pub mod server;

pub use auth::ApiKeyAuth;
pub use server::{ApiState, router, serve};
