//! API Key Authentication - Shared Secret Header Check
//!
//! Guards the price routes with an `X-API-Key` header compared against the
//! key from `PRICE_API_KEY` (or `api.api_key` in config). Without a
//! configured key every guarded request is rejected.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

/// Request header carrying the shared secret.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Environment variable that overrides the configured key.
pub const API_KEY_ENV: &str = "PRICE_API_KEY";

/// API key holder.
#[derive(Clone)]
pub struct ApiKeyAuth {
    /// Expected key, `None` when nothing is configured.
    key: Option<String>,
}

impl std::fmt::Debug for ApiKeyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyAuth")
            .field("configured", &self.key.is_some())
            .finish()
    }
}

impl ApiKeyAuth {
    /// Use `key` as the expected secret. Blank keys count as unset.
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// `PRICE_API_KEY` if set, else the configured fallback.
    pub fn from_env_or(fallback: Option<String>) -> Self {
        let from_env = std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty());
        Self::new(from_env.or(fallback))
    }

    pub const fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Whether `provided` matches the expected key.
    pub fn verify(&self, provided: Option<&str>) -> bool {
        match (&self.key, provided) {
            (Some(expected), Some(provided)) => constant_time_eq(expected.as_bytes(), provided.as_bytes()),
            _ => false,
        }
    }
}

/// Byte comparison whose duration does not depend on where inputs differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// axum middleware rejecting requests without a valid `X-API-Key`.
pub async fn require_api_key(
    State(auth): State<Arc<ApiKeyAuth>>,
    request: Request,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if auth.verify(provided) {
        return next.run(request).await;
    }

    warn!(
        path = %request.uri().path(),
        header_present = provided.is_some(),
        "Rejected unauthenticated request"
    );
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
