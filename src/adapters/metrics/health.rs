//! Health Routes - Liveness and Readiness Probes
//!
//! `/live` answers as long as the process runs. `/ready` turns 200 once the
//! startup aggregation has completed and 503 again during shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;

/// Readiness flag shared with the binary.
#[derive(Debug, Clone, Default)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// `/live` and `/ready` routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/live", get(liveness))
            .route("/ready", get(readiness))
            .with_state(self.clone())
    }
}

async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness(State(state): State<HealthState>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}
