//! API Server - Price Read and Aggregation Trigger Routes
//!
//! Routes:
//! - `GET  /api/prices`               all lowest prices
//! - `GET  /api/prices/:product_id`   one lowest price (404 if unpriced)
//! - `POST /api/aggregate`            run rounds for `{"product_ids": [..]}`
//! - `POST /api/aggregate/:product_id` run one round
//!
//! All of the above require `X-API-Key`. Health and metrics routes are
//! merged in unauthenticated by the caller.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, instrument};

use crate::domain::aggregation::{AggregationResult, PriceResponse};
use crate::usecases::aggregation::AggregationCoordinator;
use crate::usecases::price_query::PriceQueryService;

use super::auth::{ApiKeyAuth, require_api_key};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<AggregationCoordinator>,
    pub query: PriceQueryService,
}

/// Body of `POST /api/aggregate`.
#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    pub product_ids: Vec<String>,
}

/// Handler failures, rendered as `{"error": ..}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Product not found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Build the authenticated price routes.
pub fn router(state: ApiState, auth: Arc<ApiKeyAuth>) -> Router {
    Router::new()
        .route("/api/prices", get(list_prices))
        .route("/api/prices/:product_id", get(get_price))
        .route("/api/aggregate", post(aggregate_many))
        .route("/api/aggregate/:product_id", post(aggregate_one))
        .route_layer(middleware::from_fn_with_state(auth, require_api_key))
        .with_state(state)
}

async fn list_prices(State(state): State<ApiState>) -> Result<Json<Vec<PriceResponse>>, ApiError> {
    Ok(Json(state.query.get_all_lowest_prices().await?))
}

async fn get_price(
    State(state): State<ApiState>,
    Path(product_id): Path<String>,
) -> Result<Json<PriceResponse>, ApiError> {
    state
        .query
        .get_lowest_price_for_product(&product_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn aggregate_one(
    State(state): State<ApiState>,
    Path(product_id): Path<String>,
) -> Result<Json<AggregationResult>, ApiError> {
    Ok(Json(state.coordinator.aggregate_one(&product_id).await?))
}

async fn aggregate_many(
    State(state): State<ApiState>,
    Json(request): Json<AggregateRequest>,
) -> Result<Json<Vec<AggregationResult>>, ApiError> {
    if request.product_ids.is_empty() {
        return Err(ApiError::BadRequest("product_ids must not be empty".into()));
    }
    if request.product_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ApiError::BadRequest("product_ids must not contain empty ids".into()));
    }

    Ok(Json(state.coordinator.aggregate_many(&request.product_ids).await?))
}

/// Serve `app` until the shutdown signal fires.
#[instrument(skip(app, shutdown_rx))]
pub async fn serve(
    app: Router,
    bind_address: String,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "API server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    info!("API server stopped");
    Ok(())
}
