//! Prometheus Metrics Registry - Aggregation Observability
//!
//! Counts aggregation rounds and per-source fetch outcomes and times rounds.
//! Exposed as `/metrics` on the API listener.

use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

use crate::ports::metrics::{AggregationMetrics, FetchOutcome, RoundOutcome};

/// Centralized Prometheus metrics for the aggregator.
///
/// All metrics follow the naming convention `price_aggregator_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Rounds by outcome.
    pub rounds: IntCounterVec,
    /// Source fetches by source and outcome.
    pub source_fetches: IntCounterVec,
    /// Round duration histogram (seconds), cached rounds excluded.
    pub round_duration: HistogramVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let rounds = IntCounterVec::new(
            Opts::new("price_aggregator_rounds_total", "Aggregation rounds by outcome"),
            &["outcome"],
        )?;

        let source_fetches = IntCounterVec::new(
            Opts::new(
                "price_aggregator_source_fetches_total",
                "Source fetches by source and outcome",
            ),
            &["source", "outcome"],
        )?;

        let round_duration = HistogramVec::new(
            HistogramOpts::new(
                "price_aggregator_round_duration_seconds",
                "Duration of uncached aggregation rounds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["outcome"],
        )?;

        registry.register(Box::new(rounds.clone()))?;
        registry.register(Box::new(source_fetches.clone()))?;
        registry.register(Box::new(round_duration.clone()))?;

        Ok(Self {
            registry,
            rounds,
            source_fetches,
            round_duration,
        })
    }

    /// Text exposition of every registered metric.
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// `GET /metrics` route, merged into the API router.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new().route(
            "/metrics",
            get(move || {
                let metrics = Arc::clone(&self);
                async move {
                    match metrics.render() {
                        Ok(body) => (StatusCode::OK, body).into_response(),
                        Err(e) => {
                            error!(error = %e, "Failed to encode metrics");
                            StatusCode::INTERNAL_SERVER_ERROR.into_response()
                        }
                    }
                }
            }),
        )
    }
}

impl AggregationMetrics for MetricsRegistry {
    fn record_round(&self, outcome: RoundOutcome) {
        self.rounds.with_label_values(&[outcome.as_label()]).inc();
    }

    fn observe_round_duration(&self, outcome: RoundOutcome, seconds: f64) {
        self.round_duration
            .with_label_values(&[outcome.as_label()])
            .observe(seconds);
    }

    fn record_fetch(&self, source: &str, outcome: FetchOutcome) {
        self.source_fetches
            .with_label_values(&[source, outcome.as_label()])
            .inc();
    }
}
