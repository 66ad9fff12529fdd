//! Simulated Quote Fetcher - Catalog-backed Source Stand-in
//!
//! Serves each descriptor's `raw_catalog` after a random latency and fails a
//! configurable fraction of attempts with a transient error, so the retry
//! and partial-failure paths run without network access.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::domain::error::AggregatorError;
use crate::domain::source::{RawQuote, SourceDescriptor};
use crate::ports::quote_fetcher::RawQuoteFetcher;

/// Raw fetcher that answers from configuration.
#[derive(Debug, Clone)]
pub struct SimulatedQuoteFetcher {
    /// Lower latency bound.
    min_latency: Duration,
    /// Upper latency bound.
    max_latency: Duration,
    /// Probability in [0, 1] that an attempt fails.
    failure_rate: f64,
}

impl SimulatedQuoteFetcher {
    /// Create a fetcher. Bounds are swapped if reversed and the failure
    /// rate is clamped to [0, 1].
    pub fn new(min_latency: Duration, max_latency: Duration, failure_rate: f64) -> Self {
        let (min_latency, max_latency) = if min_latency <= max_latency {
            (min_latency, max_latency)
        } else {
            (max_latency, min_latency)
        };

        Self {
            min_latency,
            max_latency,
            failure_rate: if failure_rate.is_nan() { 0.0 } else { failure_rate.clamp(0.0, 1.0) },
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_latency_ms),
            Duration::from_millis(config.max_latency_ms),
            config.failure_rate,
        )
    }

    /// No latency, no failures.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0.0)
    }

    /// Draw this attempt's latency and fate. The thread-local RNG is not
    /// `Send`, so it must not live across the sleep.
    fn roll(&self) -> (Duration, bool) {
        let mut rng = rand::rng();
        let latency = if self.min_latency == self.max_latency {
            self.min_latency
        } else {
            rng.random_range(self.min_latency..=self.max_latency)
        };
        (latency, rng.random_bool(self.failure_rate))
    }
}

impl Default for SimulatedQuoteFetcher {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

#[async_trait]
impl RawQuoteFetcher for SimulatedQuoteFetcher {
    async fn fetch_raw(
        &self,
        source: &SourceDescriptor,
        product_id: &str,
    ) -> Result<Vec<RawQuote>, AggregatorError> {
        let (latency, fails) = self.roll();
        sleep(latency).await;

        if fails {
            warn!(source = %source.name, product_id, "Simulated source failure");
            return Err(AggregatorError::Transient(format!(
                "{} API temporarily unavailable",
                source.name
            )));
        }

        let raw = source.raw_quotes_for(product_id);
        debug!(
            source = %source.name,
            product_id,
            records = raw.len(),
            latency_ms = latency.as_millis(),
            "Simulated fetch complete"
        );
        Ok(raw)
    }
}
