//! Price Aggregator - Entry Point
//!
//! Initializes configuration, logging and adapters, runs the startup
//! aggregation, then serves the API until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate (path from the first argument)
//! 2. Init tracing (JSON structured logging)
//! 3. Open the price table (snapshot in `persistence.data_dir`)
//! 4. Build cache, catalog and raw fetcher (simulated or HTTP)
//! 5. Build the use cases (source fetcher, coordinator, query service)
//! 6. Optionally clear our cache namespace, then aggregate configured products
//! 7. Spawn API server, refresh loop and cache sweeper
//! 8. Wait for SIGINT -> broadcast shutdown -> bounded joins

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use price_aggregator::adapters::api::{self, ApiKeyAuth, ApiState};
use price_aggregator::adapters::cache::InMemoryCacheStore;
use price_aggregator::adapters::metrics::{HealthState, MetricsRegistry};
use price_aggregator::adapters::persistence::PriceTableStore;
use price_aggregator::adapters::sources::{
    HttpQuoteFetcher, SimulatedQuoteFetcher, StaticSourceCatalog,
};
use price_aggregator::config::{self, AppConfig, FetchMode};
use price_aggregator::ports::{PriceStore, RawQuoteFetcher, SystemClock};
use price_aggregator::usecases::{
    AggregationCoordinator, CacheGateway, PriceQueryService, RetryExecutor, SourceFetcher,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.service.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        sources = config.sources.len(),
        products = config.aggregation.product_ids.len(),
        fetch_mode = ?config.fetch.mode,
        "Starting price aggregator"
    );

    // ── 3. Shutdown signal channel ──────────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Adapters ─────────────────────────────────────────
    let store: Arc<dyn PriceStore> = match &config.persistence.data_dir {
        Some(dir) => Arc::new(
            PriceTableStore::open(dir)
                .await
                .context("Failed to open price table")?,
        ),
        None => {
            warn!("No persistence.data_dir configured, prices are kept in memory only");
            Arc::new(PriceTableStore::in_memory())
        }
    };

    let cache_store = Arc::new(InMemoryCacheStore::new());
    let cache = CacheGateway::new(cache_store.clone(), config.cache.key_prefix.clone());
    let catalog = Arc::new(StaticSourceCatalog::new(config.sources.clone()));

    let raw_fetcher: Arc<dyn RawQuoteFetcher> = match config.fetch.mode {
        FetchMode::Simulated => Arc::new(SimulatedQuoteFetcher::from_config(&config.fetch)),
        FetchMode::Http => {
            Arc::new(HttpQuoteFetcher::new().context("Failed to create HTTP quote fetcher")?)
        }
    };

    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let health = HealthState::new();

    // ── 5. Use cases ────────────────────────────────────────
    let source_fetcher = SourceFetcher::new(
        raw_fetcher,
        cache.clone(),
        RetryExecutor::from_config(&config.retry),
        config.cache.source_ttl(),
    );

    let coordinator = Arc::new(
        AggregationCoordinator::new(
            Arc::clone(&store),
            catalog,
            source_fetcher,
            cache.clone(),
            Arc::new(SystemClock),
            config.cache.product_ttl(),
        )
        .with_concurrent_sources(config.aggregation.concurrent_sources)
        .with_metrics(metrics.clone()),
    );

    let query = PriceQueryService::new(
        store,
        cache,
        config.cache.product_ttl(),
        config.cache.all_prices_ttl(),
    );

    // ── 6. Startup aggregation ──────────────────────────────
    if config.aggregation.clear_cache_on_start {
        coordinator.clear_all_cache().await;
    }

    match coordinator.audit_sources().await {
        Ok(0) => warn!("No usable sources, every round will come back empty"),
        Ok(_) => {}
        Err(e) => error!(error = %format!("{e:#}"), "Source audit failed"),
    }

    run_round(&coordinator, &config.aggregation.product_ids).await;
    health.set_ready(true);

    // ── 7. Background tasks ─────────────────────────────────
    let mut tasks: Vec<(&str, JoinHandle<()>)> = Vec::new();

    if config.api.enabled {
        let auth = ApiKeyAuth::from_env_or(config.api.api_key.clone());
        if !auth.is_configured() {
            warn!("No API key configured, every /api request will be rejected");
        }

        let app = api::router(
            ApiState {
                coordinator: Arc::clone(&coordinator),
                query,
            },
            Arc::new(auth),
        )
        .merge(health.router())
        .merge(Arc::clone(&metrics).router());

        let bind_address = config.api.bind_address.clone();
        let api_shutdown = shutdown_tx.subscribe();
        tasks.push((
            "api",
            tokio::spawn(async move {
                if let Err(e) = api::serve(app, bind_address, api_shutdown).await {
                    error!(error = %e, "API server failed");
                }
            }),
        ));
    }

    if config.aggregation.refresh_interval_secs > 0 {
        tasks.push((
            "refresh",
            tokio::spawn(refresh_loop(
                Arc::clone(&coordinator),
                config.clone(),
                shutdown_tx.subscribe(),
            )),
        ));
    }

    if config.cache.sweep_interval_secs > 0 {
        tasks.push((
            "cache_sweep",
            tokio::spawn(sweep_loop(
                cache_store,
                Duration::from_secs(config.cache.sweep_interval_secs),
                shutdown_tx.subscribe(),
            )),
        ));
    }

    info!(tasks = tasks.len(), "All tasks spawned, aggregator is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT, shutting down");
    } else {
        info!("SIGINT received, initiating graceful shutdown");
    }

    health.set_ready(false);
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    for (name, handle) in tasks {
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            warn!(task = name, "Task did not stop within 10s");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Aggregate every configured product, logging instead of failing.
async fn run_round(coordinator: &AggregationCoordinator, product_ids: &[String]) {
    match coordinator.aggregate_many(product_ids).await {
        Ok(results) => {
            for result in &results {
                match &result.lowest_price {
                    Some(lowest) => info!(
                        product_id = %result.product_id,
                        vendor = %lowest.vendor,
                        price = %lowest.price,
                        successful = result.successful_sources,
                        failed = result.failed_sources,
                        "Lowest price"
                    ),
                    None => warn!(
                        product_id = %result.product_id,
                        failed = result.failed_sources,
                        "No price found"
                    ),
                }
            }
        }
        Err(e) => error!(error = %format!("{e:#}"), "Aggregation round failed"),
    }
}

/// Re-aggregate configured products on a fixed interval.
///
/// Each tick drops the product caches first, otherwise the round would just
/// return the cached result until it expires.
async fn refresh_loop(
    coordinator: Arc<AggregationCoordinator>,
    config: AppConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.aggregation.refresh_interval_secs));
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!("Refresh loop received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                for product_id in &config.aggregation.product_ids {
                    coordinator.clear_cache_for_product(product_id).await;
                }
                run_round(&coordinator, &config.aggregation.product_ids).await;
            }
        }
    }
}

/// Periodically evict expired cache entries.
async fn sweep_loop(
    cache: Arc<InMemoryCacheStore>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                cache.purge_expired().await;
            }
        }
    }
}
