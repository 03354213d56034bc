//! ShelfIQ analytics server
//!
//! Serves the tail, space-elasticity and heatmap reports over HTTP for the
//! retail dashboard.
//!
//! Module structure:
//! - `domain/` - Row types, report shapes and the dataset records
//! - `io/` - Dataset loading, HTTP API, result log
//! - `services/` - Aggregation and the three classifiers
//! - `infra/` - Config, metrics, logging

use clap::Parser;
use shelfiq::infra::logging::init_logging;
use shelfiq::infra::{ConfigArgs, Metrics};
use shelfiq::io::dataset::load_dataset;
use shelfiq::io::http::{start_http_server, ApiState};
use shelfiq::services::{AnalyticsService, DatasetAggregator};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// ShelfIQ - retail shelf analytics API
#[derive(Parser, Debug)]
#[command(name = "shelfiq", version, about)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = args.config.load();

    init_logging(config.log_json());

    info!(version = %env!("CARGO_PKG_VERSION"), git_hash = %env!("GIT_HASH"), "shelfiq starting");
    info!(
        config_file = %config.config_file(),
        store = %config.app_name(),
        default_store_id = %config.default_store_id(),
        bind = %config.bind_address(),
        port = %config.port(),
        api_prefix = %config.api_prefix(),
        dataset_file = %config.dataset_file(),
        results_enabled = %config.results_enabled(),
        "config_loaded"
    );

    let dataset = Arc::new(load_dataset(config.dataset_file())?);

    let addr = config.http_addr()?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());
    let service = AnalyticsService::from_config(DatasetAggregator::new(dataset), metrics.clone(), &config);
    let state = Arc::new(ApiState::new(service, &config));

    // Start metrics reporter
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics.report().log();
        }
    });

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    match addr {
        Some(addr) => {
            if let Err(e) = start_http_server(addr, state, shutdown_rx).await {
                error!(error = %e, "http_server_error");
                anyhow::bail!("http server failed: {e}");
            }
        }
        None => {
            // Port 0: no API, only the metrics reporter until shutdown
            info!("http_server_disabled");
            let mut shutdown_rx = shutdown_rx;
            let _ = shutdown_rx.wait_for(|stop| *stop).await;
        }
    }

    info!("shelfiq shutdown complete");
    Ok(())
}
