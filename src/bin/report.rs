//! ShelfIQ Report - run one analysis against a dataset file
//!
//! Prints the same JSON the HTTP API returns, so reports can be produced
//! offline or diffed between dataset snapshots.
//!
//! Usage:
//!   shelfiq-report tail --store-id 1 --date-start 2024-01-01 --search milk
//!   shelfiq-report space --date-end 2024-03-31
//!   shelfiq-report --dataset snapshot.json heatmap

use clap::{Args as ClapArgs, Parser, Subcommand};
use shelfiq::domain::types::{CategoryId, DateRange, StoreId, TailFilter};
use shelfiq::infra::logging::init_logging;
use shelfiq::infra::{Config, ConfigArgs, Metrics};
use shelfiq::io::dataset::load_dataset;
use shelfiq::services::{AnalyticsService, DatasetAggregator};
use std::sync::Arc;
use tracing::{info, warn};

/// ShelfIQ Report - offline analytics
#[derive(Parser, Debug)]
#[command(name = "shelfiq-report", version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct Window {
    /// Store to analyse (default: [store] default_store_id)
    #[arg(long)]
    store_id: Option<i64>,

    /// Inclusive lower bound, e.g. 2024-01-01 or 2024-01-01T08:00:00
    #[arg(long)]
    date_start: Option<String>,

    /// Inclusive upper bound
    #[arg(long)]
    date_end: Option<String>,
}

impl Window {
    fn store_id(&self, config: &Config) -> StoreId {
        self.store_id.map(StoreId).unwrap_or_else(|| config.default_store_id())
    }

    fn date_range(&self) -> anyhow::Result<DateRange> {
        DateRange::parse(self.date_start.as_deref(), self.date_end.as_deref())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// SKU tail classification
    Tail {
        #[command(flatten)]
        window: Window,

        /// Restrict to one category
        #[arg(long)]
        category_id: Option<i64>,

        /// Case-insensitive match on product name or SKU
        #[arg(long)]
        search: Option<String>,
    },
    /// Current vs. recommended shelf meters per category
    Space {
        #[command(flatten)]
        window: Window,
    },
    /// Traffic-zone performance (dates are ignored)
    Heatmap {
        #[command(flatten)]
        window: Window,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = args.config.load();

    // Logs go to stderr; stdout carries only the report
    init_logging(config.log_json());

    let dataset = Arc::new(load_dataset(config.dataset_file())?);
    let service = AnalyticsService::from_config(
        DatasetAggregator::new(dataset),
        Arc::new(Metrics::new()),
        &config,
    );

    let store_id = match &args.command {
        Command::Tail { window, .. } | Command::Space { window } | Command::Heatmap { window } => {
            window.store_id(&config)
        }
    };
    match service.source().dataset().store(store_id) {
        Some(store) => info!(store_id = %store_id, store = %store.name, "report_store"),
        None => warn!(store_id = %store_id, "report_store_unknown"),
    }

    let output = match &args.command {
        Command::Tail { window, category_id, search } => {
            let filter = TailFilter {
                store_id,
                date_range: window.date_range()?,
                category_id: category_id.map(CategoryId),
                search: search.clone(),
            };
            serde_json::to_string_pretty(&service.tail(&filter)?)?
        }
        Command::Space { window } => {
            let report = service.space(store_id, &window.date_range()?)?;
            serde_json::to_string_pretty(&report)?
        }
        Command::Heatmap { .. } => serde_json::to_string_pretty(&service.heatmap(store_id)?)?,
    };

    println!("{output}");
    Ok(())
}
