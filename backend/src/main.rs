//! # Staking Backend
//!
//! Runs the price feed for the configured network against the file-backed local store
//! and logs every update until interrupted.

use lib_core::{init_config, AppError};
use lib_staking::{FileStore, HttpPriceOracle, Network, PriceFeed, PriceFeedOptions};
use shared::PriceState;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn init_tracing() -> anyhow::Result<String> {
    let log_level = std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase();

    let filter = match log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {
            tracing_subscriber::EnvFilter::new(&log_level)
        }
        _ => tracing_subscriber::EnvFilter::new("info"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global tracing subscriber: {}", e))?;
    Ok(log_level)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let log_level = init_tracing()?;

    info!("STAKING BACKEND STARTING");
    info!("Log level: {}", log_level);

    if let Err(err) = run().await {
        err.report();
        return Err(err.into());
    }
    Ok(())
}

async fn run() -> Result<(), AppError> {
    let config = init_config().map_err(AppError::Config)?;
    let network: Network = config.network.parse()?;
    info!(%network, unit = network.unit(), "Network selected");

    let store = FileStore::open(&config.local_store_path)?;
    let oracle = HttpPriceOracle::new(
        config.price_api_url.clone(),
        Duration::from_secs(config.price_fetch_timeout_secs),
    )?;

    let prices = PriceFeed::new(
        Arc::new(oracle),
        Arc::new(store),
        PriceFeedOptions::from_config(config),
    );

    let _updates = prices.subscribe(move |state: &PriceState| {
        info!(
            %network,
            price = %state.last_price,
            change = %state.change,
            "{} price",
            network.unit()
        );
    });

    prices.start(network);
    info!(current = %prices.get_price().last_price, "Price feed running, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    prices.stop();
    info!("Shutting down");
    Ok(())
}
