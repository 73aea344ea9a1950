//! PO3 Sniper - live scanning loop
//!
//! Polls the market feed, scans the last closed candle for a PO3 setup,
//! filters it through the probability model and sends limit orders.
//! Without a broker adapter the feed is a recorded SYNC file replayed one
//! candle per poll and orders go to the mock execution service.
//!
//! # Usage
//! ```sh
//! POLL_INTERVAL_SECS=1 cargo run -- --data data/SYNC_DATA_M1.csv
//! ```
//!
//! Ctrl+C stops the loop. With `--flatten-on-exit` it closes all positions first.

use anyhow::{Context, Result};
use clap::Parser;
use po3sniper::application::agents::live_scanner::{LiveScanner, LiveScannerConfig};
use po3sniper::application::ml::predictor::ProbabilityGate;
use po3sniper::application::ml::smartcore_predictor::SmartCorePredictor;
use po3sniper::application::scan_harness::ScanHarness;
use po3sniper::config::{Config, ModelConfig};
use po3sniper::infrastructure::csv_loader::load_sync_file;
use po3sniper::infrastructure::mock::{MockExecutionService, ReplayMarketDataService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "PO3 live scanner (replay mode)", long_about = None)]
struct Args {
    /// Synchronized candle file to replay
    #[arg(long, default_value = "data/SYNC_DATA_M1.csv")]
    data: PathBuf,

    /// Candles already "in the past" when the replay starts
    #[arg(long, default_value_t = 500)]
    warmup: usize,

    /// Write the session report here on exit
    #[arg(long)]
    report: Option<PathBuf>,

    /// Close all positions when stopping
    #[arg(long, default_value_t = false)]
    flatten_on_exit: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    info!("PO3 Sniper {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let runtime = &config.runtime;
    info!(
        "Configuration loaded: primary={}, correlated={:?}, window={}",
        runtime.primary_symbol, runtime.correlated_symbol, runtime.candle_window
    );

    let correlated_symbol = runtime.correlated_symbol.as_deref().unwrap_or("US500");
    let data = load_sync_file(&args.data, &runtime.primary_symbol, correlated_symbol)?;

    let market = ReplayMarketDataService::new(args.warmup).advancing_on(runtime.primary_symbol.clone());
    market
        .insert(runtime.primary_symbol.clone(), data.primary.into_candles())
        .await;
    if let Some(correlated) = data.correlated {
        market.insert(correlated_symbol, correlated.into_candles()).await;
    } else if runtime.correlated_symbol.is_some() {
        warn!("No correlated columns in {:?}; SMT will report unavailable", args.data);
    }

    let model_config = ModelConfig::load(&runtime.model_config_path)?;
    let predictor = SmartCorePredictor::new(runtime.model_path.clone());
    let gate = ProbabilityGate::new(Arc::new(predictor), model_config.threshold);

    let harness = ScanHarness::new(config.detection.clone()).context("Invalid detection config")?;
    let scanner = LiveScanner::new(
        Arc::new(market),
        Arc::new(MockExecutionService::new()),
        harness,
        gate,
        LiveScannerConfig::from(runtime),
    );

    let control = scanner.control();
    let flatten_on_exit = args.flatten_on_exit;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if flatten_on_exit {
                warn!("Shutdown signal received. Flattening positions before exit...");
                control.request_panic();
            } else {
                info!("Shutdown signal received. Open positions will remain.");
                control.request_stop();
            }
        }
    });

    let report = scanner.run().await;

    if let Some(path) = args.report {
        let file = std::fs::File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        serde_json::to_writer_pretty(file, &report).context("Failed to write session report")?;
        info!("Session report written to {:?}", path);
    }

    Ok(())
}
