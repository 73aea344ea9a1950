//! Historical backtest of the PO3 scanner with the probability gate
//!
//! Replays a SYNC candle file through the same scan as the live loop and
//! writes a JSON report (summary and most recent trades).

use anyhow::{Context, Result};
use clap::Parser;
use po3sniper::application::ml::predictor::ProbabilityGate;
use po3sniper::application::ml::smartcore_predictor::SmartCorePredictor;
use po3sniper::application::optimization::simulator::Backtester;
use po3sniper::application::scan_harness::ScanHarness;
use po3sniper::config::{Config, ModelConfig};
use po3sniper::infrastructure::csv_loader::load_sync_file;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "PO3 historical backtest", long_about = None)]
struct Args {
    /// Synchronized candle file
    #[arg(long, default_value = "data/SYNC_DATA_M1.csv")]
    data: PathBuf,

    /// Output JSON report
    #[arg(short, long, default_value = "data/backtest_results.json")]
    output: PathBuf,

    /// Take every candidate instead of consulting the model
    #[arg(long, default_value_t = false)]
    no_model: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let runtime = &config.runtime;

    let correlated_symbol = runtime.correlated_symbol.as_deref().unwrap_or("US500");
    let data = load_sync_file(&args.data, &runtime.primary_symbol, correlated_symbol)?;

    let harness = ScanHarness::new(config.detection.clone()).context("Invalid detection config")?;
    let primary = harness.prepare(data.primary)?;
    let correlated = match (runtime.correlated_symbol.as_ref(), data.correlated) {
        (Some(_), Some(series)) => Some(harness.prepare(series)?),
        _ => None,
    };

    let gate = if args.no_model {
        info!("Backtest: model disabled, every candidate is taken");
        None
    } else {
        let model_config = ModelConfig::load(&runtime.model_config_path)?;
        let predictor = SmartCorePredictor::new(runtime.model_path.clone());
        Some(ProbabilityGate::new(Arc::new(predictor), model_config.threshold))
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Backtest: Ctrl+C received, stopping replay");
            stop_on_signal.store(true, Ordering::SeqCst);
        }
    });

    let mut backtester = Backtester::new(&harness, config.backtest.to_backtest_config())
        .with_stop_flag(stop);
    if let Some(gate) = gate.as_ref() {
        backtester = backtester.with_gate(gate);
    }
    let report = tokio::task::block_in_place(|| backtester.run(&primary, correlated.as_ref()))?;
    if report.interrupted {
        warn!("Backtest: report covers a partial replay");
    }

    println!("{}", "=".repeat(40));
    println!(
        "RESULT: {:.2}% win rate | {} net profit | {} trades",
        report.summary.win_rate, report.summary.net_profit, report.summary.total_trades
    );
    println!("{}", "=".repeat(40));

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let file = File::create(&args.output).with_context(|| format!("Failed to create {:?}", args.output))?;
    report.write_json(file)?;
    info!("Backtest report written to {:?}", args.output);

    Ok(())
}
