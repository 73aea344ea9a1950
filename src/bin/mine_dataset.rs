//! Labeled dataset builder
//!
//! Scans a SYNC candle file for every PO3 candidate, labels each one with its
//! outcome inside the holding horizon and writes the rows to CSV.

use anyhow::{Context, Result};
use clap::Parser;
use po3sniper::application::ml::data_collector::{DatasetMiner, write_samples};
use po3sniper::application::scan_harness::ScanHarness;
use po3sniper::config::Config;
use po3sniper::infrastructure::csv_loader::load_sync_file;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mine labeled PO3 candidates", long_about = None)]
struct Args {
    /// Synchronized candle file
    #[arg(long, default_value = "data/SYNC_DATA_M1.csv")]
    data: PathBuf,

    /// Output dataset CSV
    #[arg(short, long, default_value = "data/datasets/dataset_labeled.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
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

    let miner = DatasetMiner::new(&harness, config.backtest.holding_horizon());
    let report = miner.mine(&primary, correlated.as_ref())?;

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let file = File::create(&args.output).with_context(|| format!("Failed to create {:?}", args.output))?;
    write_samples(BufWriter::new(file), &report.samples)?;

    info!(
        "Dataset written to {:?}: {} rows, base win rate {:.2}%",
        args.output,
        report.samples.len(),
        report.base_win_rate()
    );
    Ok(())
}
