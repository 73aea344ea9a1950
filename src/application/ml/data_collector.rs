use crate::application::optimization::outcome::resolve_outcome;
use crate::application::scan_harness::{Candidate, ScanHarness};
use crate::domain::errors::EngineError;
use crate::domain::market::augmented::AugmentedSeries;
use crate::domain::trading::types::Direction;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::info;

/// One labeled row of the training dataset. Feature columns keep the
/// names the model was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub timestamp: DateTime<Utc>,
    pub signal_type: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub atr: f64,
    pub divergence: bool,
    pub target: u8,
    pub hour: f64,
    pub is_ny_session: f64,
    pub distance_to_ema50: f64,
    pub trend_ema200: f64,
    pub volatility_shock: f64,
}

impl LabeledSample {
    fn from_candidate(candidate: &Candidate, target: u8) -> Option<Self> {
        let signal = &candidate.signal;
        let features = &candidate.features;
        Some(Self {
            timestamp: DateTime::<Utc>::from_timestamp_millis(signal.timestamp)?,
            signal_type: signal.direction,
            entry_price: signal.entry,
            stop_loss: signal.stop,
            take_profit: signal.take_profit,
            atr: signal.atr,
            divergence: signal.divergence,
            target,
            hour: features.hour(),
            is_ny_session: features.is_session(),
            distance_to_ema50: features.dist_to_fast_trend(),
            trend_ema200: features.trend_sign(),
            volatility_shock: features.volatility_shock(),
        })
    }

    /// Model input in training order
    pub fn feature_row(&self) -> Vec<f64> {
        vec![
            self.hour,
            self.is_ny_session,
            self.distance_to_ema50,
            self.trend_ema200,
            self.volatility_shock,
        ]
    }
}

#[derive(Debug, Clone, Default)]
pub struct MiningReport {
    pub candidates: usize,
    pub skipped_unresolved: usize,
    pub samples: Vec<LabeledSample>,
}

impl MiningReport {
    pub fn wins(&self) -> usize {
        self.samples.iter().filter(|s| s.target == 1).count()
    }

    /// Share of labeled samples that reached their target, in percent
    pub fn base_win_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.wins() as f64 / self.samples.len() as f64 * 100.0
    }
}

/// Mines every candidate of a history and labels it with its outcome
pub struct DatasetMiner<'a> {
    harness: &'a ScanHarness,
    holding_horizon: Duration,
}

impl<'a> DatasetMiner<'a> {
    pub fn new(harness: &'a ScanHarness, holding_horizon: Duration) -> Self {
        Self {
            harness,
            holding_horizon,
        }
    }

    /// Same candidates as `ScanHarness::scan_range`, evaluated in parallel
    pub fn collect_candidates(
        &self,
        series: &AugmentedSeries,
        correlated: Option<&AugmentedSeries>,
    ) -> Result<Vec<Candidate>, EngineError> {
        let found: Vec<Option<Candidate>> = self
            .harness
            .full_range(series)
            .into_par_iter()
            .map(|i| self.harness.evaluate_at(series, i, correlated))
            .collect::<Result<_, _>>()?;

        Ok(found.into_iter().flatten().collect())
    }

    pub fn mine(
        &self,
        series: &AugmentedSeries,
        correlated: Option<&AugmentedSeries>,
    ) -> Result<MiningReport> {
        let candidates = self
            .collect_candidates(series, correlated)
            .context("Scan failed while mining")?;

        let mut report = MiningReport {
            candidates: candidates.len(),
            ..Default::default()
        };

        for candidate in &candidates {
            let outcome = resolve_outcome(series.candles(), &candidate.signal, self.holding_horizon);
            let Some(target) = outcome.label() else {
                report.skipped_unresolved += 1;
                continue;
            };
            if let Some(sample) = LabeledSample::from_candidate(candidate, target) {
                report.samples.push(sample);
            }
        }

        info!(
            "DatasetMiner: {} candidates, {} labeled, {} unresolved, base win rate {:.2}%",
            report.candidates,
            report.samples.len(),
            report.skipped_unresolved,
            report.base_win_rate()
        );
        Ok(report)
    }
}

pub fn write_samples<W: Write>(writer: W, samples: &[LabeledSample]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for sample in samples {
        wtr.serialize(sample)
            .context("Failed to serialize labeled sample")?;
    }
    wtr.flush().context("Failed to flush dataset writer")?;
    Ok(())
}

pub fn read_samples<R: Read>(reader: R) -> Result<Vec<LabeledSample>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize()
        .enumerate()
        .map(|(row, record)| record.with_context(|| format!("Invalid dataset row {}", row + 1)))
        .collect()
}
