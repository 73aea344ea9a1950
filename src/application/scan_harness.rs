//! One detection pipeline shared by live polling, backtesting and mining.

use crate::application::market_data::{FeatureEngine, FeatureEngineConfig};
use crate::application::strategies::{DetectorConfig, Po3Detector};
use crate::domain::errors::EngineError;
use crate::domain::market::augmented::AugmentedSeries;
use crate::domain::market::series::CandleSeries;
use crate::domain::market::session_clock::SessionClock;
use crate::domain::ml::feature_registry::{FeatureVector, FeatureVectorBuilder, MarketContext};
use crate::domain::trading::types::Signal;
use serde::Serialize;
use std::ops::Range;

/// Parameters shared by every detection mode
#[derive(Debug, Clone, Default)]
pub struct DetectionConfig {
    pub feature: FeatureEngineConfig,
    pub detector: DetectorConfig,
    pub clock: SessionClock,
}

/// A confirmed signal together with the model input derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub signal: Signal,
    pub features: FeatureVector,
}

#[derive(Debug, Clone)]
pub struct ScanHarness {
    engine: FeatureEngine,
    detector: Po3Detector,
    builder: FeatureVectorBuilder,
}

impl ScanHarness {
    pub fn new(config: DetectionConfig) -> Result<Self, EngineError> {
        Ok(Self {
            engine: FeatureEngine::new(config.feature, config.clock)?,
            detector: Po3Detector::new(config.detector)?,
            builder: FeatureVectorBuilder::new(config.clock),
        })
    }

    pub fn detector(&self) -> &Po3Detector {
        &self.detector
    }

    pub fn min_lookback(&self) -> usize {
        self.detector.config().min_lookback
    }

    pub fn prepare(&self, series: CandleSeries) -> Result<AugmentedSeries, EngineError> {
        self.engine.augment(series)
    }

    pub fn evaluate_at(
        &self,
        series: &AugmentedSeries,
        i: usize,
        correlated: Option<&AugmentedSeries>,
    ) -> Result<Option<Candidate>, EngineError> {
        let Some(signal) = self.detector.scan(series, i, correlated)? else {
            return Ok(None);
        };

        let ctx = MarketContext::at(series, i);
        let features = self.builder.build(&series.candles()[i], signal.entry, &ctx);

        Ok(Some(Candidate { signal, features }))
    }

    /// Candidates over `range` in index order. The range is clamped to the series.
    pub fn scan_range(
        &self,
        series: &AugmentedSeries,
        range: Range<usize>,
        correlated: Option<&AugmentedSeries>,
    ) -> Result<Vec<Candidate>, EngineError> {
        let end = range.end.min(series.len());
        let mut candidates = Vec::new();
        for i in range.start..end {
            if let Some(candidate) = self.evaluate_at(series, i, correlated)? {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }

    /// Indices a full historical pass evaluates
    pub fn full_range(&self, series: &AugmentedSeries) -> Range<usize> {
        self.min_lookback().min(series.len())..series.len()
    }

    /// Last closed candle; the final row of a live feed is still forming
    pub fn live_index(series: &AugmentedSeries) -> Option<usize> {
        series.len().checked_sub(2)
    }
}
