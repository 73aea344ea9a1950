use crate::domain::errors::EngineError;
use crate::domain::market::series::CandleSeries;
use crate::domain::trading::types::Candle;

/// Derived columns, one entry per candle.
///
/// `is_swing_high`/`is_swing_low` look `r` candles ahead and are published for
/// inspection only. Everything the pattern engine reads at index `i` depends on
/// candles `0..=i`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureColumns {
    pub atr: Vec<Option<f64>>,
    pub is_swing_high: Vec<bool>,
    pub is_swing_low: Vec<bool>,
    pub target_liquidity_high: Vec<Option<f64>>,
    pub target_liquidity_low: Vec<Option<f64>>,
    pub session_anchor: Vec<f64>,
    pub trend_fast: Vec<Option<f64>>,
    pub trend_slow: Vec<Option<f64>>,
}

impl FeatureColumns {
    pub fn len(&self) -> usize {
        self.atr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atr.is_empty()
    }

    fn is_consistent(&self, len: usize) -> bool {
        self.atr.len() == len
            && self.is_swing_high.len() == len
            && self.is_swing_low.len() == len
            && self.target_liquidity_high.len() == len
            && self.target_liquidity_low.len() == len
            && self.session_anchor.len() == len
            && self.trend_fast.len() == len
            && self.trend_slow.len() == len
    }
}

/// A candle series plus its derived columns, if the feature engine produced them
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedSeries {
    series: CandleSeries,
    features: Option<FeatureColumns>,
}

impl AugmentedSeries {
    /// Series the feature engine declined to augment (not enough history)
    pub fn unaugmented(series: CandleSeries) -> Self {
        Self {
            series,
            features: None,
        }
    }

    pub fn with_features(
        series: CandleSeries,
        features: FeatureColumns,
    ) -> Result<Self, EngineError> {
        if !features.is_consistent(series.len()) {
            return Err(EngineError::MisalignedColumns {
                symbol: series.symbol().to_string(),
                expected: series.len(),
                actual: features.len(),
            });
        }
        Ok(Self {
            series,
            features: Some(features),
        })
    }

    pub fn series(&self) -> &CandleSeries {
        &self.series
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn candles(&self) -> &[Candle] {
        self.series.candles()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn is_augmented(&self) -> bool {
        self.features.is_some()
    }

    pub fn features(&self) -> Option<&FeatureColumns> {
        self.features.as_ref()
    }

    /// Derived columns, or a precondition violation naming the caller
    pub fn require_features(&self, operation: &'static str) -> Result<&FeatureColumns, EngineError> {
        self.features
            .as_ref()
            .ok_or_else(|| EngineError::MissingColumns {
                symbol: self.series.symbol().to_string(),
                operation,
            })
    }
}
