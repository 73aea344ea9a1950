use crate::domain::market::augmented::AugmentedSeries;
use crate::domain::market::session_clock::SessionClock;
use crate::domain::trading::types::Candle;
use serde::{Deserialize, Serialize};

/// Ordered list of feature names.
/// This order MUST match the order the probability model was trained with.
/// Any change here is a breaking change for models.
pub const FEATURE_NAMES: [&str; 5] = [
    "hour",
    "is_ny_session",
    "distance_to_ema50",
    "trend_ema200",
    "volatility_shock",
];

/// Fixed-order model input. Only `FeatureVectorBuilder` constructs it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; 5]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }

    pub fn hour(&self) -> f64 {
        self.0[0]
    }

    pub fn is_session(&self) -> f64 {
        self.0[1]
    }

    pub fn dist_to_fast_trend(&self) -> f64 {
        self.0[2]
    }

    pub fn trend_sign(&self) -> f64 {
        self.0[3]
    }

    pub fn volatility_shock(&self) -> f64 {
        self.0[4]
    }

    /// (name, value) pairs in model order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

/// Indicator values at detection time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarketContext {
    pub atr: Option<f64>,
    pub trend_fast: Option<f64>,
    pub trend_slow: Option<f64>,
}

impl MarketContext {
    /// Context at index `i`; empty when the series carries no derived columns
    pub fn at(series: &AugmentedSeries, i: usize) -> Self {
        match series.features() {
            Some(cols) => Self {
                atr: cols.atr.get(i).copied().flatten(),
                trend_fast: cols.trend_fast.get(i).copied().flatten(),
                trend_slow: cols.trend_slow.get(i).copied().flatten(),
            },
            None => Self::default(),
        }
    }
}

/// Single source of the model's feature vector for live, backtest and mining
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorBuilder {
    clock: SessionClock,
}

impl FeatureVectorBuilder {
    pub fn new(clock: SessionClock) -> Self {
        Self { clock }
    }

    pub fn build(&self, candle: &Candle, entry_price: f64, ctx: &MarketContext) -> FeatureVector {
        let hour = self.clock.local_hour(candle.timestamp);
        let is_session = if self.clock.is_primary_session(hour) {
            1.0
        } else {
            0.0
        };

        let atr = match ctx.atr {
            Some(atr) if atr > 0.0 => atr,
            _ => 1.0,
        };

        let trend_fast = ctx.trend_fast.unwrap_or(entry_price);
        let trend_slow = ctx.trend_slow.unwrap_or(entry_price);

        let dist_to_fast_trend = (entry_price - trend_fast) / atr;
        let trend_sign = if entry_price > trend_slow { 1.0 } else { 0.0 };
        let volatility_shock = candle.range() / atr;

        FeatureVector([
            hour as f64,
            is_session,
            dist_to_fast_trend,
            trend_sign,
            volatility_shock,
        ])
    }
}
