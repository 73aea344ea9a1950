use crate::application::market_data::liquidity::{detect_swings, project_confirmed_levels};
use crate::domain::errors::EngineError;
use crate::domain::market::augmented::{AugmentedSeries, FeatureColumns};
use crate::domain::market::series::CandleSeries;
use crate::domain::market::session_clock::SessionClock;
use crate::domain::trading::types::Candle;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage, TrueRange};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureEngineConfig {
    /// Series shorter than this are returned without derived columns
    pub min_history: usize,
    pub atr_period: usize,
    /// Swing window radius; the window spans `2 * radius + 1` candles
    pub swing_radius: usize,
    pub trend_fast_period: usize,
    pub trend_slow_period: usize,
}

impl Default for FeatureEngineConfig {
    fn default() -> Self {
        Self {
            min_history: 50,
            atr_period: 14,
            swing_radius: 2,
            trend_fast_period: 50,
            trend_slow_period: 200,
        }
    }
}

/// Batch feature computation. Every call recomputes all columns from scratch.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: FeatureEngineConfig,
    clock: SessionClock,
}

// ta indicators read OHLC through these traits
struct OhlcView<'a>(&'a Candle);

impl ta::High for OhlcView<'_> {
    fn high(&self) -> f64 {
        self.0.high
    }
}

impl ta::Low for OhlcView<'_> {
    fn low(&self) -> f64 {
        self.0.low
    }
}

impl ta::Close for OhlcView<'_> {
    fn close(&self) -> f64 {
        self.0.close
    }
}

/// Simple mean of the first `period` inputs, then exponential smoothing
/// continuing from that mean. Nothing is reported before the seed is complete.
struct SeededAverage {
    period: usize,
    seen: usize,
    seed: SimpleMovingAverage,
    smooth: ExponentialMovingAverage,
}

impl SeededAverage {
    /// Smoothing factor 2 / (n + 1)
    fn ema(period: usize) -> Result<Self, EngineError> {
        let seed = Self::sma(period)?;
        Self::build(period, seed, period)
    }

    /// Wilder smoothing, factor 1 / n
    fn wilder(period: usize) -> Result<Self, EngineError> {
        let seed = Self::sma(period)?;
        Self::build(period, seed, 2 * period - 1)
    }

    fn sma(period: usize) -> Result<SimpleMovingAverage, EngineError> {
        SimpleMovingAverage::new(period).map_err(|e| EngineError::InvalidConfig {
            reason: format!("period {}: {:?}", period, e),
        })
    }

    fn build(
        period: usize,
        seed: SimpleMovingAverage,
        smoothing: usize,
    ) -> Result<Self, EngineError> {
        let smooth =
            ExponentialMovingAverage::new(smoothing).map_err(|e| EngineError::InvalidConfig {
                reason: format!("smoothing period {}: {:?}", smoothing, e),
            })?;
        Ok(Self {
            period,
            seen: 0,
            seed,
            smooth,
        })
    }

    fn next(&mut self, input: f64) -> Option<f64> {
        self.seen += 1;
        if self.seen < self.period {
            self.seed.next(input);
            None
        } else if self.seen == self.period {
            // ta's EMA adopts its first input as the starting value
            let mean = self.seed.next(input);
            Some(self.smooth.next(mean))
        } else {
            Some(self.smooth.next(input))
        }
    }
}

impl FeatureEngine {
    pub fn new(config: FeatureEngineConfig, clock: SessionClock) -> Result<Self, EngineError> {
        if config.swing_radius == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "swing_radius must be > 0".to_string(),
            });
        }
        // Validate periods once; the indicators are rebuilt for each pass
        SeededAverage::wilder(config.atr_period)?;
        SeededAverage::ema(config.trend_fast_period)?;
        SeededAverage::ema(config.trend_slow_period)?;

        Ok(Self { config, clock })
    }

    pub fn config(&self) -> &FeatureEngineConfig {
        &self.config
    }

    /// Derive all columns. Short series come back unaugmented.
    pub fn augment(&self, series: CandleSeries) -> Result<AugmentedSeries, EngineError> {
        if series.len() < self.config.min_history {
            debug!(
                "FeatureEngine: {} has {} candles (< {}), skipping augmentation",
                series.symbol(),
                series.len(),
                self.config.min_history
            );
            return Ok(AugmentedSeries::unaugmented(series));
        }

        let candles = series.candles();
        let radius = self.config.swing_radius;

        let atr = self.average_true_range(candles)?;
        let (is_swing_high, is_swing_low) = detect_swings(candles, radius);

        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let target_liquidity_high = project_confirmed_levels(&highs, &is_swing_high, radius);
        let target_liquidity_low = project_confirmed_levels(&lows, &is_swing_low, radius);

        let session_anchor = self.session_anchor(candles);
        let trend_fast = Self::ema(candles, self.config.trend_fast_period)?;
        let trend_slow = Self::ema(candles, self.config.trend_slow_period)?;

        let columns = FeatureColumns {
            atr,
            is_swing_high,
            is_swing_low,
            target_liquidity_high,
            target_liquidity_low,
            session_anchor,
            trend_fast,
            trend_slow,
        };

        AugmentedSeries::with_features(series, columns)
    }

    /// Wilder-smoothed true range
    fn average_true_range(&self, candles: &[Candle]) -> Result<Vec<Option<f64>>, EngineError> {
        let mut true_range = TrueRange::new();
        let mut atr = SeededAverage::wilder(self.config.atr_period)?;

        Ok(candles
            .iter()
            .map(|c| atr.next(true_range.next(&OhlcView(c))))
            .collect())
    }

    fn ema(candles: &[Candle], period: usize) -> Result<Vec<Option<f64>>, EngineError> {
        let mut ema = SeededAverage::ema(period)?;
        Ok(candles.iter().map(|c| ema.next(c.close)).collect())
    }

    /// Open of the first candle of each local calendar day, broadcast over the day
    fn session_anchor(&self, candles: &[Candle]) -> Vec<f64> {
        let mut anchors = Vec::with_capacity(candles.len());
        let mut current_day = None;
        let mut anchor = f64::NAN;

        for candle in candles {
            let day = self.clock.local_date(candle.timestamp);
            if day != current_day {
                current_day = day;
                anchor = candle.open;
            }
            anchors.push(anchor);
        }

        anchors
    }
}
