use super::smt::check_divergence;
use crate::domain::errors::EngineError;
use crate::domain::market::augmented::{AugmentedSeries, FeatureColumns};
use crate::domain::trading::types::{Candle, Direction, Signal};
use std::ops::Range;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Indices below this never produce a signal
    pub min_lookback: usize,
    /// Candles before the trigger inspected for the liquidity raid
    pub sweep_window: usize,
    /// Minimum gap as a fraction of ATR
    pub min_gap_atr_ratio: f64,
    pub reward_risk_ratio: f64,
    /// Divergence flag reported when no correlated series is supplied.
    /// `true` keeps single-instrument operation permissive.
    pub smt_pass_through_without_correlated: bool,
    /// Drop signals whose divergence flag is false
    pub require_divergence: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_lookback: 20,
            sweep_window: 5,
            min_gap_atr_ratio: 0.5,
            reward_risk_ratio: 2.0,
            smt_pass_through_without_correlated: true,
            require_divergence: false,
        }
    }
}

/// Three-candle imbalance (fair value gap) at the trigger index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Imbalance {
    pub direction: Direction,
    pub entry: f64,
    pub gap: f64,
}

/// Liquidity raid found inside the sweep window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raid {
    /// Level broken by the first raiding candle in the window
    pub broken_level: f64,
    pub raid_index: usize,
    /// Window extreme (max high for bearish, min low for bullish), used as the stop
    pub extreme: f64,
}

/// Detect a gap between candle `i - 2` and candle `i` of at least `ratio * atr`.
///
/// Bearish: `low[i-2] > high[i]`, entry at `low[i-2]`.
/// Bullish: `low[i] > high[i-2]`, entry at `high[i-2]`.
pub fn detect_imbalance(candles: &[Candle], i: usize, atr: f64, ratio: f64) -> Option<Imbalance> {
    if i < 2 || i >= candles.len() {
        return None;
    }
    let current = &candles[i];
    let origin = &candles[i - 2];
    let min_gap = ratio * atr;

    if origin.low > current.high {
        let gap = origin.low - current.high;
        if gap >= min_gap {
            return Some(Imbalance {
                direction: Direction::Bearish,
                entry: origin.low,
                gap,
            });
        }
    }

    if current.low > origin.high {
        let gap = current.low - origin.high;
        if gap >= min_gap {
            return Some(Imbalance {
                direction: Direction::Bullish,
                entry: origin.high,
                gap,
            });
        }
    }

    None
}

/// Look for a candle in `window` that broke the level confirmed at its own index.
///
/// The first such candle fixes the broken level; the stop comes from the whole window.
pub fn find_raid(
    candles: &[Candle],
    cols: &FeatureColumns,
    window: Range<usize>,
    direction: Direction,
) -> Option<Raid> {
    let slice = &candles[window.clone()];

    let first_break = window.clone().find_map(|k| match direction {
        Direction::Bearish => cols.target_liquidity_high[k]
            .filter(|&level| candles[k].high > level)
            .map(|level| (k, level)),
        Direction::Bullish => cols.target_liquidity_low[k]
            .filter(|&level| candles[k].low < level)
            .map(|level| (k, level)),
    })?;

    let extreme = match direction {
        Direction::Bearish => slice.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
        Direction::Bullish => slice.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
    };

    Some(Raid {
        broken_level: first_break.1,
        raid_index: first_break.0,
        extreme,
    })
}

/// PO3 (liquidity raid → displacement → imbalance) detector.
///
/// Stateless: `scan` is a pure function of the series and the index, so live
/// polling and historical replays see identical results.
#[derive(Debug, Clone)]
pub struct Po3Detector {
    config: DetectorConfig,
}

impl Po3Detector {
    pub fn new(config: DetectorConfig) -> Result<Self, EngineError> {
        if config.sweep_window == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "sweep_window must be > 0".to_string(),
            });
        }
        if config.min_lookback < config.sweep_window.max(2) {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "min_lookback {} must cover the sweep window ({}) and the 3-candle gap",
                    config.min_lookback, config.sweep_window
                ),
            });
        }
        if !(config.min_gap_atr_ratio.is_finite() && config.min_gap_atr_ratio >= 0.0) {
            return Err(EngineError::InvalidConfig {
                reason: format!("min_gap_atr_ratio {} must be >= 0", config.min_gap_atr_ratio),
            });
        }
        if !(config.reward_risk_ratio.is_finite() && config.reward_risk_ratio > 0.0) {
            return Err(EngineError::InvalidConfig {
                reason: format!("reward_risk_ratio {} must be > 0", config.reward_risk_ratio),
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Scan candle `i` for a completed PO3 setup
    pub fn scan(
        &self,
        series: &AugmentedSeries,
        i: usize,
        correlated: Option<&AugmentedSeries>,
    ) -> Result<Option<Signal>, EngineError> {
        if i < self.config.min_lookback {
            return Ok(None);
        }
        if i >= series.len() {
            return Err(EngineError::IndexOutOfRange {
                symbol: series.symbol().to_string(),
                index: i,
                len: series.len(),
            });
        }

        let cols = series.require_features("po3 scan")?;
        let candles = series.candles();

        // Still warming up
        let Some(atr) = cols.atr[i] else {
            return Ok(None);
        };

        // 1. Imbalance gates everything else
        let Some(imbalance) = detect_imbalance(candles, i, atr, self.config.min_gap_atr_ratio)
        else {
            return Ok(None);
        };

        // 2. Liquidity raid in the trailing window
        let window = i - self.config.sweep_window..i;
        let Some(raid) = find_raid(candles, cols, window.clone(), imbalance.direction) else {
            return Ok(None);
        };

        // 3. Displacement back through the raided level
        let close = candles[i].close;
        let displaced = match imbalance.direction {
            Direction::Bearish => close < raid.broken_level,
            Direction::Bullish => close > raid.broken_level,
        };
        if !displaced {
            return Ok(None);
        }

        // 4. Optional SMT confirmation over the same time window
        let smt = check_divergence(
            correlated,
            imbalance.direction,
            candles[window.start].timestamp,
            candles[window.end - 1].timestamp,
        );
        let divergence = smt.as_flag(self.config.smt_pass_through_without_correlated);
        if self.config.require_divergence && !divergence {
            debug!(
                "Po3Detector: {} setup at index {} dropped, SMT {:?}",
                imbalance.direction, i, smt
            );
            return Ok(None);
        }

        let entry = imbalance.entry;
        let stop = raid.extreme;
        let take_profit = self.take_profit(entry, stop, imbalance.direction);

        let signal = Signal {
            symbol: series.symbol().to_string(),
            index: i,
            timestamp: candles[i].timestamp,
            direction: imbalance.direction,
            entry,
            stop,
            take_profit,
            atr,
            smt,
            divergence,
        };
        debug!("Po3Detector: confirmed {} at index {}", signal, i);

        Ok(Some(signal))
    }

    fn take_profit(&self, entry: f64, stop: f64, direction: Direction) -> f64 {
        let reward = (entry - stop).abs() * self.config.reward_risk_ratio;
        match direction {
            Direction::Bullish => entry + reward,
            Direction::Bearish => entry - reward,
        }
    }
}
