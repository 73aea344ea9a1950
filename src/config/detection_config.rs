//! Detection parameters shared by live, backtest and mining runs.

use super::parse_or;
use crate::application::market_data::FeatureEngineConfig;
use crate::application::scan_harness::DetectionConfig;
use crate::application::strategies::DetectorConfig;
use crate::domain::market::session_clock::SessionClock;
use anyhow::{Result, anyhow};
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct DetectionEnvConfig {
    pub min_history: usize,
    pub atr_period: usize,
    pub swing_radius: usize,
    pub trend_fast_period: usize,
    pub trend_slow_period: usize,

    pub min_lookback: usize,
    pub sweep_window: usize,
    pub min_gap_atr_ratio: f64,
    pub reward_risk_ratio: f64,
    pub smt_pass_through: bool,
    pub require_divergence: bool,

    pub session_timezone: Tz,
    pub session_start_hour: u32,
    pub session_end_hour: u32,
}

impl DetectionEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let feature = FeatureEngineConfig::default();
        let detector = DetectorConfig::default();
        let clock = SessionClock::default();

        let session_timezone = match lookup("SESSION_TIMEZONE") {
            Some(name) if !name.trim().is_empty() => name
                .trim()
                .parse::<Tz>()
                .map_err(|e| anyhow!("Invalid SESSION_TIMEZONE {:?}: {}", name, e))?,
            _ => clock.timezone(),
        };

        let config = Self {
            min_history: parse_or(lookup, "MIN_HISTORY", feature.min_history)?,
            atr_period: parse_or(lookup, "ATR_PERIOD", feature.atr_period)?,
            swing_radius: parse_or(lookup, "SWING_RADIUS", feature.swing_radius)?,
            trend_fast_period: parse_or(lookup, "TREND_FAST_PERIOD", feature.trend_fast_period)?,
            trend_slow_period: parse_or(lookup, "TREND_SLOW_PERIOD", feature.trend_slow_period)?,

            min_lookback: parse_or(lookup, "MIN_LOOKBACK", detector.min_lookback)?,
            sweep_window: parse_or(lookup, "SWEEP_WINDOW", detector.sweep_window)?,
            min_gap_atr_ratio: parse_or(lookup, "MIN_GAP_ATR_RATIO", detector.min_gap_atr_ratio)?,
            reward_risk_ratio: parse_or(lookup, "REWARD_RISK_RATIO", detector.reward_risk_ratio)?,
            smt_pass_through: parse_or(
                lookup,
                "SMT_PASS_THROUGH",
                detector.smt_pass_through_without_correlated,
            )?,
            require_divergence: parse_or(lookup, "REQUIRE_DIVERGENCE", detector.require_divergence)?,

            session_timezone,
            session_start_hour: parse_or(lookup, "SESSION_START_HOUR", 9)?,
            session_end_hour: parse_or(lookup, "SESSION_END_HOUR", 16)?,
        };

        if config.session_start_hour >= config.session_end_hour || config.session_end_hour > 24 {
            return Err(anyhow!(
                "Session hours must satisfy start < end <= 24 (got {}..{})",
                config.session_start_hour,
                config.session_end_hour
            ));
        }

        Ok(config)
    }

    pub fn into_detection_config(self) -> DetectionConfig {
        DetectionConfig {
            feature: FeatureEngineConfig {
                min_history: self.min_history,
                atr_period: self.atr_period,
                swing_radius: self.swing_radius,
                trend_fast_period: self.trend_fast_period,
                trend_slow_period: self.trend_slow_period,
            },
            detector: DetectorConfig {
                min_lookback: self.min_lookback,
                sweep_window: self.sweep_window,
                min_gap_atr_ratio: self.min_gap_atr_ratio,
                reward_risk_ratio: self.reward_risk_ratio,
                smt_pass_through_without_correlated: self.smt_pass_through,
                require_divergence: self.require_divergence,
            },
            clock: SessionClock::new(
                self.session_timezone,
                self.session_start_hour,
                self.session_end_hour,
            ),
        }
    }
}
