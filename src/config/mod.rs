//! Configuration module for PO3 Sniper.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Detection, Runtime and Backtest. The model threshold
//! lives next to the trained model in `model_config.json`.

mod backtest_config;
mod detection_config;
mod model_config;
mod runtime_config;

pub use backtest_config::BacktestEnvConfig;
pub use detection_config::DetectionEnvConfig;
pub use model_config::{DEFAULT_THRESHOLD, ModelConfig};
pub use runtime_config::RuntimeEnvConfig;

use crate::application::scan_harness::DetectionConfig;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub detection: DetectionConfig,
    pub runtime: RuntimeEnvConfig,
    pub backtest: BacktestEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let detection = DetectionEnvConfig::from_lookup(&lookup)
            .context("Failed to load detection config")?
            .into_detection_config();
        let runtime = RuntimeEnvConfig::from_lookup(&lookup).context("Failed to load runtime config")?;
        let backtest =
            BacktestEnvConfig::from_lookup(&lookup).context("Failed to load backtest config")?;

        Ok(Self {
            detection,
            runtime,
            backtest,
        })
    }
}

/// Parse `key` if set, `default` otherwise. A present but invalid value is an error.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}={:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.detection.detector.min_lookback, 20);
        assert_eq!(config.detection.feature.atr_period, 14);
        assert_eq!(config.runtime.primary_symbol, "USTEC");
        assert_eq!(config.runtime.candle_window, 500);
        assert_eq!(config.backtest.holding_minutes, 45);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let result = Config::from_lookup(lookup(&[("SWEEP_WINDOW", "five")]));
        let err = format!("{:#}", result.unwrap_err());
        assert!(err.contains("SWEEP_WINDOW"), "{}", err);
    }

    #[test]
    fn test_blank_value_falls_back_to_default() {
        let config = Config::from_lookup(lookup(&[("POLL_INTERVAL_SECS", "  ")])).unwrap();
        assert_eq!(config.runtime.poll_interval_secs, 5);
    }
}
