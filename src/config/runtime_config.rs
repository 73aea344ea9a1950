//! Live loop configuration parsing from environment variables.

use super::parse_or;
use anyhow::{Result, bail};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeEnvConfig {
    pub primary_symbol: String,
    /// Correlated instrument for SMT; `None` runs single-instrument
    pub correlated_symbol: Option<String>,
    pub candle_window: usize,
    pub poll_interval_secs: u64,
    pub cooldown_secs: u64,
    pub lot_size: Decimal,
    pub log_capacity: usize,
    pub model_path: PathBuf,
    pub model_config_path: PathBuf,
}

impl RuntimeEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let correlated_symbol = lookup("CORRELATED_SYMBOL")
            .map(|s| s.trim().to_string())
            .or_else(|| Some("US500".to_string()))
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"));

        let config = Self {
            primary_symbol: lookup("PRIMARY_SYMBOL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "USTEC".to_string()),
            correlated_symbol,
            candle_window: parse_or(lookup, "CANDLE_WINDOW", 500)?,
            poll_interval_secs: parse_or(lookup, "POLL_INTERVAL_SECS", 5)?,
            cooldown_secs: parse_or(lookup, "SIGNAL_COOLDOWN_SECS", 60)?,
            lot_size: parse_or(lookup, "LOT_SIZE", dec!(0.01))?,
            log_capacity: parse_or(lookup, "SESSION_LOG_CAPACITY", 50)?,
            model_path: parse_or(
                lookup,
                "MODEL_PATH",
                PathBuf::from("data/models/po3_sniper_v1.json"),
            )?,
            model_config_path: parse_or(
                lookup,
                "MODEL_CONFIG_PATH",
                PathBuf::from("data/models/model_config.json"),
            )?,
        };

        if config.lot_size <= Decimal::ZERO {
            bail!("LOT_SIZE must be positive (got {})", config.lot_size);
        }
        if config.candle_window < 2 {
            bail!("CANDLE_WINDOW must be at least 2 (got {})", config.candle_window);
        }

        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}
