//! Backtest and mining configuration parsing from environment variables.

use super::parse_or;
use crate::application::optimization::simulator::BacktestConfig;
use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct BacktestEnvConfig {
    pub starting_balance: Decimal,
    pub risk_per_trade: Decimal,
    pub holding_minutes: i64,
    pub recent_trades: usize,
}

impl BacktestEnvConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            starting_balance: parse_or(lookup, "BACKTEST_STARTING_BALANCE", dec!(10000))?,
            risk_per_trade: parse_or(lookup, "BACKTEST_RISK_PER_TRADE", dec!(100))?,
            holding_minutes: parse_or(lookup, "HOLDING_HORIZON_MINUTES", 45)?,
            recent_trades: parse_or(lookup, "BACKTEST_RECENT_TRADES", 20)?,
        })
    }

    pub fn holding_horizon(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.holding_minutes)
    }

    pub fn to_backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            starting_balance: self.starting_balance,
            risk_per_trade: self.risk_per_trade,
            holding_horizon: self.holding_horizon(),
            recent_trades: self.recent_trades,
        }
    }
}
