use crate::domain::trading::types::{Candle, Signal};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

// Need async_trait for async functions in traits
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Most recent `count` candles for `symbol`, oldest first. The last candle may still be forming.
    async fn get_latest_candles(&self, symbol: &str, count: usize) -> Result<Vec<Candle>>;
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Submit a limit order for the setup, returning the broker's order id
    async fn place_limit_order(&self, signal: &Signal, quantity: Decimal) -> Result<String>;
    async fn close_all_positions(&self) -> Result<()>;
}
