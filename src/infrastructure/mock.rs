use crate::domain::ports::{ExecutionService, MarketDataService};
use crate::domain::trading::types::{Candle, Signal};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// Serves recorded candles as if they were arriving live.
///
/// Every feed is cut at the same cursor. With a driver symbol set, each fetch
/// of that symbol first moves the cursor forward by one candle.
#[derive(Clone, Default)]
pub struct ReplayMarketDataService {
    feeds: Arc<RwLock<HashMap<String, Vec<Candle>>>>,
    cursor: Arc<AtomicUsize>,
    driver: Option<String>,
    failures_left: Arc<AtomicUsize>,
}

impl ReplayMarketDataService {
    pub fn new(cursor: usize) -> Self {
        Self {
            cursor: Arc::new(AtomicUsize::new(cursor)),
            ..Default::default()
        }
    }

    /// Advance the cursor each time `symbol` is fetched
    pub fn advancing_on(mut self, symbol: impl Into<String>) -> Self {
        self.driver = Some(symbol.into());
        self
    }

    pub async fn insert(&self, symbol: impl Into<String>, candles: Vec<Candle>) {
        self.feeds.write().await.insert(symbol.into(), candles);
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    /// Make the next `n` fetches fail
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    fn take_failure(&self) -> bool {
        self.failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MarketDataService for ReplayMarketDataService {
    async fn get_latest_candles(&self, symbol: &str, count: usize) -> Result<Vec<Candle>> {
        if self.take_failure() {
            bail!("ReplayMarketDataService: simulated feed outage for {}", symbol);
        }

        let feeds = self.feeds.read().await;
        let feed = feeds
            .get(symbol)
            .ok_or_else(|| anyhow!("ReplayMarketDataService: unknown symbol {}", symbol))?;

        if self.driver.as_deref() == Some(symbol) {
            let len = feed.len();
            let _ = self
                .cursor
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| Some((c + 1).min(len)));
        }

        let end = self.cursor().min(feed.len());
        let start = end.saturating_sub(count);
        Ok(feed[start..end].to_vec())
    }
}

#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: String,
    pub signal: Signal,
    pub quantity: Decimal,
}

/// Records orders instead of sending them to a broker
#[derive(Clone, Default)]
pub struct MockExecutionService {
    orders: Arc<RwLock<Vec<PlacedOrder>>>,
    reject_orders: Arc<AtomicBool>,
    flatten_calls: Arc<AtomicUsize>,
}

impl MockExecutionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    pub async fn orders(&self) -> Vec<PlacedOrder> {
        self.orders.read().await.clone()
    }

    pub fn flatten_calls(&self) -> usize {
        self.flatten_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExecutionService for MockExecutionService {
    async fn place_limit_order(&self, signal: &Signal, quantity: Decimal) -> Result<String> {
        if self.reject_orders.load(Ordering::SeqCst) {
            bail!("MockExecution: order rejected by broker");
        }

        let order_id = uuid::Uuid::new_v4().to_string();
        info!(
            "MockExecution: {} limit {} {} lots @ {:.2} (SL {:.2}, TP {:.2}) -> {}",
            signal.direction,
            signal.symbol,
            quantity,
            signal.entry,
            signal.stop,
            signal.take_profit,
            order_id
        );
        self.orders.write().await.push(PlacedOrder {
            order_id: order_id.clone(),
            signal: signal.clone(),
            quantity,
        });
        Ok(order_id)
    }

    async fn close_all_positions(&self) -> Result<()> {
        self.flatten_calls.fetch_add(1, Ordering::SeqCst);
        info!("MockExecution: closing all positions");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                symbol: "USTEC".to_string(),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1.0,
                timestamp: i as i64 * 60_000,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replay_advances_on_driver_only() {
        let feed = ReplayMarketDataService::new(3).advancing_on("USTEC");
        feed.insert("USTEC", candles(10)).await;
        feed.insert("US500", candles(10)).await;

        let nq = feed.get_latest_candles("USTEC", 2).await.unwrap();
        let es = feed.get_latest_candles("US500", 2).await.unwrap();
        assert_eq!(nq.last().unwrap().timestamp, 3 * 60_000);
        assert_eq!(es.last().unwrap().timestamp, 3 * 60_000);
        assert_eq!(nq.len(), 2);
        assert_eq!(feed.cursor(), 4);
    }

    #[tokio::test]
    async fn test_simulated_outage() {
        let feed = ReplayMarketDataService::new(5);
        feed.insert("USTEC", candles(10)).await;
        feed.fail_next(1);

        assert!(feed.get_latest_candles("USTEC", 5).await.is_err());
        assert_eq!(feed.get_latest_candles("USTEC", 5).await.unwrap().len(), 5);
        assert!(feed.get_latest_candles("XAUUSD", 5).await.is_err());
    }
}
