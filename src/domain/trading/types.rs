use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV observation. `timestamp` is UTC epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: i64,
}

impl Candle {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "BULLISH"),
            Direction::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// Result of the cross-asset (SMT) divergence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmtCheck {
    /// No correlated series was supplied to the scan
    NotRequested,
    /// Correlated instrument failed to break its own liquidity level
    Confirmed,
    /// Correlated instrument broke its level as well
    NotConfirmed,
    /// Correlated window was empty or carried no confirmed level
    Unavailable,
}

impl SmtCheck {
    /// Caller-facing divergence flag.
    ///
    /// `pass_through` only applies when no correlated series was supplied;
    /// every other undecided case evaluates to `false`.
    pub fn as_flag(self, pass_through: bool) -> bool {
        match self {
            SmtCheck::NotRequested => pass_through,
            SmtCheck::Confirmed => true,
            SmtCheck::NotConfirmed | SmtCheck::Unavailable => false,
        }
    }
}

/// A confirmed PO3 setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub index: usize,
    pub timestamp: i64,
    pub direction: Direction,
    pub entry: f64,
    pub stop: f64,
    pub take_profit: f64,
    pub atr: f64,
    pub smt: SmtCheck,
    pub divergence: bool,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {:.2} (SL {:.2}, TP {:.2}, SMT {:?})",
            self.direction, self.symbol, self.entry, self.stop, self.take_profit, self.smt
        )
    }
}

/// Order acknowledged by the execution collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedOrder {
    pub order_id: String,
    pub signal: Signal,
    pub quantity: Decimal,
    pub probability: f64,
    pub submitted_at: i64,
}

/// How a trade resolved inside the holding horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    TakeProfit { candles: usize },
    StopLoss { candles: usize },
    /// No touch inside the horizon, or the data ran out before one
    Expired { candles: usize },
    /// No candle after the signal falls inside the horizon
    Unresolved,
}

impl TradeOutcome {
    /// Binary training label; `None` for unresolved trades
    pub fn label(&self) -> Option<u8> {
        match self {
            TradeOutcome::TakeProfit { .. } => Some(1),
            TradeOutcome::StopLoss { .. } | TradeOutcome::Expired { .. } => Some(0),
            TradeOutcome::Unresolved => None,
        }
    }
}
