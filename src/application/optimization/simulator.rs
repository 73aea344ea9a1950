use super::outcome::resolve_outcome;
use crate::application::ml::predictor::{GateDecision, ProbabilityGate};
use crate::application::scan_harness::{Candidate, ScanHarness};
use crate::domain::market::augmented::AugmentedSeries;
use crate::domain::trading::types::{Direction, TradeOutcome};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub starting_balance: Decimal,
    /// Fixed amount lost on a stopped or expired trade
    pub risk_per_trade: Decimal,
    pub holding_horizon: Duration,
    /// Trades kept in the report
    pub recent_trades: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            starting_balance: dec!(10000),
            risk_per_trade: dec!(100),
            holding_horizon: Duration::minutes(45),
            recent_trades: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Win,
    Loss,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub time: String,
    #[serde(rename = "type")]
    pub direction: Direction,
    /// Model probability in percent, absent when no gate is configured
    pub prob: Option<f64>,
    pub pnl: Decimal,
    pub result: TradeResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub final_balance: Decimal,
    pub net_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub summary: SummaryStats,
    pub recent_trades: Vec<TradeRecord>,
    /// Set when the run was stopped before the end of the history
    #[serde(default)]
    pub interrupted: bool,
}

impl BacktestSummary {
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).context("Failed to serialize backtest report")
    }
}

/// Replays the shared scan over a whole history with fixed-risk accounting
pub struct Backtester<'a> {
    harness: &'a ScanHarness,
    gate: Option<&'a ProbabilityGate>,
    stop: Option<Arc<AtomicBool>>,
    config: BacktestConfig,
}

impl<'a> Backtester<'a> {
    pub fn new(harness: &'a ScanHarness, config: BacktestConfig) -> Self {
        Self {
            harness,
            gate: None,
            stop: None,
            config,
        }
    }

    pub fn with_gate(mut self, gate: &'a ProbabilityGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Checked before each index is scanned; a raised flag ends the run early
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().is_some_and(|s| s.load(Ordering::SeqCst))
    }

    pub fn run(
        &self,
        series: &AugmentedSeries,
        correlated: Option<&AugmentedSeries>,
    ) -> Result<BacktestSummary> {
        info!(
            "Backtester: simulating {} candles of {}",
            series.len(),
            series.symbol()
        );
        let reward = self.reward_per_win();
        let mut balance = self.config.starting_balance;
        let mut trades = Vec::new();
        let mut interrupted = false;

        for i in self.harness.full_range(series) {
            if self.stop_requested() {
                warn!("Backtester: stop requested, ending replay early at index {}", i);
                interrupted = true;
                break;
            }

            let Some(candidate) = self
                .harness
                .evaluate_at(series, i, correlated)
                .with_context(|| format!("Scan failed during backtest at index {}", i))?
            else {
                continue;
            };

            let probability = match self.consult_gate(&candidate) {
                Some(decision) if decision.is_approved() => decision.probability(),
                Some(_) => continue,
                None => None,
            };

            let outcome = resolve_outcome(
                series.candles(),
                &candidate.signal,
                self.config.holding_horizon,
            );
            let (pnl, result) = match outcome {
                TradeOutcome::Unresolved => {
                    debug!(
                        "Backtester: skipping unresolved trade at index {}",
                        candidate.signal.index
                    );
                    continue;
                }
                TradeOutcome::TakeProfit { .. } => (reward, TradeResult::Win),
                TradeOutcome::StopLoss { .. } | TradeOutcome::Expired { .. } => {
                    (-self.config.risk_per_trade, TradeResult::Loss)
                }
            };

            balance += pnl;
            trades.push(TradeRecord {
                time: format_timestamp(candidate.signal.timestamp),
                direction: candidate.signal.direction,
                prob: probability.map(|p| (p * 10_000.0).round() / 100.0),
                pnl,
                result,
            });
        }

        let summary = self.summarize(&trades, balance);
        info!(
            "Backtester: {} trades, {:.2}% win rate, net profit {}",
            summary.total_trades, summary.win_rate, summary.net_profit
        );

        let skip = trades.len().saturating_sub(self.config.recent_trades);
        Ok(BacktestSummary {
            summary,
            recent_trades: trades.into_iter().skip(skip).collect(),
            interrupted,
        })
    }

    fn consult_gate(&self, candidate: &Candidate) -> Option<GateDecision> {
        self.gate.map(|gate| gate.evaluate(&candidate.features))
    }

    fn reward_per_win(&self) -> Decimal {
        let ratio = self.harness.detector().config().reward_risk_ratio;
        Decimal::from_f64(ratio).unwrap_or(Decimal::TWO) * self.config.risk_per_trade
    }

    fn summarize(&self, trades: &[TradeRecord], balance: Decimal) -> SummaryStats {
        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.result == TradeResult::Win).count();
        let losses = total_trades - wins;
        let win_rate = if total_trades > 0 {
            ((wins as f64 / total_trades as f64) * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        SummaryStats {
            total_trades,
            wins,
            losses,
            win_rate,
            final_balance: balance.round_dp(2),
            net_profit: (balance - self.config.starting_balance).round_dp(2),
        }
    }
}

fn format_timestamp(ts_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::series::CandleSeries;
    use crate::domain::trading::types::Candle;

    #[test]
    fn test_report_serializes_type_and_result_keys() {
        let report = BacktestSummary {
            summary: SummaryStats {
                total_trades: 1,
                wins: 1,
                losses: 0,
                win_rate: 100.0,
                final_balance: dec!(10200),
                net_profit: dec!(200),
            },
            recent_trades: vec![TradeRecord {
                time: format_timestamp(0),
                direction: Direction::Bearish,
                prob: Some(71.25),
                pnl: dec!(200),
                result: TradeResult::Win,
            }],
            interrupted: false,
        };

        let mut buf = Vec::new();
        report.write_json(&mut buf).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(json["recent_trades"][0]["type"], "BEARISH");
        assert_eq!(json["recent_trades"][0]["result"], "WIN");
        assert_eq!(json["summary"]["total_trades"], 1);
    }

    #[test]
    fn test_stop_flag_is_honoured_before_scanning() {
        // Too short to augment, so scanning past the lookback would fail
        let candles = (0..30)
            .map(|i| Candle {
                symbol: "USTEC".to_string(),
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 1.0,
                timestamp: i as i64 * 60_000,
            })
            .collect();
        let harness = ScanHarness::new(Default::default()).unwrap();
        let aug = harness
            .prepare(CandleSeries::new("USTEC", candles).unwrap())
            .unwrap();
        assert!(!aug.is_augmented());

        let report = Backtester::new(&harness, BacktestConfig::default())
            .with_stop_flag(Arc::new(AtomicBool::new(true)))
            .run(&aug, None)
            .unwrap();
        assert!(report.interrupted);
        assert_eq!(report.summary.total_trades, 0);

        let unstopped = Backtester::new(&harness, BacktestConfig::default()).run(&aug, None);
        assert!(unstopped.is_err());
    }

    #[test]
    fn test_empty_run_keeps_starting_balance() {
        let harness = ScanHarness::new(Default::default()).unwrap();
        let backtester = Backtester::new(&harness, BacktestConfig::default());
        let stats = backtester.summarize(&[], dec!(10000));
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.net_profit, Decimal::ZERO);
    }
}
