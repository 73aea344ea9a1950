use super::session::{SessionReport, TradingSession};
use crate::application::market_data::align_by_timestamp;
use crate::application::ml::predictor::{GateDecision, ProbabilityGate};
use crate::application::scan_harness::ScanHarness;
use crate::config::RuntimeEnvConfig;
use crate::domain::market::series::CandleSeries;
use crate::domain::ports::{ExecutionService, MarketDataService};
use crate::domain::trading::types::ExecutedOrder;
use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::{self, Duration, Instant};
use tracing::{error, info, warn};

/// Stop/panic requests for a running loop. Cheap to clone across tasks.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    stop: Arc<AtomicBool>,
    panic: Arc<AtomicBool>,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Flatten every position, then stop
    pub fn request_panic(&self) {
        self.panic.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn is_panic_requested(&self) -> bool {
        self.panic.load(Ordering::SeqCst)
    }

    fn should_exit(&self) -> bool {
        self.is_stop_requested() || self.is_panic_requested()
    }
}

#[derive(Debug, Clone)]
pub struct LiveScannerConfig {
    pub primary_symbol: String,
    pub correlated_symbol: Option<String>,
    pub candle_window: usize,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub lot_size: Decimal,
    pub log_capacity: usize,
    pub order_capacity: usize,
}

impl From<&RuntimeEnvConfig> for LiveScannerConfig {
    fn from(runtime: &RuntimeEnvConfig) -> Self {
        Self {
            primary_symbol: runtime.primary_symbol.clone(),
            correlated_symbol: runtime.correlated_symbol.clone(),
            candle_window: runtime.candle_window,
            poll_interval: runtime.poll_interval(),
            cooldown: runtime.cooldown(),
            lot_size: runtime.lot_size,
            log_capacity: runtime.log_capacity,
            order_capacity: runtime.log_capacity,
        }
    }
}

/// What a single polling cycle did
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    InsufficientData,
    NoSignal,
    Duplicate,
    Rejected,
    Executed(ExecutedOrder),
}

pub struct LiveScanner {
    market_service: Arc<dyn MarketDataService>,
    execution_service: Arc<dyn ExecutionService>,
    harness: ScanHarness,
    gate: ProbabilityGate,
    config: LiveScannerConfig,
    control: ControlHandle,
}

impl LiveScanner {
    pub fn new(
        market_service: Arc<dyn MarketDataService>,
        execution_service: Arc<dyn ExecutionService>,
        harness: ScanHarness,
        gate: ProbabilityGate,
        config: LiveScannerConfig,
    ) -> Self {
        Self {
            market_service,
            execution_service,
            harness,
            gate,
            config,
            control: ControlHandle::new(),
        }
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Poll until stopped. Cycle errors are logged and never end the loop.
    pub async fn run(&self) -> SessionReport {
        let mut session = TradingSession::start(self.config.log_capacity, self.config.order_capacity);
        info!(
            "LiveScanner started for {} (correlated: {:?}), polling every {:?}",
            self.config.primary_symbol, self.config.correlated_symbol, self.config.poll_interval
        );

        loop {
            if self.control.is_panic_requested() {
                self.flatten(&mut session).await;
                break;
            }
            if self.control.is_stop_requested() {
                session.log("Stop requested");
                break;
            }

            session.record_cycle();
            match self.run_cycle(&mut session).await {
                Ok(CycleOutcome::Executed(_)) => {
                    self.sleep_unless_stopped(self.config.cooldown).await;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("LiveScanner: cycle failed: {:#}", e);
                    session.record_error(&e);
                }
            }

            self.sleep_unless_stopped(self.config.poll_interval).await;
        }

        let report = session.teardown();
        info!(
            "LiveScanner stopped after {} cycles ({} errors, {} orders)",
            report.cycles,
            report.errors,
            report.orders.len()
        );
        report
    }

    /// Fetch, augment and scan the last closed candle once
    pub async fn run_cycle(&self, session: &mut TradingSession) -> Result<CycleOutcome> {
        let primary = self.fetch(&self.config.primary_symbol).await?;
        let correlated = self.fetch_correlated(&primary).await;

        let primary = self
            .harness
            .prepare(primary)
            .context("Failed to augment primary series")?;
        let correlated = correlated
            .map(|series| self.harness.prepare(series))
            .transpose()
            .context("Failed to augment correlated series")?;

        let Some(index) = ScanHarness::live_index(&primary) else {
            session.set_status("Waiting for data");
            return Ok(CycleOutcome::InsufficientData);
        };
        if let Some(last) = primary.series().last() {
            session.set_status(format!("Scanning... Price: {:.2}", last.close));
        }

        let Some(candidate) = self
            .harness
            .evaluate_at(&primary, index, correlated.as_ref())?
        else {
            return Ok(CycleOutcome::NoSignal);
        };
        let signal = candidate.signal;

        if session.already_traded(signal.timestamp) {
            return Ok(CycleOutcome::Duplicate);
        }
        session.record_signal();
        session.log(format!(
            "Pattern {} detected @ {:.2} (SMT {:?})",
            signal.direction, signal.entry, signal.smt
        ));

        let probability = match self.gate.evaluate(&candidate.features) {
            GateDecision::Approved { probability } => probability,
            GateDecision::Rejected { probability } => {
                session.record_rejection();
                session.log(format!(
                    "Model rejected ({:.1}%), required {:.1}%",
                    probability * 100.0,
                    self.gate.threshold() * 100.0
                ));
                return Ok(CycleOutcome::Rejected);
            }
            GateDecision::Failed { error } => {
                session.record_rejection();
                session.log(format!("Model unavailable, trade skipped: {}", error));
                return Ok(CycleOutcome::Rejected);
            }
        };

        session.log(format!(
            "Model approved ({:.1}%), sending limit order",
            probability * 100.0
        ));
        let order_id = self
            .execution_service
            .place_limit_order(&signal, self.config.lot_size)
            .await
            .context("Failed to place limit order")?;

        let order = ExecutedOrder {
            order_id,
            signal,
            quantity: self.config.lot_size,
            probability,
            submitted_at: Utc::now().timestamp_millis(),
        };
        session.log(format!(
            "Order {} sent: {} {} lots @ {:.2}",
            order.order_id, order.signal.direction, order.quantity, order.signal.entry
        ));
        session.record_order(order.clone());

        Ok(CycleOutcome::Executed(order))
    }

    async fn fetch(&self, symbol: &str) -> Result<CandleSeries> {
        let candles = self
            .market_service
            .get_latest_candles(symbol, self.config.candle_window)
            .await
            .with_context(|| format!("Failed to fetch candles for {}", symbol))?;
        CandleSeries::new(symbol, candles).with_context(|| format!("Invalid candle feed for {}", symbol))
    }

    /// Correlated feed aligned to the primary. Failures degrade to an empty series.
    async fn fetch_correlated(&self, primary: &CandleSeries) -> Option<CandleSeries> {
        let symbol = self.config.correlated_symbol.as_deref()?;
        let correlated = match self.fetch(symbol).await {
            Ok(series) => series,
            Err(e) => {
                warn!("LiveScanner: correlated feed unavailable: {:#}", e);
                CandleSeries::empty(symbol)
            }
        };
        let (_, aligned) = align_by_timestamp(primary, &correlated);
        Some(aligned)
    }

    async fn flatten(&self, session: &mut TradingSession) {
        session.mark_panicked();
        session.log("PANIC: closing all positions");
        if let Err(e) = self.execution_service.close_all_positions().await {
            error!("LiveScanner: failed to flatten positions: {:#}", e);
            session.record_error(&e);
        }
    }

    async fn sleep_unless_stopped(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let slice = Duration::from_millis(50);
        while !self.control.should_exit() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            time::sleep((deadline - now).min(slice)).await;
        }
    }
}
