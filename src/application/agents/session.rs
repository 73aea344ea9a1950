use crate::domain::ring_buffer::RingBuffer;
use crate::domain::trading::types::ExecutedOrder;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Running,
    Stopped,
    Panicked,
}

/// State owned by the live loop for the lifetime of one run
#[derive(Debug)]
pub struct TradingSession {
    started_at: DateTime<Utc>,
    state: SessionState,
    status: String,
    logs: RingBuffer<String>,
    orders: RingBuffer<ExecutedOrder>,
    cycles: u64,
    errors: u64,
    signals: u64,
    rejected: u64,
    last_order_signal: Option<i64>,
}

/// Snapshot produced when a session is torn down
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub final_state: SessionState,
    pub cycles: u64,
    pub errors: u64,
    pub signals: u64,
    pub rejected: u64,
    pub orders: Vec<ExecutedOrder>,
    pub logs: Vec<String>,
}

impl TradingSession {
    pub fn start(log_capacity: usize, order_capacity: usize) -> Self {
        let mut session = Self {
            started_at: Utc::now(),
            state: SessionState::Running,
            status: "IDLE".to_string(),
            logs: RingBuffer::new(log_capacity),
            orders: RingBuffer::new(order_capacity),
            cycles: 0,
            errors: 0,
            signals: 0,
            rejected: 0,
            last_order_signal: None,
        };
        session.log("Session started, scanning market");
        session
    }

    /// Timestamped entry in the bounded session log
    pub fn log(&mut self, message: impl AsRef<str>) {
        let entry = format!("[{}] {}", Utc::now().format("%H:%M:%S"), message.as_ref());
        info!("TradingSession: {}", message.as_ref());
        self.logs.push(entry);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn logs(&self) -> impl Iterator<Item = &String> {
        self.logs.iter()
    }

    pub fn orders(&self) -> impl Iterator<Item = &ExecutedOrder> {
        self.orders.iter()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn record_cycle(&mut self) {
        self.cycles += 1;
    }

    pub fn record_error(&mut self, error: &anyhow::Error) {
        self.errors += 1;
        self.log(format!("Cycle error: {:#}", error));
    }

    pub fn record_signal(&mut self) {
        self.signals += 1;
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub fn record_order(&mut self, order: ExecutedOrder) {
        self.last_order_signal = Some(order.signal.timestamp);
        self.orders.push(order);
    }

    /// Whether an order was already sent for the setup confirmed at `timestamp`
    pub fn already_traded(&self, timestamp: i64) -> bool {
        self.last_order_signal == Some(timestamp)
    }

    pub fn mark_panicked(&mut self) {
        self.state = SessionState::Panicked;
    }

    pub fn teardown(mut self) -> SessionReport {
        if self.state != SessionState::Panicked {
            self.state = SessionState::Stopped;
        }
        self.log("Session stopped");

        SessionReport {
            started_at: self.started_at,
            stopped_at: Utc::now(),
            final_state: self.state,
            cycles: self.cycles,
            errors: self.errors,
            signals: self.signals,
            rejected: self.rejected,
            orders: self.orders.to_vec(),
            logs: self.logs.to_vec(),
        }
    }
}
