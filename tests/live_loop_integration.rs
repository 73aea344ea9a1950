mod common;

use common::*;
use po3sniper::application::agents::live_scanner::{LiveScanner, LiveScannerConfig};
use po3sniper::application::agents::session::SessionState;
use po3sniper::application::ml::predictor::{ProbabilityGate, ProbabilityModel};
use po3sniper::domain::errors::ModelError;
use po3sniper::domain::ml::feature_registry::FeatureVector;
use po3sniper::infrastructure::mock::{MockExecutionService, ReplayMarketDataService};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct FixedModel(Result<f64, ModelError>);

impl ProbabilityModel for FixedModel {
    fn predict(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        self.0.clone()
    }
    fn name(&self) -> &str {
        "fixed"
    }
    fn version(&self) -> &str {
        "test"
    }
}

fn scanner_config(correlated: Option<&str>) -> LiveScannerConfig {
    LiveScannerConfig {
        primary_symbol: "USTEC".to_string(),
        correlated_symbol: correlated.map(str::to_string),
        candle_window: 500,
        poll_interval: Duration::from_millis(5),
        cooldown: Duration::from_millis(5),
        lot_size: dec!(0.01),
        log_capacity: 50,
        order_capacity: 50,
    }
}

async fn replay(cursor: usize, advancing: bool) -> ReplayMarketDataService {
    let feed = if advancing {
        ReplayMarketDataService::new(cursor).advancing_on("USTEC")
    } else {
        ReplayMarketDataService::new(cursor)
    };
    let rows = bearish_rows_with_follow_through(50);
    feed.insert("USTEC", minute_candles("USTEC", &rows)).await;
    feed.insert("US500", minute_candles("US500", &vec![(50.0, 50.5, 49.5, 50.0); rows.len()]))
        .await;
    feed
}

fn scanner(
    feed: ReplayMarketDataService,
    execution: MockExecutionService,
    model: Result<f64, ModelError>,
    correlated: Option<&str>,
) -> LiveScanner {
    LiveScanner::new(
        Arc::new(feed),
        Arc::new(execution),
        harness(),
        ProbabilityGate::new(Arc::new(FixedModel(model)), 0.70),
        scanner_config(correlated),
    )
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_approved_setup_sends_one_limit_order() {
    // First fetch moves the cursor to 31: candle 30 is forming, 29 is scanned
    let feed = replay(30, true).await;
    let execution = MockExecutionService::new();
    let scanner = scanner(feed.clone(), execution.clone(), Ok(0.85), Some("US500"));
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    let cursor = feed.clone();
    wait_for(move || cursor.cursor() >= 40).await;
    control.request_stop();
    let report = handle.await.unwrap();

    let orders = execution.orders().await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].signal.index, 29);
    assert_eq!(orders[0].quantity, dec!(0.01));
    assert_close(orders[0].signal.entry, 101.8);

    assert_eq!(report.final_state, SessionState::Stopped);
    assert_eq!(report.orders.len(), 1);
    assert_eq!(report.errors, 0);
    assert!(report.cycles >= 2);
}

#[tokio::test]
async fn test_same_setup_is_not_traded_twice() {
    // Frozen feed: every cycle sees the same closed candle
    let feed = replay(31, false).await;
    let execution = MockExecutionService::new();
    let scanner = scanner(feed, execution.clone(), Ok(0.85), None);
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    control.request_stop();
    let report = handle.await.unwrap();

    assert!(report.cycles > 1);
    assert_eq!(execution.orders().await.len(), 1);
}

#[tokio::test]
async fn test_feed_outage_does_not_stop_the_loop() {
    let feed = replay(30, true).await;
    feed.fail_next(2);
    let execution = MockExecutionService::new();
    let scanner = scanner(feed.clone(), execution.clone(), Ok(0.85), None);
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    let cursor = feed.clone();
    wait_for(move || cursor.cursor() >= 35).await;
    control.request_stop();
    let report = handle.await.unwrap();

    assert_eq!(report.errors, 2);
    assert_eq!(execution.orders().await.len(), 1);
    assert!(report.logs.iter().any(|l| l.contains("simulated feed outage")));
}

#[tokio::test]
async fn test_model_failure_fails_closed() {
    let feed = replay(31, false).await;
    let execution = MockExecutionService::new();
    let model = Err(ModelError::Unavailable {
        reason: "no model file".to_string(),
    });
    let scanner = scanner(feed, execution.clone(), model, None);
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    tokio::time::sleep(Duration::from_millis(60)).await;
    control.request_stop();
    let report = handle.await.unwrap();

    assert!(execution.orders().await.is_empty());
    assert!(report.rejected >= 1);
    assert_eq!(report.errors, 0);
}

#[tokio::test]
async fn test_low_probability_is_rejected() {
    let feed = replay(31, false).await;
    let execution = MockExecutionService::new();
    let scanner = scanner(feed, execution.clone(), Ok(0.40), None);
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    tokio::time::sleep(Duration::from_millis(60)).await;
    control.request_stop();
    let report = handle.await.unwrap();

    assert!(execution.orders().await.is_empty());
    assert!(report.logs.iter().any(|l| l.contains("Model rejected")));
}

#[tokio::test]
async fn test_broker_rejection_is_logged_and_survived() {
    let feed = replay(31, false).await;
    let execution = MockExecutionService::new();
    execution.set_reject_orders(true);
    let scanner = scanner(feed, execution.clone(), Ok(0.9), None);
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    tokio::time::sleep(Duration::from_millis(60)).await;
    control.request_stop();
    let report = handle.await.unwrap();

    assert!(execution.orders().await.is_empty());
    assert!(report.errors >= 1);
    assert!(report.cycles > 1);
}

#[tokio::test]
async fn test_panic_flattens_positions() {
    let feed = replay(30, true).await;
    let execution = MockExecutionService::new();
    let scanner = scanner(feed, execution.clone(), Ok(0.85), None);
    let control = scanner.control();

    let handle = tokio::spawn(async move { scanner.run().await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    control.request_panic();
    let report = handle.await.unwrap();

    assert_eq!(execution.flatten_calls(), 1);
    assert_eq!(report.final_state, SessionState::Panicked);
}
