#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use po3sniper::application::market_data::FeatureEngineConfig;
use po3sniper::application::scan_harness::{DetectionConfig, ScanHarness};
use po3sniper::domain::market::series::CandleSeries;
use po3sniper::domain::trading::types::Candle;

/// 2024-03-05 14:00 UTC, 09:00 in New York
pub fn session_start_ms() -> i64 {
    Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0)
        .unwrap()
        .timestamp_millis()
}

pub fn minute_candles(symbol: &str, rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    let start = session_start_ms();
    rows.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            symbol: symbol.to_string(),
            open,
            high,
            low,
            close,
            volume: 100.0,
            timestamp: start + i as i64 * 60_000,
        })
        .collect()
}

/// Twenty quiet candles, a swing high at 102 (index 20), a raid of it at
/// index 25 and a bearish displacement leaving a gap between 27 and 29.
pub fn bearish_rows() -> Vec<(f64, f64, f64, f64)> {
    let mut rows = vec![(100.0, 100.5, 99.5, 100.0); 20];
    rows.extend([
        (100.0, 102.0, 99.8, 101.5),
        (101.5, 101.8, 100.8, 101.0),
        (101.0, 101.5, 100.5, 101.2),
        (101.2, 101.6, 100.9, 101.4),
        (101.4, 101.9, 101.0, 101.7),
        (101.7, 103.0, 101.5, 102.5),
        (102.5, 102.8, 101.8, 102.2),
        (102.2, 102.4, 101.8, 101.9),
        (101.9, 101.9, 99.0, 99.2),
        (99.2, 99.5, 98.5, 98.8),
    ]);
    rows
}

/// The bearish setup followed by candles that reach its target
pub fn bearish_rows_with_follow_through(extra: usize) -> Vec<(f64, f64, f64, f64)> {
    let mut rows = bearish_rows();
    rows.extend(std::iter::repeat_n((98.5, 98.8, 98.2, 98.5), extra));
    rows
}

/// The bearish setup followed by `extra` quiet candles that touch neither
/// the stop (103) nor the target (99.4)
pub fn bearish_rows_then_drift(extra: usize) -> Vec<(f64, f64, f64, f64)> {
    let mut rows = bearish_rows();
    rows.extend(std::iter::repeat_n((100.0, 100.5, 99.6, 100.0), extra));
    rows
}

pub fn series(symbol: &str, rows: &[(f64, f64, f64, f64)]) -> CandleSeries {
    CandleSeries::new(symbol, minute_candles(symbol, rows)).unwrap()
}

/// Detection defaults with a warm-up short enough for the fixtures
pub fn detection_config() -> DetectionConfig {
    DetectionConfig {
        feature: FeatureEngineConfig {
            min_history: 20,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn harness() -> ScanHarness {
    ScanHarness::new(detection_config()).unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
