//! Reader for synchronized two-instrument candle files.
//!
//! The file carries one timestamp column (`time` or `timestamp`) and per-asset
//! OHLC columns prefixed `nq_` (primary) and `es_` (correlated). Files with
//! plain `open,high,low,close[,volume]` columns are read as primary-only.

use crate::domain::market::series::CandleSeries;
use crate::domain::trading::types::Candle;
use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDateTime};
use csv::StringRecord;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub const PRIMARY_PREFIX: &str = "nq_";
pub const CORRELATED_PREFIX: &str = "es_";

#[derive(Debug, Clone)]
pub struct SyncData {
    pub primary: CandleSeries,
    pub correlated: Option<CandleSeries>,
}

struct OhlcColumns {
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl OhlcColumns {
    fn resolve(headers: &StringRecord, prefix: &str) -> Option<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(&format!("{}{}", prefix, name)))
        };
        Some(Self {
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("vol").or_else(|| find("volume")).or_else(|| find("tick_volume")),
        })
    }

    fn candle(&self, record: &StringRecord, symbol: &str, timestamp: i64, row: usize) -> Result<Candle> {
        let field = |idx: usize, name: &str| -> Result<f64> {
            let raw = record
                .get(idx)
                .ok_or_else(|| anyhow!("row {}: missing {}", row, name))?;
            raw.trim()
                .parse::<f64>()
                .with_context(|| format!("row {}: invalid {} {:?}", row, name, raw))
        };
        Ok(Candle {
            symbol: symbol.to_string(),
            open: field(self.open, "open")?,
            high: field(self.high, "high")?,
            low: field(self.low, "low")?,
            close: field(self.close, "close")?,
            volume: match self.volume {
                Some(idx) => field(idx, "volume")?,
                None => 0.0,
            },
            timestamp,
        })
    }
}

/// Parse epoch seconds/milliseconds, RFC 3339, or a naive datetime taken as UTC
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        // Anything below ~5138 AD in seconds is treated as seconds
        return Ok(if n.abs() < 100_000_000_000 { n * 1000 } else { n });
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    bail!("Unrecognized timestamp {:?}", raw)
}

pub fn read_sync_data<R: Read>(reader: R, primary_symbol: &str, correlated_symbol: &str) -> Result<SyncData> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();

    let time_col = headers
        .iter()
        .position(|h| matches!(h.trim().to_ascii_lowercase().as_str(), "time" | "timestamp"))
        .ok_or_else(|| anyhow!("CSV has no time/timestamp column"))?;

    let primary_cols = OhlcColumns::resolve(&headers, PRIMARY_PREFIX)
        .or_else(|| OhlcColumns::resolve(&headers, ""))
        .ok_or_else(|| anyhow!("CSV has no primary OHLC columns"))?;
    let correlated_cols = OhlcColumns::resolve(&headers, CORRELATED_PREFIX);

    let mut primary = Vec::new();
    let mut correlated = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record.with_context(|| format!("Malformed CSV row {}", row))?;
        let raw_ts = record
            .get(time_col)
            .ok_or_else(|| anyhow!("row {}: missing timestamp", row))?;
        let timestamp = parse_timestamp(raw_ts).with_context(|| format!("row {}", row))?;

        primary.push(primary_cols.candle(&record, primary_symbol, timestamp, row)?);
        if let Some(cols) = &correlated_cols {
            correlated.push(cols.candle(&record, correlated_symbol, timestamp, row)?);
        }
    }

    let primary = CandleSeries::new(primary_symbol, primary)
        .with_context(|| format!("Invalid {} series", primary_symbol))?;
    let correlated = match correlated_cols {
        Some(_) => Some(
            CandleSeries::new(correlated_symbol, correlated)
                .with_context(|| format!("Invalid {} series", correlated_symbol))?,
        ),
        None => None,
    };

    Ok(SyncData {
        primary,
        correlated,
    })
}

pub fn load_sync_file(path: &Path, primary_symbol: &str, correlated_symbol: &str) -> Result<SyncData> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let data = read_sync_data(file, primary_symbol, correlated_symbol)?;
    info!(
        "CsvLoader: loaded {} candles from {:?} (correlated: {})",
        data.primary.len(),
        path,
        data.correlated.as_ref().map_or(0, |s| s.len())
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_sync_file() {
        let csv = "time,nq_open,nq_high,nq_low,nq_close,es_open,es_high,es_low,es_close\n\
                   2024-03-05 14:00:00,100,101,99,100.5,50,51,49,50.5\n\
                   2024-03-05 14:01:00,100.5,102,100,101,50.5,51.5,50,51\n";
        let data = read_sync_data(csv.as_bytes(), "USTEC", "US500").unwrap();

        assert_eq!(data.primary.len(), 2);
        assert_eq!(data.primary.symbol(), "USTEC");
        assert_eq!(data.primary.candles()[1].high, 102.0);
        assert_eq!(data.primary.candles()[0].volume, 0.0);
        let es = data.correlated.unwrap();
        assert_eq!(es.candles()[0].close, 50.5);
        assert_eq!(
            data.primary.candles()[1].timestamp - data.primary.candles()[0].timestamp,
            60_000
        );
    }

    #[test]
    fn test_plain_columns_are_primary_only() {
        let csv = "timestamp,open,high,low,close,volume\n1709647200,1,2,0.5,1.5,10\n";
        let data = read_sync_data(csv.as_bytes(), "USTEC", "US500").unwrap();
        assert!(data.correlated.is_none());
        assert_eq!(data.primary.candles()[0].timestamp, 1_709_647_200_000);
        assert_eq!(data.primary.candles()[0].volume, 10.0);
    }

    #[test]
    fn test_out_of_order_rows_are_rejected() {
        let csv = "time,open,high,low,close\n\
                   2024-03-05 14:01:00,1,2,0.5,1.5\n\
                   2024-03-05 14:00:00,1,2,0.5,1.5\n";
        assert!(read_sync_data(csv.as_bytes(), "USTEC", "US500").is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp("1709647200000").unwrap(), 1_709_647_200_000);
        assert_eq!(
            parse_timestamp("2024-03-05T14:00:00Z").unwrap(),
            parse_timestamp("2024-03-05 14:00:00").unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }
}
