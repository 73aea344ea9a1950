use crate::domain::errors::SeriesError;
use crate::domain::trading::types::Candle;
use std::ops::Range;

/// Ordered, time-indexed candles for one instrument.
///
/// Timestamps are strictly increasing; gaps between sessions are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();

        for (index, candle) in candles.iter().enumerate() {
            if !(candle.open.is_finite()
                && candle.high.is_finite()
                && candle.low.is_finite()
                && candle.close.is_finite())
            {
                return Err(SeriesError::InvalidCandle {
                    symbol,
                    index,
                    reason: "non-finite price".to_string(),
                });
            }
            if candle.low > candle.high {
                return Err(SeriesError::InvalidCandle {
                    symbol,
                    index,
                    reason: format!("low {} above high {}", candle.low, candle.high),
                });
            }
        }

        for (index, pair) in candles.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonMonotonicTimestamp {
                    symbol,
                    index: index + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }

        Ok(Self { symbol, candles })
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            candles: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Exact timestamp lookup
    pub fn index_of(&self, timestamp: i64) -> Option<usize> {
        self.candles
            .binary_search_by_key(&timestamp, |c| c.timestamp)
            .ok()
    }

    /// Indices of candles with `start <= timestamp <= end`. Empty when nothing matches.
    pub fn range_between(&self, start: i64, end: i64) -> Range<usize> {
        if start > end {
            return 0..0;
        }
        let lo = self.candles.partition_point(|c| c.timestamp < start);
        let hi = self.candles.partition_point(|c| c.timestamp <= end);
        lo..hi.max(lo)
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }
}
