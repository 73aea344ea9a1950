use crate::domain::market::series::CandleSeries;
use crate::domain::trading::types::Candle;
use std::cmp::Ordering;

/// Inner-join two series on timestamp.
///
/// A candle missing on either side is dropped from both. The result may be
/// empty when the two feeds do not overlap.
pub fn align_by_timestamp(primary: &CandleSeries, correlated: &CandleSeries) -> (CandleSeries, CandleSeries) {
    let a = primary.candles();
    let b = correlated.candles();
    let mut left: Vec<Candle> = Vec::with_capacity(a.len().min(b.len()));
    let mut right: Vec<Candle> = Vec::with_capacity(a.len().min(b.len()));

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].timestamp.cmp(&b[j].timestamp) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                left.push(a[i].clone());
                right.push(b[j].clone());
                i += 1;
                j += 1;
            }
        }
    }

    // Subsequences of strictly increasing series stay strictly increasing
    (
        CandleSeries::new(primary.symbol(), left).unwrap_or_else(|_| CandleSeries::empty(primary.symbol())),
        CandleSeries::new(correlated.symbol(), right)
            .unwrap_or_else(|_| CandleSeries::empty(correlated.symbol())),
    )
}
