//! Swing (fractal) detection and causal liquidity levels.
//!
//! A swing at index `i` is decided by a window reaching `radius` candles into
//! the future, so it only becomes knowable at `i + radius`. The projected
//! levels are published at that confirmation index and held until the next
//! confirmation.

use crate::domain::trading::types::Candle;

/// Geometric swing flags over the centred window `[i - radius, i + radius]`.
///
/// Indices whose window is incomplete are never swings. Ties count: every
/// candle equal to the window extreme is flagged.
pub fn detect_swings(candles: &[Candle], radius: usize) -> (Vec<bool>, Vec<bool>) {
    let n = candles.len();
    let mut swing_high = vec![false; n];
    let mut swing_low = vec![false; n];

    if radius == 0 || n < 2 * radius + 1 {
        return (swing_high, swing_low);
    }

    for i in radius..n - radius {
        let window = &candles[i - radius..=i + radius];
        let max_high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let min_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

        swing_high[i] = candles[i].high == max_high;
        swing_low[i] = candles[i].low == min_low;
    }

    (swing_high, swing_low)
}

/// Most recent swing price confirmed at or before each index.
///
/// At index `j >= radius` the swing geometrically located at `j - radius`
/// (if any) becomes the current level. `levels[j]` never depends on a candle
/// after `j`.
pub fn project_confirmed_levels(
    prices: &[f64],
    swing_flags: &[bool],
    radius: usize,
) -> Vec<Option<f64>> {
    let mut last_confirmed: Option<f64> = None;
    let mut levels = Vec::with_capacity(prices.len());

    for j in 0..prices.len() {
        if j >= radius {
            let origin = j - radius;
            if swing_flags.get(origin).copied().unwrap_or(false) {
                last_confirmed = Some(prices[origin]);
            }
        }
        levels.push(last_confirmed);
    }

    levels
}
