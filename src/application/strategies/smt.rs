//! Cross-asset (SMT) divergence.
//!
//! At the moment the primary instrument raids liquidity, a correlated
//! instrument that fails to raid its own level is structural
//! non-confirmation, which is what we want to see.

use crate::domain::market::augmented::AugmentedSeries;
use crate::domain::trading::types::{Direction, SmtCheck};

/// Evaluate divergence over the raid window `[start_ts, end_ts]` (inclusive).
///
/// Missing columns, an empty slice or a slice with no confirmed level are all
/// `Unavailable`, never an error.
pub fn check_divergence(
    correlated: Option<&AugmentedSeries>,
    direction: Direction,
    start_ts: i64,
    end_ts: i64,
) -> SmtCheck {
    let Some(correlated) = correlated else {
        return SmtCheck::NotRequested;
    };
    let Some(cols) = correlated.features() else {
        return SmtCheck::Unavailable;
    };

    let range = correlated.series().range_between(start_ts, end_ts);
    if range.is_empty() {
        return SmtCheck::Unavailable;
    }

    let candles = correlated.candles();
    let mut any_level = false;
    let mut swept = false;

    for k in range {
        let (level, breaks) = match direction {
            Direction::Bearish => (
                cols.target_liquidity_high[k],
                cols.target_liquidity_high[k].is_some_and(|l| candles[k].high > l),
            ),
            Direction::Bullish => (
                cols.target_liquidity_low[k],
                cols.target_liquidity_low[k].is_some_and(|l| candles[k].low < l),
            ),
        };
        any_level |= level.is_some();
        swept |= breaks;
    }

    if !any_level {
        SmtCheck::Unavailable
    } else if swept {
        SmtCheck::NotConfirmed
    } else {
        SmtCheck::Confirmed
    }
}
