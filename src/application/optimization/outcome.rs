use crate::domain::trading::types::{Candle, Direction, Signal, TradeOutcome};
use chrono::Duration;

/// Walk the candles after the signal until stop, target or the horizon.
///
/// Candles with timestamp in `(signal.timestamp, signal.timestamp + horizon]`
/// are inspected. Within one candle the stop is checked first, so a candle
/// touching both levels is a loss. Running out of candles without a touch is
/// an expiry; only a signal with no candle inside the horizon is unresolved.
pub fn resolve_outcome(candles: &[Candle], signal: &Signal, horizon: Duration) -> TradeOutcome {
    let deadline = signal.timestamp + horizon.num_milliseconds();
    let mut walked = 0;

    for candle in candles.iter().skip(signal.index + 1) {
        if candle.timestamp <= signal.timestamp {
            continue;
        }
        if candle.timestamp > deadline {
            break;
        }
        walked += 1;

        let (stopped, target_hit) = match signal.direction {
            Direction::Bearish => (candle.high >= signal.stop, candle.low <= signal.take_profit),
            Direction::Bullish => (candle.low <= signal.stop, candle.high >= signal.take_profit),
        };
        if stopped {
            return TradeOutcome::StopLoss { candles: walked };
        }
        if target_hit {
            return TradeOutcome::TakeProfit { candles: walked };
        }
    }

    if walked == 0 {
        TradeOutcome::Unresolved
    } else {
        TradeOutcome::Expired { candles: walked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::types::SmtCheck;

    fn candle(minute: i64, high: f64, low: f64) -> Candle {
        Candle {
            symbol: "USTEC".to_string(),
            open: (high + low) / 2.0,
            high,
            low,
            close: (high + low) / 2.0,
            volume: 0.0,
            timestamp: minute * 60_000,
        }
    }

    fn bearish_signal() -> Signal {
        Signal {
            symbol: "USTEC".to_string(),
            index: 0,
            timestamp: 0,
            direction: Direction::Bearish,
            entry: 100.0,
            stop: 101.0,
            take_profit: 98.0,
            atr: 1.0,
            smt: SmtCheck::NotRequested,
            divergence: true,
        }
    }

    #[test]
    fn test_stop_wins_when_candle_touches_both() {
        let candles = vec![candle(0, 100.2, 99.8), candle(1, 101.5, 97.5)];
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::StopLoss { candles: 1 });
    }

    #[test]
    fn test_target_hit() {
        let candles = vec![
            candle(0, 100.2, 99.8),
            candle(1, 100.5, 99.0),
            candle(2, 99.5, 97.9),
        ];
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::TakeProfit { candles: 2 });
    }

    #[test]
    fn test_horizon_elapsed_is_expired() {
        let mut candles = vec![candle(0, 100.2, 99.8)];
        candles.extend((1..=50).map(|m| candle(m, 100.5, 99.5)));
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::Expired { candles: 45 });
    }

    #[test]
    fn test_touch_after_horizon_is_ignored() {
        let mut candles = vec![candle(0, 100.2, 99.8)];
        candles.extend((1..=45).map(|m| candle(m, 100.5, 99.5)));
        candles.push(candle(46, 100.0, 97.0));
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::Expired { candles: 45 });
    }

    #[test]
    fn test_data_ending_early_without_touch_is_expired() {
        let candles = vec![candle(0, 100.2, 99.8), candle(1, 100.5, 99.5)];
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::Expired { candles: 1 });
        assert_eq!(outcome.label(), Some(0));
    }

    #[test]
    fn test_signal_on_last_candle_is_unresolved() {
        let candles = vec![candle(0, 100.2, 99.8)];
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::Unresolved);
    }

    #[test]
    fn test_gap_past_deadline_is_unresolved() {
        // Weekend gap: no candle lands inside the horizon
        let candles = vec![candle(0, 100.2, 99.8), candle(3000, 102.0, 97.0)];
        let outcome = resolve_outcome(&candles, &bearish_signal(), Duration::minutes(45));
        assert_eq!(outcome, TradeOutcome::Unresolved);
    }
}
