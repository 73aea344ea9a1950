use thiserror::Error;

/// Errors raised when a candle series violates the store's ordering contract
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error(
        "Non-monotonic timestamp in {symbol} at index {index}: {current} does not follow {previous}"
    )]
    NonMonotonicTimestamp {
        symbol: String,
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("Invalid candle in {symbol} at index {index}: {reason}")]
    InvalidCandle {
        symbol: String,
        index: usize,
        reason: String,
    },
}

/// Precondition violations inside the feature and pattern engines.
///
/// These are integration errors and are never used for "not enough history",
/// which is always expressed as an absent result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Missing derived columns on {symbol}: {operation} requires an augmented series")]
    MissingColumns {
        symbol: String,
        operation: &'static str,
    },

    #[error("Derived columns for {symbol} have {actual} rows, series has {expected}")]
    MisalignedColumns {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    #[error("Index {index} out of range for {symbol} (len {len})")]
    IndexOutOfRange {
        symbol: String,
        index: usize,
        len: usize,
    },

    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Failures of the external probability model
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    #[error("Model unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Prediction failed: {reason}")]
    PredictionFailed { reason: String },

    #[error("Model returned probability {value} outside [0, 1]")]
    InvalidProbability { value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_formatting() {
        let error = EngineError::MissingColumns {
            symbol: "USTEC".to_string(),
            operation: "po3 scan",
        };

        let msg = error.to_string();
        assert!(msg.contains("USTEC"));
        assert!(msg.contains("po3 scan"));
    }

    #[test]
    fn test_series_error_formatting() {
        let error = SeriesError::NonMonotonicTimestamp {
            symbol: "US500".to_string(),
            index: 3,
            previous: 7000,
            current: 5000,
        };

        let msg = error.to_string();
        assert!(msg.contains("7000"));
        assert!(msg.contains("5000"));
        assert!(msg.contains("index 3"));
    }

    #[test]
    fn test_model_error_formatting() {
        let error = ModelError::InvalidProbability { value: 1.5 };
        assert!(error.to_string().contains("1.5"));
    }
}
