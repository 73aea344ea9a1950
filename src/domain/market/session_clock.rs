use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

/// Reference-timezone view of candle timestamps (New York by default)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    timezone: Tz,
    session_start_hour: u32,
    session_end_hour: u32,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            session_start_hour: 9,
            session_end_hour: 16,
        }
    }
}

impl SessionClock {
    pub fn new(timezone: Tz, session_start_hour: u32, session_end_hour: u32) -> Self {
        Self {
            timezone,
            session_start_hour,
            session_end_hour,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn local(&self, timestamp_ms: i64) -> Option<DateTime<Tz>> {
        DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|dt| dt.with_timezone(&self.timezone))
    }

    /// Local calendar date of an epoch-millisecond timestamp
    pub fn local_date(&self, timestamp_ms: i64) -> Option<NaiveDate> {
        self.local(timestamp_ms).map(|dt| dt.date_naive())
    }

    /// Local hour (0..24); out-of-range timestamps map to hour 0
    pub fn local_hour(&self, timestamp_ms: i64) -> u32 {
        self.local(timestamp_ms).map(|dt| dt.hour()).unwrap_or(0)
    }

    pub fn is_primary_session(&self, hour: u32) -> bool {
        (self.session_start_hour..self.session_end_hour).contains(&hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ms(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_new_york_hour_tracks_dst() {
        let clock = SessionClock::default();
        // Winter: UTC-5
        assert_eq!(clock.local_hour(ms(2024, 1, 2, 14, 30)), 9);
        // Summer: UTC-4
        assert_eq!(clock.local_hour(ms(2024, 7, 2, 14, 30)), 10);
    }

    #[test]
    fn test_local_date_rolls_at_local_midnight() {
        let clock = SessionClock::default();
        let before = clock.local_date(ms(2024, 1, 2, 4, 59)).unwrap();
        let after = clock.local_date(ms(2024, 1, 2, 5, 0)).unwrap();
        assert_eq!(before, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(after, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn test_primary_session_bounds() {
        let clock = SessionClock::default();
        assert!(!clock.is_primary_session(8));
        assert!(clock.is_primary_session(9));
        assert!(clock.is_primary_session(15));
        assert!(!clock.is_primary_session(16));
    }
}
