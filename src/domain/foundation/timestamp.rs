//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Creates a new timestamp by adding calendar months.
    ///
    /// Calendar-aware: the day of month is clamped when the target month is
    /// shorter (Jan 31 + 1 month = Feb 29 in a leap year).
    pub fn add_months(&self, months: u32) -> Self {
        Self(self.0 + Months::new(months))
    }

    /// Creates a new timestamp by adding calendar years.
    pub fn add_years(&self, years: u32) -> Self {
        Self(self.0 + Months::new(years * 12))
    }

    /// Creates a new timestamp by adding the specified number of days.
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    /// Creates a new timestamp by adding the specified number of seconds.
    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Whole days from `self` until `target`, any partial day rounded up.
    ///
    /// Returns 0 when `target` is not in the future.
    pub fn days_until(&self, target: &Timestamp) -> i64 {
        let millis = target.0.signed_duration_since(self.0).num_milliseconds();
        if millis <= 0 {
            return 0;
        }
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn ts(rfc3339: &str) -> Timestamp {
        Timestamp::from_datetime(
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now();
        let t = Timestamp::now();
        let after = Utc::now();

        assert!(t.as_datetime() >= &before);
        assert!(t.as_datetime() <= &after);
    }

    #[test]
    fn unix_seconds_match_the_wall_clock() {
        // 2024-01-15T00:00:00Z
        let t = ts("2024-01-15T00:00:00Z");
        assert_eq!(t.as_unix_secs(), 1705276800);
    }

    #[test]
    fn timestamp_ordering_works() {
        let t1 = ts("2024-01-15T10:30:00Z");
        let t2 = ts("2024-01-15T10:30:01Z");

        assert!(t1.is_before(&t2));
        assert!(t2.is_after(&t1));
        assert!(t1 < t2);
    }

    #[test]
    fn add_months_advances_calendar_month() {
        let t = ts("2024-03-15T09:00:00Z").add_months(1);
        assert_eq!(t.as_datetime().month(), 4);
        assert_eq!(t.as_datetime().day(), 15);
    }

    #[test]
    fn add_months_clamps_short_months() {
        let t = ts("2024-01-31T12:00:00Z").add_months(1);
        // 2024 is a leap year
        assert_eq!(t.as_datetime().month(), 2);
        assert_eq!(t.as_datetime().day(), 29);
    }

    #[test]
    fn add_years_moves_one_calendar_year() {
        let t = ts("2024-05-10T00:00:00Z").add_years(1);
        assert_eq!(t.as_datetime().year(), 2025);
        assert_eq!(t.as_datetime().month(), 5);
        assert_eq!(t.as_datetime().day(), 10);
    }

    #[test]
    fn days_until_rounds_partial_days_up() {
        let now = ts("2024-01-01T00:00:00Z");
        let later = ts("2024-01-03T00:00:01Z");
        assert_eq!(now.days_until(&later), 3);
    }

    #[test]
    fn days_until_exact_days_are_not_inflated() {
        let now = ts("2024-01-01T00:00:00Z");
        let later = ts("2024-01-03T00:00:00Z");
        assert_eq!(now.days_until(&later), 2);
    }

    #[test]
    fn days_until_past_target_is_zero() {
        let now = ts("2024-01-10T00:00:00Z");
        let earlier = ts("2024-01-01T00:00:00Z");
        assert_eq!(now.days_until(&earlier), 0);
    }

    #[test]
    fn timestamp_serializes_to_rfc3339_json() {
        let t = ts("2024-01-15T10:30:00Z");
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("2024-01-15"));

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
