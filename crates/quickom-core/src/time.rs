//! Time conversion between local records and the provider wire format.
//!
//! Records keep epoch seconds and durations in seconds. The provider speaks
//! ISO-8601 UTC timestamps ending in `Z` and whole-minute durations.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Timestamp layout the provider accepts for `start_time`.
const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Layouts accepted when the provider omits the offset.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Formats epoch seconds as a provider UTC timestamp.
///
/// Returns `None` when the value is outside chrono's representable range.
pub fn format_provider_time(epoch_secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.format(PROVIDER_TIME_FORMAT).to_string())
}

/// Parses a provider timestamp into epoch seconds.
///
/// Accepts RFC 3339 with any offset, and offset-less timestamps which are
/// read as UTC.
pub fn parse_provider_time(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc().timestamp())
}

/// Converts seconds to whole minutes, rounding up.
pub fn seconds_to_minutes_ceil(seconds: i64) -> i64 {
    let seconds = seconds.max(0);
    seconds / 60 + i64::from(seconds % 60 != 0)
}

/// Converts provider minutes to seconds.
pub fn minutes_to_seconds(minutes: i64) -> i64 {
    minutes.saturating_mul(60)
}

/// Current time as epoch seconds.
pub fn now_epoch() -> i64 {
    Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_z_suffix() {
        assert_eq!(
            format_provider_time(1_585_540_980).as_deref(),
            Some("2020-03-30T04:03:00Z")
        );
        assert_eq!(format_provider_time(0).as_deref(), Some("1970-01-01T00:00:00Z"));
    }

    #[test]
    fn parses_rfc3339_and_offsets() {
        assert_eq!(parse_provider_time("2020-03-30T04:03:00Z"), Some(1_585_540_980));
        assert_eq!(
            parse_provider_time("2020-03-30T06:03:00+02:00"),
            Some(1_585_540_980)
        );
    }

    #[test]
    fn parses_naive_as_utc() {
        assert_eq!(parse_provider_time("2020-03-30T04:03:00"), Some(1_585_540_980));
        assert_eq!(parse_provider_time("2020-03-30 04:03:00"), Some(1_585_540_980));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_provider_time("tomorrow"), None);
        assert_eq!(parse_provider_time(""), None);
    }

    #[test]
    fn format_then_parse_is_stable() {
        let t = 1_700_000_000;
        let s = format_provider_time(t).unwrap();
        assert_eq!(parse_provider_time(&s), Some(t));
    }

    #[test]
    fn minute_rounding() {
        assert_eq!(seconds_to_minutes_ceil(3600), 60);
        assert_eq!(seconds_to_minutes_ceil(3601), 61);
        assert_eq!(seconds_to_minutes_ceil(59), 1);
        assert_eq!(seconds_to_minutes_ceil(0), 0);
        assert_eq!(seconds_to_minutes_ceil(-5), 0);
        assert_eq!(seconds_to_minutes_ceil(i64::MAX), i64::MAX / 60 + 1);
        assert_eq!(
            seconds_to_minutes_ceil(minutes_to_seconds(i64::MAX)),
            i64::MAX / 60 + 1
        );
        assert_eq!(minutes_to_seconds(90), 5400);
    }
}
