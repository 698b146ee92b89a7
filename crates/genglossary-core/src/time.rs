//! Timestamp formatting shared by every table that stores a datetime as TEXT.
//!
//! SQLite has no native datetime type; every timestamped column round-trips
//! through an ISO-8601 string. `parse_datetime` accepts a short fallback
//! chain so rows written by slightly different formatters still load.

use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current instant, truncated to millisecond precision.
///
/// Centralizing this (rather than calling `Utc::now()` everywhere) keeps
/// every "now" in the codebase trivially swappable for tests.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Formats a timestamp as ISO-8601 with millisecond precision and a `Z` suffix.
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a timestamp stored by [`format_datetime`], with a short fallback
/// chain for strings written by other formatters (no millis, space instead
/// of `T`, naive with implied UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_format_and_parse() {
        let now = now_utc();
        let formatted = format_datetime(&now);
        let parsed = parse_datetime(&formatted).unwrap();
        assert_eq!(parsed.timestamp_millis(), now.timestamp_millis());
    }

    #[test]
    fn parses_space_separated_fallback() {
        let parsed = parse_datetime("2024-01-02 03:04:05.678");
        assert!(parsed.is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_datetime("not-a-date").is_none());
    }
}
