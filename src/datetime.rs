//! Date/time helpers for API responses.
//!
//! SQLite stores timestamps as `YYYY-MM-DD HH:MM:SS` in UTC (`datetime('now')`).

use chrono::{NaiveDateTime, SecondsFormat, Utc};

/// Convert a database datetime string (YYYY-MM-DD HH:MM:SS) to RFC3339 format.
///
/// Strings that are already RFC3339, or that cannot be parsed, are returned unchanged.
pub fn to_rfc3339(datetime_str: &str) -> String {
    match NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive
            .and_utc()
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(_) => datetime_str.to_string(),
    }
}

/// Current time in RFC3339 format with millisecond precision.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current Unix time in milliseconds.
pub fn unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}
