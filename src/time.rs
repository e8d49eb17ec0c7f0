//! Timestamp parsing for loosely formatted record fields.
//!
//! Records carry timestamps as RFC 3339 strings, naive ISO strings, bare dates
//! or epoch milliseconds. Nothing here fails: an unreadable timestamp is
//! reported as `None`, and ordering keys map it to the minimum value.

use crate::record::FieldValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Ordering key for a timestamp that is present but unparsable.
pub const MALFORMED_KEY: i64 = i64::MIN;

/// Ordering key for a missing timestamp (the Unix epoch).
pub const MISSING_KEY: i64 = 0;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp string. Naive timestamps are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Read a field as a timestamp: text is parsed, numbers are epoch millis.
pub fn field_timestamp(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Text(s) => parse_timestamp(s),
        FieldValue::Number(ms) if ms.is_finite() => Utc.timestamp_millis_opt(*ms as i64).single(),
        _ => None,
    }
}

/// Ordering key in epoch milliseconds.
///
/// Missing (absent or null) sorts as the epoch; present but unreadable sorts
/// below everything else.
pub fn ordering_key(value: Option<&FieldValue>) -> i64 {
    match value {
        None | Some(FieldValue::Null) => MISSING_KEY,
        Some(v) => field_timestamp(v)
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(MALFORMED_KEY),
    }
}
