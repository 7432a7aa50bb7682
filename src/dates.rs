use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Offset-aware layouts, tried first. The offset is dropped after parsing.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S",
];

const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

/// Parse a tracker timestamp into a naive local datetime.
///
/// Accepts ISO-8601 with a numeric offset or a trailing `Z` (fractional
/// seconds optional), `YYYY-MM-DD HH:MM:SS`, and bare `YYYY-MM-DD`.
/// Offsets are discarded rather than normalised to UTC. Anything else,
/// including an empty string, yields `None`.
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, DATE_ONLY_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Like [`parse_date`] but for a raw JSON field; non-string values yield `None`.
pub fn parse_date_value(value: Option<&Value>) -> Option<NaiveDateTime> {
    match value {
        Some(Value::String(s)) => parse_date(Some(s)),
        _ => None,
    }
}
