#![no_main]

//! Tracker timestamps arrive in several shapes; any string must either
//! parse or yield `None`, never panic.

use chrono::Datelike;
use libfuzzer_sys::fuzz_target;

use slacheck::dates::{parse_date, parse_date_value};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    let parsed = parse_date(Some(raw));

    // The JSON path must agree with the string path.
    let value = serde_json::Value::String(raw.to_string());
    assert_eq!(parse_date_value(Some(&value)), parsed);

    // Re-rendering a parsed value must parse back to the same instant.
    if let Some(dt) = parsed.filter(|dt| (0..=9999).contains(&dt.year())) {
        let rendered = dt.format("%Y-%m-%dT%H:%M:%S%.fZ").to_string();
        assert_eq!(parse_date(Some(&rendered)), Some(dt));
    }
});
