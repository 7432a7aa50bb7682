#![no_main]

//! Custom field payloads are arbitrary JSON. Extraction must never panic,
//! and must fall back to the default only when there is nothing to show.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use slacheck::fields::{extract_field, FieldValue};

#[derive(Arbitrary, Debug)]
struct FieldInput {
    /// Raw JSON text; invalid JSON is skipped.
    json: String,
    default: String,
}

fuzz_target!(|input: FieldInput| {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(&input.json) else {
        return;
    };

    let field = FieldValue::from_json(&value);
    let extracted = extract_field(field.as_ref(), &input.default);

    if field.is_none() {
        assert_eq!(extracted, input.default);
    }
});
