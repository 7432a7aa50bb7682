use serde_json::{Map, Value};

/// Keys probed, in order, when a custom field arrives as an object.
const DISPLAY_KEYS: &[&str] = &["value", "displayValue", "name", "key"];

/// A custom field value as the tracker hands it over.
///
/// Plain text fields arrive as strings, single-select fields as objects
/// (`{"value": "..."}`, `{"name": "..."}`), multi-select fields as arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(String),
    SingleChoice(Map<String, Value>),
    /// Items that are `null` stay `None`.
    MultiChoice(Vec<Option<FieldValue>>),
    Unknown(Value),
}

impl FieldValue {
    /// Classify a raw JSON value. `null` means the field is unset.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(FieldValue::Scalar(s.clone())),
            Value::Object(map) => Some(FieldValue::SingleChoice(map.clone())),
            Value::Array(items) => Some(FieldValue::MultiChoice(
                items.iter().map(FieldValue::from_json).collect(),
            )),
            other => Some(FieldValue::Unknown(other.clone())),
        }
    }

    fn render(&self) -> String {
        match self {
            FieldValue::Scalar(s) => s.clone(),
            FieldValue::SingleChoice(map) => Value::Object(map.clone()).to_string(),
            FieldValue::MultiChoice(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| item.as_ref().map_or("null".to_string(), FieldValue::render))
                    .collect();
                format!("[{}]", rendered.join(", "))
            }
            FieldValue::Unknown(v) => render_json(v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Scalar(s.to_string())
    }
}

fn render_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reduce a field of any shape to a display string.
pub fn extract_field(value: Option<&FieldValue>, default: &str) -> String {
    let Some(value) = value else {
        return default.to_string();
    };

    match value {
        FieldValue::Scalar(s) => s.clone(),
        FieldValue::SingleChoice(map) => DISPLAY_KEYS
            .iter()
            .find_map(|k| map.get(*k))
            .map(render_json)
            .unwrap_or_else(|| value.render()),
        FieldValue::MultiChoice(items) => match items.first() {
            Some(first) => extract_field(first.as_ref(), default),
            None => value.render(),
        },
        FieldValue::Unknown(_) => value.render(),
    }
}
