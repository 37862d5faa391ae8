#![deny(unsafe_code)]

//! Extension markers attached to converted values.

use serde_json::{Value, json};

/// Marks a field value the source message explicitly cleared (the `""`
/// sentinel), as opposed to a field that was simply never sent.
pub const DELETED_FIELD_EXTENSION_URL: &str = "urn:hl7v2:field-deleted";

/// An empty value carrying the deletion marker extension.
pub fn deleted_value() -> Value {
    json!({
        "extension": [{
            "url": DELETED_FIELD_EXTENSION_URL,
            "valueBoolean": true,
        }]
    })
}

/// Whether `value` is a deletion-marked empty value.
pub fn is_deleted_value(value: &Value) -> bool {
    value
        .get("extension")
        .and_then(Value::as_array)
        .is_some_and(|exts| {
            exts.iter()
                .any(|e| e.get("url").and_then(Value::as_str) == Some(DELETED_FIELD_EXTENSION_URL))
        })
}
