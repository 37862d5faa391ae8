#![deny(unsafe_code)]

//! Address assembly from XAD composites and free text.

use serde_json::{Map, Value, json};

use v2f_model::message::SourceValue;

use crate::text;

fn address_use(code: &str) -> Option<&'static str> {
    match code.trim().to_uppercase().as_str() {
        "H" | "P" => Some("home"),
        "B" | "O" => Some("work"),
        "C" => Some("temp"),
        "BA" => Some("old"),
        _ => None,
    }
}

fn from_composite(value: &SourceValue) -> Option<Value> {
    let mut address = Map::new();
    let mut lines = Vec::new();
    // XAD-1 is itself an SAD composite; the street text is first.
    if let Some(street) = value.subcomponent(1, 1) {
        lines.push(json!(street));
    }
    if let Some(other) = value.component(2) {
        lines.push(json!(other));
    }
    if !lines.is_empty() {
        address.insert("line".to_string(), json!(lines));
    }
    if let Some(city) = value.component(3) {
        address.insert("city".to_string(), json!(city));
    }
    if let Some(state) = value.component(4) {
        address.insert("state".to_string(), json!(state));
    }
    if let Some(postal) = value.component(5) {
        address.insert("postalCode".to_string(), json!(postal));
    }
    if let Some(country) = value.component(6) {
        address.insert("country".to_string(), json!(country));
    }
    if let Some(use_code) = value.component(7).and_then(address_use) {
        address.insert("use".to_string(), json!(use_code));
    }
    // XAD-7 "M" is a mailing address: a type, not a use.
    if value.component(7).map(str::trim) == Some("M") {
        address.insert("type".to_string(), json!("postal"));
    }
    if address.is_empty() {
        None
    } else {
        Some(Value::Object(address))
    }
}

fn from_free_text(raw: &str) -> Option<Value> {
    let parsed = text::parse_address(raw);
    let mut address = Map::new();
    if !parsed.lines.is_empty() {
        address.insert("line".to_string(), json!(parsed.lines));
    }
    if let Some(city) = parsed.city {
        address.insert("city".to_string(), json!(city));
    }
    if let Some(state) = parsed.state {
        address.insert("state".to_string(), json!(state));
    }
    if let Some(postal) = parsed.postal_code {
        address.insert("postalCode".to_string(), json!(postal));
    }
    if address.is_empty() {
        None
    } else {
        address.insert("text".to_string(), json!(raw.trim()));
        Some(Value::Object(address))
    }
}

pub fn to_address(value: &SourceValue) -> Option<Value> {
    if value.is_scalar() {
        from_free_text(&value.raw())
    } else {
        from_composite(value)
    }
}
