#![deny(unsafe_code)]

//! HumanName assembly from XPN/XCN composites and free text.
//!
//! XCN carries an identifier in component 1, so its name components start
//! one position later than XPN's; XON organization names start one
//! earlier still (the name is component 1).

use serde_json::{Map, Value, json};

use v2f_model::message::SourceValue;

use crate::text;

fn name_use(code: &str) -> Option<&'static str> {
    match code.trim().to_uppercase().as_str() {
        "L" => Some("official"),
        "D" => Some("usual"),
        "M" => Some("maiden"),
        "N" => Some("nickname"),
        "A" | "S" => Some("anonymous"),
        "T" => Some("temp"),
        _ => None,
    }
}

/// Assemble from composite offsets: `offset` is 0 for XPN, 1 for XCN.
fn from_composite(value: &SourceValue, offset: usize) -> Option<Value> {
    let mut name = Map::new();
    // Family may itself be an FN composite; its own surname is first.
    if let Some(family) = value.subcomponent(1 + offset, 1) {
        name.insert("family".to_string(), json!(family));
    }
    let mut given = Vec::new();
    if let Some(first) = value.component(2 + offset) {
        given.push(json!(first));
    }
    if let Some(middle) = value.component(3 + offset) {
        given.push(json!(middle));
    }
    if !given.is_empty() {
        name.insert("given".to_string(), json!(given));
    }
    let mut suffixes = Vec::new();
    if let Some(suffix) = value.component(4 + offset) {
        suffixes.push(json!(suffix));
    }
    // Professional degree joins the suffix list.
    if let Some(degree) = value.component(6 + offset) {
        suffixes.push(json!(degree));
    }
    if !suffixes.is_empty() {
        name.insert("suffix".to_string(), json!(suffixes));
    }
    if let Some(prefix) = value.component(5 + offset) {
        name.insert("prefix".to_string(), json!([prefix]));
    }
    let use_component = if offset == 0 { 7 } else { 10 };
    if let Some(use_code) = value.component(use_component).and_then(name_use) {
        name.insert("use".to_string(), json!(use_code));
    }
    if name.is_empty() {
        None
    } else {
        Some(Value::Object(name))
    }
}

fn from_free_text(raw: &str) -> Option<Value> {
    let parsed = text::parse_person_name(raw);
    let mut name = Map::new();
    if let Some(family) = parsed.family {
        name.insert("family".to_string(), json!(family));
    }
    if !parsed.given.is_empty() {
        name.insert("given".to_string(), json!(parsed.given));
    }
    if let Some(prefix) = parsed.prefix {
        name.insert("prefix".to_string(), json!([prefix]));
    }
    if let Some(suffix) = parsed.suffix {
        name.insert("suffix".to_string(), json!([suffix]));
    }
    if name.is_empty() {
        None
    } else {
        name.insert("text".to_string(), json!(raw.trim()));
        Some(Value::Object(name))
    }
}

pub fn to_human_name(value: &SourceValue) -> Option<Value> {
    if value.is_scalar() {
        return from_free_text(&value.raw());
    }
    let offset = if value.type_name() == "XCN" { 1 } else { 0 };
    from_composite(value, offset)
}

/// Organization name text from an XON (component 1).
pub fn org_name_text(value: &SourceValue) -> Option<Value> {
    value.component(1).map(|name| json!(name))
}
