#![deny(unsafe_code)]

//! ContactPoint assembly from XTN composites and free text.

use serde_json::{Map, Value, json};

use v2f_model::message::SourceValue;

use crate::text::{self, TelecomKind};

fn use_for(code: &str) -> Option<&'static str> {
    match code.trim().to_uppercase().as_str() {
        "PRN" | "VHN" => Some("home"),
        "WPN" => Some("work"),
        "ORN" => Some("temp"),
        "EMR" => Some("mobile"),
        _ => None,
    }
}

fn system_for(equipment: &str) -> Option<&'static str> {
    match equipment.trim().to_uppercase().as_str() {
        "PH" | "CP" | "SAT" => Some("phone"),
        "FX" => Some("fax"),
        "BP" => Some("pager"),
        "INTERNET" | "X.400" => Some("email"),
        "MD" | "TDD" | "TTY" => Some("other"),
        _ => None,
    }
}

fn from_composite(value: &SourceValue) -> Option<Value> {
    let mut point = Map::new();

    let email = value.component(4);
    let dial = value.component(1);
    // Build a number from the broken-out area code and local number when
    // the deprecated whole-number component is absent.
    let area = value.component(6);
    let local = value.component(7);
    let assembled = match (area, local) {
        (Some(area), Some(local)) => Some(format!("({area}) {local}")),
        (None, Some(local)) => Some(local.to_string()),
        _ => None,
    };

    let (system, number) = if let Some(email) = email {
        ("email", Some(email.to_string()))
    } else {
        let system = value
            .component(3)
            .and_then(system_for)
            .unwrap_or("phone");
        (system, dial.map(str::to_string).or(assembled))
    };
    point.insert("system".to_string(), json!(system));
    let mut number = number?;
    if let Some(extension) = value.component(8) {
        number.push_str(&format!(" ext. {extension}"));
    }
    point.insert("value".to_string(), json!(number));

    if let Some(use_code) = value.component(2).and_then(use_for) {
        point.insert("use".to_string(), json!(use_code));
    }
    if value.component(3).map(str::trim).map(str::to_uppercase) == Some("CP".to_string()) {
        point.insert("use".to_string(), json!("mobile"));
    }
    Some(Value::Object(point))
}

fn from_free_text(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    let system = match text::classify_telecom(trimmed)? {
        TelecomKind::Phone => "phone",
        TelecomKind::Email => "email",
        TelecomKind::Url => "url",
    };
    Some(json!({ "system": system, "value": trimmed }))
}

pub fn to_contact_point(value: &SourceValue) -> Option<Value> {
    if value.is_scalar() {
        from_free_text(&value.raw())
    } else {
        from_composite(value)
    }
}
