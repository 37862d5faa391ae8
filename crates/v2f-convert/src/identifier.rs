#![deny(unsafe_code)]

//! Identifier assembly from CX composites.

use serde_json::{Map, Value, json};

use v2f_model::message::SourceValue;
use v2f_terminology::naming::normalize_system;

const V2_0203_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0203";

/// System URI for a CX-4 assigning authority: the universal id when one is
/// given (normalized), otherwise the namespace id as a local urn.
fn authority_system(value: &SourceValue) -> Option<String> {
    if let Some(universal) = value.subcomponent(4, 2) {
        if let Some(lookup) = normalize_system(universal) {
            return Some(lookup.system);
        }
        return Some(universal.to_string());
    }
    value
        .subcomponent(4, 1)
        .map(|namespace| format!("urn:id:{namespace}"))
}

pub fn to_identifier(value: &SourceValue) -> Option<Value> {
    let id_value = value.component(1)?;
    let mut identifier = Map::new();
    identifier.insert("value".to_string(), json!(id_value));
    if let Some(system) = authority_system(value) {
        identifier.insert("system".to_string(), json!(system));
    }
    if let Some(type_code) = value.component(5) {
        identifier.insert(
            "type".to_string(),
            json!({
                "coding": [{ "code": type_code, "system": V2_0203_SYSTEM }]
            }),
        );
    }
    Some(Value::Object(identifier))
}
