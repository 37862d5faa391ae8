#![deny(unsafe_code)]

//! Quantity assembly: value/unit splitting and unit normalization.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde_json::{Map, Value, json};

use v2f_model::message::SourceValue;

use crate::numeric;

const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// Common reported unit spellings mapped to UCUM codes. Unrecognized unit
/// text is kept verbatim with no code/system pair.
static UCUM_UNITS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("KG", "kg"),
        ("G", "g"),
        ("GM", "g"),
        ("MG", "mg"),
        ("UG", "ug"),
        ("MCG", "ug"),
        ("L", "L"),
        ("DL", "dL"),
        ("ML", "mL"),
        ("MMHG", "mm[Hg]"),
        ("MM HG", "mm[Hg]"),
        ("CM", "cm"),
        ("M", "m"),
        ("IN", "[in_i]"),
        ("FT", "[ft_i]"),
        ("LB", "[lb_av]"),
        ("LBS", "[lb_av]"),
        ("OZ", "[oz_av]"),
        ("S", "s"),
        ("SEC", "s"),
        ("MIN", "min"),
        ("H", "h"),
        ("HR", "h"),
        ("D", "d"),
        ("WK", "wk"),
        ("MO", "mo"),
        ("YR", "a"),
        ("%", "%"),
        ("PERCENT", "%"),
        ("/MIN", "/min"),
        ("BPM", "/min"),
        ("CEL", "Cel"),
        ("DEGC", "Cel"),
        ("DEGF", "[degF]"),
        ("MEQ/L", "meq/L"),
        ("MMOL/L", "mmol/L"),
        ("MG/DL", "mg/dL"),
        ("G/DL", "g/dL"),
        ("IU/L", "[iU]/L"),
        ("U/L", "U/L"),
    ])
});

fn build(value_text: &str, unit_text: Option<&str>) -> Option<Value> {
    let number = numeric::to_decimal(value_text)?;
    let mut quantity = Map::new();
    quantity.insert("value".to_string(), Value::Number(number));
    if let Some(unit) = unit_text.map(str::trim).filter(|u| !u.is_empty()) {
        quantity.insert("unit".to_string(), json!(unit));
        if let Some(code) = UCUM_UNITS.get(unit.to_uppercase().as_str()) {
            quantity.insert("code".to_string(), json!(code));
            quantity.insert("system".to_string(), json!(UCUM_SYSTEM));
        }
    }
    Some(Value::Object(quantity))
}

pub fn to_quantity(value: &SourceValue) -> Option<Value> {
    if value.is_scalar() {
        let raw = value.raw();
        let mut parts = raw.trim().splitn(2, char::is_whitespace);
        let value_text = parts.next()?;
        return build(value_text, parts.next());
    }
    build(value.component(1)?, value.component(2))
}
