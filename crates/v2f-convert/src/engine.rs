#![deny(unsafe_code)]

//! Entry point of the datatype conversion engine.
//!
//! `convert` maps one legacy field value to one FHIR element value. It is
//! pure with respect to the bundle and never fails: invalid, empty, or
//! unrecognized input yields `None`. The explicit deletion sentinel (`""`)
//! yields an empty value tagged with the deletion extension instead, so
//! callers can tell "cleared" from "never sent".

use serde_json::{Value, json};

use v2f_model::extensions::deleted_value;
use v2f_model::message::SourceValue;
use v2f_terminology::tables::table;

use crate::{address, codes, datetime, identifier, name, numeric, quantity, telecom};

/// The FHIR element shape a field handler asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    String,
    Boolean,
    Integer,
    UnsignedInt,
    PositiveInt,
    Decimal,
    Date,
    DateTime,
    Instant,
    Time,
    Code,
    Coding,
    CodeableConcept,
    Identifier,
    HumanName,
    Address,
    ContactPoint,
    Quantity,
}

impl TargetType {
    pub fn from_name(name: &str) -> Option<Self> {
        let target = match name.trim() {
            "string" => Self::String,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "unsignedInt" => Self::UnsignedInt,
            "positiveInt" => Self::PositiveInt,
            "decimal" => Self::Decimal,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "instant" => Self::Instant,
            "time" => Self::Time,
            "code" => Self::Code,
            "Coding" => Self::Coding,
            "CodeableConcept" => Self::CodeableConcept,
            "Identifier" => Self::Identifier,
            "HumanName" => Self::HumanName,
            "Address" => Self::Address,
            "ContactPoint" => Self::ContactPoint,
            "Quantity" => Self::Quantity,
            _ => return None,
        };
        Some(target)
    }
}

/// Convert one legacy value to the requested target shape.
///
/// `table_name` selects the terminology table used to fill in missing
/// display text for coded targets; it is ignored elsewhere.
pub fn convert(target: TargetType, value: &SourceValue, table_name: Option<&str>) -> Option<Value> {
    if value.is_empty() {
        return None;
    }
    if value.is_deletion() {
        return Some(deleted_value());
    }
    let code_table = table_name.and_then(table);

    match target {
        TargetType::String => match value.type_name() {
            // Organization names start at component 1 of the composite.
            "XON" => name::org_name_text(value),
            _ => Some(json!(value.raw())),
        },
        TargetType::Boolean => convert_boolean(value),
        TargetType::Integer => numeric::to_integer(&value.raw()).map(|n| json!(n)),
        TargetType::UnsignedInt => numeric::to_unsigned_int(&value.raw()).map(|n| json!(n)),
        TargetType::PositiveInt => numeric::to_positive_int(&value.raw()).map(|n| json!(n)),
        TargetType::Decimal => numeric::to_decimal(&value.raw()).map(Value::Number),
        TargetType::Date => datetime::to_fhir_date(value),
        TargetType::DateTime => datetime::to_fhir_datetime(value),
        TargetType::Instant => datetime::to_fhir_instant(value),
        TargetType::Time => datetime::to_fhir_time(value),
        TargetType::Code => codes::to_code(value),
        TargetType::Coding => codes::to_coding(value, code_table),
        TargetType::CodeableConcept => codes::to_codeable_concept(value, code_table),
        TargetType::Identifier => identifier::to_identifier(value),
        TargetType::HumanName => name::to_human_name(value),
        TargetType::Address => address::to_address(value),
        TargetType::ContactPoint => telecom::to_contact_point(value),
        TargetType::Quantity => quantity::to_quantity(value),
    }
}

fn convert_boolean(value: &SourceValue) -> Option<Value> {
    match value.raw().trim().to_uppercase().as_str() {
        "Y" | "YES" | "TRUE" | "T" | "1" => Some(json!(true)),
        "N" | "NO" | "FALSE" | "F" | "0" => Some(json!(false)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use v2f_model::extensions::is_deleted_value;

    #[test]
    fn empty_input_is_absent() {
        let value = SourceValue::scalar("ST", "   ");
        assert_eq!(convert(TargetType::String, &value, None), None);
    }

    #[test]
    fn deletion_sentinel_is_marked_not_absent() {
        for target in [
            TargetType::String,
            TargetType::CodeableConcept,
            TargetType::DateTime,
            TargetType::Quantity,
        ] {
            let value = SourceValue::scalar("ST", "\"\"");
            let converted = convert(target, &value, None).expect("deletion is not absence");
            assert!(is_deleted_value(&converted), "target {target:?}");
        }
    }

    #[test]
    fn booleans_accept_common_tokens() {
        let yes = SourceValue::scalar("ID", "Y");
        let no = SourceValue::scalar("ID", "no");
        let bad = SourceValue::scalar("ID", "maybe");
        assert_eq!(convert(TargetType::Boolean, &yes, None), Some(json!(true)));
        assert_eq!(convert(TargetType::Boolean, &no, None), Some(json!(false)));
        assert_eq!(convert(TargetType::Boolean, &bad, None), None);
    }

    #[test]
    fn type_names_resolve() {
        assert_eq!(
            TargetType::from_name("CodeableConcept"),
            Some(TargetType::CodeableConcept)
        );
        assert_eq!(TargetType::from_name("dateTime"), Some(TargetType::DateTime));
        assert_eq!(TargetType::from_name("NotAType"), None);
    }
}
