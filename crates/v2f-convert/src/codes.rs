#![deny(unsafe_code)]

//! Coded-value assembly: CodeableConcept, Coding, and bare codes.
//!
//! The same target shape is assembled differently depending on the source
//! shape: a simple code, a CWE/CE triple (with alternate triple), an
//! identifier-shaped CX, or an HD naming descriptor. Blank sub-components
//! are omitted, never fatal.

use serde_json::{Map, Value, json};

use v2f_model::message::SourceValue;
use v2f_terminology::naming::normalize_system;
use v2f_terminology::tables::CodeTable;

/// Extension carrying the pre-normalization system identifier, so the
/// original text can be recovered later.
pub const ORIGINAL_SYSTEM_EXTENSION_URL: &str = "urn:hl7v2:original-system";

/// Build one coding from optional (code, display, system) parts.
///
/// A known table fills a missing display; the naming registry normalizes
/// the system, recording the original on the side when it changed.
fn build_coding(
    code: Option<&str>,
    display: Option<&str>,
    system: Option<&str>,
    table: Option<&CodeTable>,
) -> Option<Value> {
    let code = code.map(str::trim).filter(|c| !c.is_empty())?;
    let mut coding = Map::new();
    coding.insert("code".to_string(), json!(code));

    let display = display
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .or_else(|| {
            table
                .and_then(|t| t.display_for(code))
                .map(str::to_string)
        });
    if let Some(display) = display {
        coding.insert("display".to_string(), json!(display));
    }

    match system.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => match normalize_system(raw) {
            Some(lookup) => {
                coding.insert("system".to_string(), json!(lookup.system));
                if lookup.system != lookup.original {
                    coding.insert(
                        "extension".to_string(),
                        json!([{
                            "url": ORIGINAL_SYSTEM_EXTENSION_URL,
                            "valueString": lookup.original,
                        }]),
                    );
                }
            }
            None => {
                coding.insert("system".to_string(), json!(raw));
            }
        },
        None => {
            if let Some(table) = table {
                if table.contains(code) {
                    coding.insert("system".to_string(), json!(table.system));
                }
            }
        }
    }
    Some(Value::Object(coding))
}

fn codings_for(value: &SourceValue, table: Option<&CodeTable>) -> Vec<Value> {
    let mut codings = Vec::new();
    match value.type_name() {
        "CWE" | "CE" | "CNE" => {
            if let Some(coding) = build_coding(
                value.component(1),
                value.component(2),
                value.component(3),
                table,
            ) {
                codings.push(coding);
            }
            // Alternate triple; no table lookup, the table describes the
            // primary coding system.
            if let Some(coding) = build_coding(
                value.component(4),
                value.component(5),
                value.component(6),
                None,
            ) {
                codings.push(coding);
            }
        }
        "CX" => {
            if let Some(coding) = build_coding(
                value.component(1),
                None,
                value.subcomponent(4, 2).or_else(|| value.component(4)),
                table,
            ) {
                codings.push(coding);
            }
        }
        "HD" => {
            let code = value.component(1).or_else(|| value.component(2));
            if let Some(coding) = build_coding(code, None, value.component(2), table) {
                codings.push(coding);
            }
        }
        _ => {
            if let Some(coding) = build_coding(Some(&value.raw()), None, None, table) {
                codings.push(coding);
            }
        }
    }
    codings
}

pub fn to_codeable_concept(value: &SourceValue, table: Option<&CodeTable>) -> Option<Value> {
    let codings = codings_for(value, table);
    let text = match value.type_name() {
        // CWE-9 carries the original text.
        "CWE" => value.component(9).map(str::to_string),
        _ => None,
    };
    if codings.is_empty() && text.is_none() {
        return None;
    }
    let mut concept = Map::new();
    if !codings.is_empty() {
        concept.insert("coding".to_string(), json!(codings));
    }
    if let Some(text) = text {
        concept.insert("text".to_string(), json!(text));
    }
    Some(Value::Object(concept))
}

pub fn to_coding(value: &SourceValue, table: Option<&CodeTable>) -> Option<Value> {
    codings_for(value, table).into_iter().next()
}

/// Bare code: first component only; unknown codes pass through.
pub fn to_code(value: &SourceValue) -> Option<Value> {
    value.component(1).map(|code| json!(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use v2f_terminology::tables::table;

    fn cwe(parts: &[&str]) -> SourceValue {
        SourceValue::new(
            "CWE",
            parts.iter().map(|p| vec![p.to_string()]).collect(),
        )
    }

    #[test]
    fn triple_with_alternate_builds_two_codings() {
        let value = cwe(&["8480-6", "Systolic BP", "LN", "271649006", "Systolic", "SCT"]);
        let concept = to_codeable_concept(&value, None).unwrap();
        let codings = concept["coding"].as_array().unwrap();
        assert_eq!(codings.len(), 2);
        assert_eq!(codings[0]["system"], json!("http://loinc.org"));
        assert_eq!(
            codings[0]["extension"][0]["valueString"],
            json!("LN"),
            "original system text is kept on the side"
        );
        assert_eq!(codings[1]["system"], json!("http://snomed.info/sct"));
    }

    #[test]
    fn simple_code_fills_display_and_system_from_table() {
        let value = SourceValue::scalar("IS", "F");
        let concept = to_codeable_concept(&value, table("0001")).unwrap();
        let coding = &concept["coding"][0];
        assert_eq!(coding["code"], json!("F"));
        assert_eq!(coding["display"], json!("Female"));
        assert_eq!(
            coding["system"],
            json!("http://terminology.hl7.org/CodeSystem/v2-0001")
        );
    }

    #[test]
    fn blank_subcomponents_are_omitted() {
        let value = cwe(&["A01", "", ""]);
        let concept = to_codeable_concept(&value, None).unwrap();
        let coding = &concept["coding"][0];
        assert_eq!(coding["code"], json!("A01"));
        assert!(coding.get("display").is_none());
        assert!(coding.get("system").is_none());
    }

    #[test]
    fn code_without_table_hit_gets_no_invented_display() {
        let value = SourceValue::scalar("IS", "ZZ");
        let concept = to_codeable_concept(&value, table("0001")).unwrap();
        assert!(concept["coding"][0].get("display").is_none());
    }

    #[test]
    fn unknown_system_text_is_kept_verbatim() {
        let value = cwe(&["X1", "Local thing", "MYLOCAL"]);
        let concept = to_codeable_concept(&value, None).unwrap();
        assert_eq!(concept["coding"][0]["system"], json!("MYLOCAL"));
    }

    #[test]
    fn cwe_original_text_lands_in_text() {
        let value = cwe(&["A", "", "", "", "", "", "", "", "as written"]);
        let concept = to_codeable_concept(&value, None).unwrap();
        assert_eq!(concept["text"], json!("as written"));
    }

    #[test]
    fn hd_descriptor_becomes_coding() {
        let value = SourceValue::new(
            "HD",
            vec![
                vec!["Hosp".to_string()],
                vec!["2.16.840.1.113883.6.1".to_string()],
                vec!["ISO".to_string()],
            ],
        );
        let coding = to_coding(&value, None).unwrap();
        assert_eq!(coding["code"], json!("Hosp"));
        assert_eq!(coding["system"], json!("http://loinc.org"));
    }

    #[test]
    fn empty_value_yields_none() {
        assert!(to_codeable_concept(&cwe(&["", ""]), None).is_none());
    }
}
