#![deny(unsafe_code)]

//! Type-specific identity-equivalence rules.

use serde_json::Value;

use v2f_model::{Bundle, Resource};

/// Professional suffix tokens ignored during person-name comparison.
const PROFESSIONAL_SUFFIXES: [&str; 8] = ["MD", "PHD", "DO", "RN", "DDS", "ESQ", "DVM", "NP"];

fn norm(text: &str) -> String {
    text.trim().to_uppercase()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(norm)
                .collect()
        })
        .unwrap_or_default()
}

/// (system, value) pairs of every identifier on the resource, sorted.
fn identifier_keys(resource: &Resource) -> Vec<(String, String)> {
    let mut keys: Vec<(String, String)> = resource
        .get("identifier")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .map(|id| {
                    (
                        id.get("system").and_then(Value::as_str).map(norm).unwrap_or_default(),
                        id.get("value").and_then(Value::as_str).map(norm).unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    keys.sort();
    keys
}

/// Person-name equivalence: family and given equal (case-folded), prefixes
/// ignored, professional suffixes dropped; a present suffix list is
/// compatible with an absent one but not with a different non-empty one.
fn person_names_equivalent(a: &Value, b: &Value) -> bool {
    let family = |n: &Value| n.get("family").and_then(Value::as_str).map(norm);
    if family(a) != family(b) {
        return false;
    }
    if string_list(a.get("given")) != string_list(b.get("given")) {
        return false;
    }
    let suffixes = |n: &Value| -> Vec<String> {
        string_list(n.get("suffix"))
            .into_iter()
            .filter(|s| !PROFESSIONAL_SUFFIXES.contains(&s.trim_matches('.').to_uppercase().as_str()))
            .collect()
    };
    let (sa, sb) = (suffixes(a), suffixes(b));
    sa.is_empty() || sb.is_empty() || sa == sb
}

fn any_name_pair_equivalent(a: &Resource, b: &Resource) -> bool {
    let names = |r: &Resource| {
        r.get("name")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };
    let (names_a, names_b) = (names(a), names(b));
    if names_a.is_empty() || names_b.is_empty() {
        return false;
    }
    names_a
        .iter()
        .any(|na| names_b.iter().any(|nb| person_names_equivalent(na, nb)))
}

/// People (Patient, RelatedPerson, Practitioner): equivalent names plus
/// equal identifier sets.
fn persons_equivalent(a: &Resource, b: &Resource) -> bool {
    any_name_pair_equivalent(a, b) && identifier_keys(a) == identifier_keys(b)
}

fn endpoint_refs(resource: &Resource) -> Vec<String> {
    let mut refs = Vec::new();
    if let Some(endpoints) = resource.get("endpoint").and_then(Value::as_array) {
        refs = endpoints
            .iter()
            .filter_map(|e| e.get("reference").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
    }
    refs.sort();
    refs
}

/// Organizations: equal name, equal identifier set, and the same
/// associated endpoints.
fn organizations_equivalent(a: &Resource, b: &Resource) -> bool {
    let name = |r: &Resource| r.get_str("name").map(norm);
    name(a).is_some()
        && name(a) == name(b)
        && identifier_keys(a) == identifier_keys(b)
        && endpoint_refs(a) == endpoint_refs(b)
}

fn part_of_parent<'a>(resource: &Resource, bundle: &'a Bundle) -> Option<&'a Resource> {
    let reference = resource.get_str("partOf.reference")?;
    let id = reference.strip_prefix("Location/")?;
    bundle.find("Location", id)
}

/// `partOf` chains longer than this never compare equal; also bounds
/// cyclic chains a caller may have constructed.
const MAX_PART_OF_DEPTH: usize = 32;

/// Locations: name, mode, and physical type equal, with `partOf` ancestry
/// compared recursively against the other location's ancestry. Two missing
/// parents are equal; present-vs-missing is not.
fn locations_equivalent(a: &Resource, b: &Resource, bundle: &Bundle) -> bool {
    locations_equivalent_at(a, b, bundle, 0)
}

fn locations_equivalent_at(a: &Resource, b: &Resource, bundle: &Bundle, depth: usize) -> bool {
    if depth >= MAX_PART_OF_DEPTH {
        return false;
    }
    let name = |r: &Resource| r.get_str("name").map(norm);
    let mode = |r: &Resource| r.get_str("mode").map(norm);
    let physical = |r: &Resource| r.get_str("physicalType.coding[0].code").map(norm);
    if name(a).is_none() && physical(a).is_none() {
        return false;
    }
    if name(a) != name(b) || mode(a) != mode(b) || physical(a) != physical(b) {
        return false;
    }
    match (part_of_parent(a, bundle), part_of_parent(b, bundle)) {
        (None, None) => true,
        (Some(parent_a), Some(parent_b)) => {
            parent_a.id == parent_b.id
                || locations_equivalent_at(parent_a, parent_b, bundle, depth + 1)
        }
        _ => false,
    }
}

/// Identity equivalence for two resources of the same type. Types without
/// a rule never merge.
pub fn equivalent(a: &Resource, b: &Resource, bundle: &Bundle) -> bool {
    match a.resource_type.as_str() {
        "Patient" | "RelatedPerson" | "Practitioner" => persons_equivalent(a, b),
        "Organization" => organizations_equivalent(a, b),
        "Location" => locations_equivalent(a, b, bundle),
        _ => false,
    }
}
