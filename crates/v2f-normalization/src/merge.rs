#![deny(unsafe_code)]

//! The bundle post-pass: merge equivalent resources, rewrite references,
//! drop the redundant duplicates in one sweep.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use v2f_model::Bundle;

use crate::rules::equivalent;

/// Referenced-before-referencing order: parents and targets first so a
/// merged location/organization is already settled when its referrers are
/// compared. Types not listed are never merged (Provenance included).
const MERGE_ORDER: [&str; 5] = [
    "Location",
    "Organization",
    "Patient",
    "RelatedPerson",
    "Practitioner",
];

/// Normalize the bundle in place. Running it again on the result is a
/// no-op.
pub fn normalize(bundle: &mut Bundle) {
    let mut replaced: HashMap<String, String> = HashMap::new();
    let mut removed_ids: Vec<String> = Vec::new();

    for resource_type in MERGE_ORDER {
        let ids: Vec<String> = bundle
            .resources_of_type(resource_type)
            .map(|r| r.id.clone())
            .collect();
        for (earlier_pos, keep_id) in ids.iter().enumerate() {
            if removed_ids.contains(keep_id) {
                continue;
            }
            for lose_id in &ids[earlier_pos + 1..] {
                if removed_ids.contains(lose_id) {
                    continue;
                }
                let merge = {
                    let keep = bundle.find(resource_type, keep_id);
                    let lose = bundle.find(resource_type, lose_id);
                    match (keep, lose) {
                        (Some(keep), Some(lose)) => equivalent(keep, lose, bundle),
                        _ => false,
                    }
                };
                if !merge {
                    continue;
                }
                debug!(resource_type, keep = %keep_id, lose = %lose_id, "merging duplicate");
                reconcile(bundle, resource_type, keep_id, lose_id);
                replaced.insert(
                    format!("{resource_type}/{lose_id}"),
                    format!("{resource_type}/{keep_id}"),
                );
                removed_ids.push(lose_id.clone());
            }
        }
    }

    if removed_ids.is_empty() {
        return;
    }
    rewrite_references(bundle, &replaced);
    bundle.remove_ids(&removed_ids);
}

/// Copy top-level fields only the losing resource had onto the kept one.
fn reconcile(bundle: &mut Bundle, resource_type: &str, keep_id: &str, lose_id: &str) {
    let lose_content = match bundle.find(resource_type, lose_id) {
        Some(resource) => resource.content().clone(),
        None => return,
    };
    let Some(keep) = bundle.get_mut(resource_type, keep_id) else {
        return;
    };
    if let (Value::Object(lose_fields), Value::Object(keep_fields)) =
        (&lose_content, keep.content_mut())
    {
        for (field, value) in lose_fields {
            keep_fields
                .entry(field.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

fn rewrite_references(bundle: &mut Bundle, replaced: &HashMap<String, String>) {
    for resource in bundle.entries_mut() {
        resource.for_each_reference_mut(&mut |reference| {
            // Follow chains: c -> b -> a collapses to a.
            let mut target = reference.clone();
            while let Some(next) = replaced.get(&target) {
                target = next.clone();
            }
            *reference = target;
        });
    }
}
