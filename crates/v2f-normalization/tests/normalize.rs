//! Whole-bundle normalization scenarios.

use serde_json::json;

use v2f_model::{Bundle, Resource};
use v2f_normalization::normalize;

fn organization(id: &str, name: &str) -> Resource {
    let mut resource = Resource::new("Organization", id);
    resource.set("name", json!(name));
    resource.push("identifier", json!({"system": "urn:id:Payors", "value": "ACME01"}));
    resource
}

#[test]
fn duplicate_payors_collapse_and_references_follow() {
    let mut bundle = Bundle::new("b1");
    bundle.push(organization("o1", "Acme Health"));
    bundle.push(organization("o2", "ACME HEALTH"));
    let mut coverage = Resource::new("Coverage", "c1");
    coverage.push("payor", json!({"reference": "Organization/o2"}));
    bundle.push(coverage);

    normalize(&mut bundle);

    assert_eq!(bundle.resources_of_type("Organization").count(), 1);
    assert_eq!(
        bundle.first_of_type("Organization").unwrap().id,
        "o1",
        "first occurrence survives"
    );
    assert_eq!(
        bundle
            .first_of_type("Coverage")
            .unwrap()
            .get_str("payor[0].reference"),
        Some("Organization/o1")
    );
}

#[test]
fn loser_only_fields_are_reconciled_onto_the_keeper() {
    let mut bundle = Bundle::new("b1");
    bundle.push(organization("o1", "Acme Health"));
    let mut other = organization("o2", "Acme Health");
    other.set("active", json!(true));
    bundle.push(other);

    normalize(&mut bundle);

    let keeper = bundle.first_of_type("Organization").unwrap();
    assert_eq!(keeper.get("active"), Some(&json!(true)));
}

#[test]
fn normalization_is_idempotent() {
    let mut bundle = Bundle::new("b1");
    bundle.push(organization("o1", "Acme Health"));
    bundle.push(organization("o2", "Acme Health"));
    let mut patient = Resource::new("Patient", "p1");
    patient.set("name[0].family", json!("Doe"));
    bundle.push(patient);

    normalize(&mut bundle);
    let once = bundle.to_json();
    normalize(&mut bundle);
    assert_eq!(once, bundle.to_json());
}

#[test]
fn distinct_organizations_survive() {
    let mut bundle = Bundle::new("b1");
    bundle.push(organization("o1", "Acme Health"));
    let mut other = organization("o2", "Umbrella Health");
    other.set("identifier[0].value", json!("UMB02"));
    bundle.push(other);
    normalize(&mut bundle);
    assert_eq!(bundle.resources_of_type("Organization").count(), 2);
}
