#![deny(unsafe_code)]

//! The ordered container of resources produced by one conversion.

use serde_json::{Value, json};

use crate::resource::Resource;

/// Ordered collection of resources; entry order is creation order until
/// the dispatcher's final provenance reordering.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    pub id: String,
    entries: Vec<Resource>,
}

impl Bundle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, resource: Resource) {
        self.entries.push(resource);
    }

    pub fn entries(&self) -> &[Resource] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<Resource> {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first_of_type(&self, resource_type: &str) -> Option<&Resource> {
        self.entries
            .iter()
            .find(|r| r.resource_type == resource_type)
    }

    pub fn last_of_type(&self, resource_type: &str) -> Option<&Resource> {
        self.entries
            .iter()
            .rev()
            .find(|r| r.resource_type == resource_type)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> {
        self.entries
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    pub fn find(&self, resource_type: &str, id: &str) -> Option<&Resource> {
        self.entries
            .iter()
            .find(|r| r.resource_type == resource_type && r.id == id)
    }

    pub fn get_mut(&mut self, resource_type: &str, id: &str) -> Option<&mut Resource> {
        self.entries
            .iter_mut()
            .find(|r| r.resource_type == resource_type && r.id == id)
    }

    /// Remove every entry whose id is in `ids`, in one pass.
    pub fn remove_ids(&mut self, ids: &[String]) {
        self.entries.retain(|r| !ids.contains(&r.id));
    }

    /// Move all resources of `resource_type` to the end, preserving
    /// relative order on both sides.
    pub fn move_type_to_end(&mut self, resource_type: &str) {
        let (moved, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|r| r.resource_type == resource_type);
        self.entries = kept;
        self.entries.extend(moved);
    }

    /// FHIR Bundle JSON: `collection` type, one entry per resource.
    pub fn to_json(&self) -> Value {
        let entries: Vec<Value> = self
            .entries
            .iter()
            .map(|r| json!({ "resource": r.to_json() }))
            .collect();
        json!({
            "resourceType": "Bundle",
            "id": self.id,
            "type": "collection",
            "entry": entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with(types: &[(&str, &str)]) -> Bundle {
        let mut bundle = Bundle::new("b1");
        for (ty, id) in types {
            bundle.push(Resource::new(*ty, *id));
        }
        bundle
    }

    #[test]
    fn first_and_last_of_type() {
        let bundle = bundle_with(&[("Patient", "p1"), ("Observation", "o1"), ("Patient", "p2")]);
        assert_eq!(bundle.first_of_type("Patient").unwrap().id, "p1");
        assert_eq!(bundle.last_of_type("Patient").unwrap().id, "p2");
        assert!(bundle.first_of_type("Encounter").is_none());
    }

    #[test]
    fn move_type_to_end_preserves_relative_order() {
        let mut bundle = bundle_with(&[
            ("Provenance", "v1"),
            ("Patient", "p1"),
            ("Provenance", "v2"),
            ("Observation", "o1"),
        ]);
        bundle.move_type_to_end("Provenance");
        let order: Vec<_> = bundle.entries().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(order, vec!["p1", "o1", "v1", "v2"]);
    }

    #[test]
    fn remove_ids_drops_only_named_entries() {
        let mut bundle = bundle_with(&[("Patient", "p1"), ("Patient", "p2")]);
        bundle.remove_ids(&["p2".to_string()]);
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.entries()[0].id, "p1");
    }

    #[test]
    fn bundle_json_shape() {
        let bundle = bundle_with(&[("Patient", "p1")]);
        let value = bundle.to_json();
        assert_eq!(value["resourceType"], json!("Bundle"));
        assert_eq!(value["entry"][0]["resource"]["id"], json!("p1"));
    }
}
