#![deny(unsafe_code)]

//! JSON-backed FHIR resource wrapper.
//!
//! Resources are stored as raw JSON content behind a typed shell, with
//! mutation by structural path. The target resource object model proper
//! (profiles, validation, serializers) is an external collaborator.

use serde_json::{Map, Value, json};

/// One synthesized clinical resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub resource_type: String,
    pub id: String,
    content: Value,
}

/// One step of a structural path: an object key, optionally indexed.
#[derive(Debug, Clone, PartialEq)]
struct PathStep {
    key: String,
    index: Option<usize>,
}

fn parse_path(path: &str) -> Vec<PathStep> {
    path.split('.')
        .filter(|p| !p.is_empty())
        .map(|part| match part.find('[') {
            Some(open) if part.ends_with(']') => {
                let index = part[open + 1..part.len() - 1].parse().ok();
                PathStep {
                    key: part[..open].to_string(),
                    index,
                }
            }
            _ => PathStep {
                key: part.to_string(),
                index: None,
            },
        })
        .collect()
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            content: Value::Object(Map::new()),
        }
    }

    /// Set the value at `path`, creating intermediate objects and arrays.
    ///
    /// Paths are dot-separated keys with optional indexes, e.g.
    /// `name[0].family` or `code.coding[1].display`.
    pub fn set(&mut self, path: &str, value: Value) {
        let steps = parse_path(path);
        if steps.is_empty() {
            return;
        }
        let slot = ensure_slot(&mut self.content, &steps);
        *slot = value;
    }

    /// Append `value` to the array at `path`, creating it if missing.
    pub fn push(&mut self, path: &str, value: Value) {
        let steps = parse_path(path);
        if steps.is_empty() {
            return;
        }
        let slot = ensure_slot(&mut self.content, &steps);
        match slot {
            Value::Array(items) => items.push(value),
            Value::Null => *slot = Value::Array(vec![value]),
            other => {
                // Promote a scalar slot to an array rather than losing data.
                let existing = other.take();
                *other = Value::Array(vec![existing, value]);
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.content;
        for step in parse_path(path) {
            current = current.as_object()?.get(&step.key)?;
            if let Some(index) = step.index {
                current = current.as_array()?.get(index)?;
            }
        }
        Some(current)
    }

    /// String value at `path`, when present and a string.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Attach a top-level extension `{url, <value_field>: value}`.
    pub fn add_extension(&mut self, url: &str, value_field: &str, value: Value) {
        self.push("extension", json!({ "url": url, value_field: value }));
    }

    /// Remove the value at `path` (final step must be an object key).
    pub fn remove(&mut self, path: &str) {
        let steps = parse_path(path);
        let Some((last, parents)) = steps.split_last() else {
            return;
        };
        let mut current = &mut self.content;
        for step in parents {
            let Some(next) = current.as_object_mut().and_then(|m| m.get_mut(&step.key)) else {
                return;
            };
            current = next;
            if let Some(index) = step.index {
                let Some(item) = current.as_array_mut().and_then(|a| a.get_mut(index)) else {
                    return;
                };
                current = item;
            }
        }
        if let Some(map) = current.as_object_mut() {
            map.remove(&last.key);
        }
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    /// A local reference to this resource, `Type/id`.
    pub fn local_reference(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }

    /// Visit every `reference` string anywhere in the content.
    pub fn for_each_reference_mut(&mut self, f: &mut dyn FnMut(&mut String)) {
        walk_references(&mut self.content, f);
    }

    /// Full JSON form with `resourceType` and `id` leading, content after.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        out.insert("resourceType".to_string(), json!(self.resource_type));
        out.insert("id".to_string(), json!(self.id));
        if let Some(fields) = self.content.as_object() {
            for (key, value) in fields {
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

fn ensure_slot<'a>(root: &'a mut Value, steps: &[PathStep]) -> &'a mut Value {
    let mut current = root;
    for step in steps {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            unreachable!()
        };
        current = map.entry(step.key.clone()).or_insert(Value::Null);
        if let Some(index) = step.index {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(items) = current else {
                unreachable!()
            };
            while items.len() <= index {
                items.push(Value::Null);
            }
            current = &mut items[index];
        }
    }
    current
}

fn walk_references(value: &mut Value, f: &mut dyn FnMut(&mut String)) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == "reference" {
                    if let Value::String(target) = child {
                        f(target);
                        continue;
                    }
                }
                walk_references(child, f);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk_references(child, f);
            }
        }
        _ => {}
    }
}
