#![deny(unsafe_code)]

//! Per-conversion parse state.

use std::collections::HashMap;
use std::sync::Arc;

use v2f_model::{Bundle, IdGenerator, Resource};

/// Carries everything one conversion needs: the in-progress bundle, the
/// event classification read from the header, profile identifiers, the
/// provenance switch, and a free-form property scratchpad processors use
/// to leave hints for one another. Reset at the start of every top-level
/// conversion; never reused across unrelated conversions.
pub struct ParseContext {
    bundle: Bundle,
    ids: Arc<dyn IdGenerator>,
    message_type: Option<String>,
    event_code: Option<String>,
    profiles: Vec<String>,
    properties: HashMap<String, String>,
    provenance_enabled: bool,
    warn_on_missing_handler: bool,
}

impl ParseContext {
    pub fn new(ids: Arc<dyn IdGenerator>, provenance_enabled: bool) -> Self {
        let bundle_id = ids.next_id();
        Self {
            bundle: Bundle::new(bundle_id),
            ids,
            message_type: None,
            event_code: None,
            profiles: Vec::new(),
            properties: HashMap::new(),
            provenance_enabled,
            warn_on_missing_handler: false,
        }
    }

    pub fn with_warn_on_missing_handler(mut self, warn: bool) -> Self {
        self.warn_on_missing_handler = warn;
        self
    }

    pub fn bundle(&self) -> &Bundle {
        &self.bundle
    }

    pub fn bundle_mut(&mut self) -> &mut Bundle {
        &mut self.bundle
    }

    pub fn into_bundle(self) -> Bundle {
        self.bundle
    }

    pub fn provenance_enabled(&self) -> bool {
        self.provenance_enabled
    }

    pub fn warn_on_missing_handler(&self) -> bool {
        self.warn_on_missing_handler
    }

    /// Event classification, e.g. message type `ADT` and trigger `A01`.
    pub fn set_event(&mut self, message_type: Option<String>, event_code: Option<String>) {
        self.message_type = message_type;
        self.event_code = event_code;
    }

    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    pub fn event_code(&self) -> Option<&str> {
        self.event_code.as_deref()
    }

    /// Insertion-ordered, deduplicated profile identifiers.
    pub fn add_profile(&mut self, profile: impl Into<String>) {
        let profile = profile.into();
        if !profile.trim().is_empty() && !self.profiles.contains(&profile) {
            self.profiles.push(profile);
        }
    }

    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Leave a hint for a later processor.
    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Create a resource with a fresh id, append it to the bundle, and
    /// return its local reference.
    pub fn create_resource(&mut self, resource_type: &str) -> String {
        let id = self.ids.next_id();
        let resource = Resource::new(resource_type, id);
        let reference = resource.local_reference();
        self.bundle.push(resource);
        reference
    }

    /// Local reference of the first resource of `resource_type`, creating
    /// one when absent.
    pub fn find_or_create_first(&mut self, resource_type: &str) -> String {
        if let Some(resource) = self.bundle.first_of_type(resource_type) {
            return resource.local_reference();
        }
        self.create_resource(resource_type)
    }

    /// Find by a predicate over resources of one type, creating on miss.
    pub fn find_or_create_by(
        &mut self,
        resource_type: &str,
        matches: impl Fn(&Resource) -> bool,
    ) -> String {
        if let Some(resource) = self.bundle.resources_of_type(resource_type).find(|r| matches(r)) {
            return resource.local_reference();
        }
        self.create_resource(resource_type)
    }

    /// Mutable access to a resource by local reference (`Type/id`).
    pub fn resource_mut(&mut self, local_ref: &str) -> Option<&mut Resource> {
        let (resource_type, id) = local_ref.split_once('/')?;
        self.bundle.get_mut(resource_type, id)
    }
}
