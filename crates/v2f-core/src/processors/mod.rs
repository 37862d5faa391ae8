#![deny(unsafe_code)]

//! Segment processors and their name-keyed registry.
//!
//! A processor owns the mapping of one segment kind into bundle resources.
//! The dispatcher resolves processors by segment name through an explicit
//! registry: built-ins plus whatever the caller registers, no classpath or
//! environment scanning.

use std::collections::HashMap;

use serde_json::{Value, json};

use v2f_model::Segment;
use v2f_model::is_deleted_value;
use v2f_model::message::Unit;

use crate::context::ParseContext;

pub mod al1;
pub mod dg1;
pub mod in1;
pub mod msh;
pub mod nk1;
pub mod obx;
pub mod pid;
pub mod pv1;

/// Converts one segment into resources.
///
/// `process` returns the local references of the resources this segment
/// contributed to. An empty list means the segment contributed nothing and
/// the dispatcher leaves its unit unprocessed. Errors abort this segment
/// only, never the conversion.
pub trait SegmentProcessor {
    fn name(&self) -> &'static str;

    fn process(&mut self, segment: &Segment, ctx: &mut ParseContext)
    -> anyhow::Result<Vec<String>>;

    /// Convert a whole group unit. A non-empty return claims the group:
    /// the dispatcher then marks every unit inside it as consumed and no
    /// child is dispatched on its own. The default claims nothing, so
    /// group children keep dispatching individually.
    fn process_group(
        &mut self,
        _unit: &Unit<'_>,
        _ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Produces a fresh processor instance per structure-unit.
pub type ProcessorFactory = fn() -> Box<dyn SegmentProcessor>;

/// Explicit name-to-factory mapping, uppercase keys.
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// Registry holding only the built-in processors.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("MSH", msh::MshProcessor::boxed);
        registry.register("PID", pid::PidProcessor::boxed);
        registry.register("NK1", nk1::Nk1Processor::boxed);
        registry.register("PV1", pv1::Pv1Processor::boxed);
        registry.register("OBX", obx::ObxProcessor::boxed);
        registry.register("AL1", al1::Al1Processor::boxed);
        registry.register("DG1", dg1::Dg1Processor::boxed);
        registry.register("IN1", in1::In1Processor::boxed);
        registry
    }

    /// Register or replace the factory for a segment name.
    pub fn register(&mut self, name: &str, factory: ProcessorFactory) {
        self.factories.insert(name.to_ascii_uppercase(), factory);
    }

    pub fn resolve(&self, name: &str) -> Option<ProcessorFactory> {
        self.factories.get(&name.to_ascii_uppercase()).copied()
    }
}

pub(crate) fn set_on(ctx: &mut ParseContext, local_ref: &str, path: &str, value: Value) {
    if let Some(resource) = ctx.resource_mut(local_ref) {
        resource.set(path, value);
    }
}

pub(crate) fn push_on(ctx: &mut ParseContext, local_ref: &str, path: &str, value: Value) {
    if let Some(resource) = ctx.resource_mut(local_ref) {
        resource.push(path, value);
    }
}

/// Set a primitive element, honoring the deletion marker: a deleted value
/// clears the element and lands on its underscore sibling instead.
pub(crate) fn set_primitive(ctx: &mut ParseContext, local_ref: &str, path: &str, value: Value) {
    let Some(resource) = ctx.resource_mut(local_ref) else {
        return;
    };
    if is_deleted_value(&value) {
        resource.remove(path);
        let marked = match path.rfind('.') {
            Some(dot) => format!("{}._{}", &path[..dot], &path[dot + 1..]),
            None => format!("_{path}"),
        };
        resource.set(&marked, value);
    } else {
        resource.set(path, value);
    }
}

/// Append a contact point, filling in a default `use` when the source did
/// not carry one.
pub(crate) fn push_telecom(
    ctx: &mut ParseContext,
    local_ref: &str,
    mut value: Value,
    default_use: &str,
) {
    if !is_deleted_value(&value) && value.get("use").is_none() {
        if let Some(obj) = value.as_object_mut() {
            obj.insert("use".to_string(), json!(default_use));
        }
    }
    push_on(ctx, local_ref, "telecom", value);
}
