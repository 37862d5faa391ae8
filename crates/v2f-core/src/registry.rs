#![deny(unsafe_code)]

//! Field-mapping descriptors and the shared application driver.
//!
//! Each processor type declares its handlers in a static table built once
//! per process. Application order is ascending field then component, with
//! a non-zero priority short-circuiting ahead of same-or-lower priorities
//! regardless of field index, so a "how to interpret the code" hint can
//! land before the code itself. Fields without a descriptor are ignored.

use serde_json::json;
use tracing::{trace, warn};

use v2f_convert::TargetType;
use v2f_convert::engine::convert;
use v2f_model::message::{Segment, SourceValue};

use crate::context::ParseContext;

/// One declarative field mapping bound to a callback.
pub struct FieldHandler<P> {
    /// 1-based source field index; 0 for class-level fixed-value entries.
    pub field: usize,
    /// Optional 1-based component within the field.
    pub component: Option<usize>,
    /// Declared structural type of the source value (`CWE`, `XPN`, ...).
    pub source_type: &'static str,
    pub target: TargetType,
    /// Terminology table consulted for coded targets.
    pub table: Option<&'static str>,
    /// Fixed value applied unconditionally instead of reading the field.
    pub fixed: Option<&'static str>,
    /// Non-zero priorities apply first, highest first.
    pub priority: i32,
    pub apply: fn(&mut P, serde_json::Value, &mut ParseContext),
}

impl<P> FieldHandler<P> {
    pub fn new(
        field: usize,
        source_type: &'static str,
        target: TargetType,
        apply: fn(&mut P, serde_json::Value, &mut ParseContext),
    ) -> Self {
        Self {
            field,
            component: None,
            source_type,
            target,
            table: None,
            fixed: None,
            priority: 0,
            apply,
        }
    }

    pub fn component(mut self, component: usize) -> Self {
        self.component = Some(component);
        self
    }

    pub fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    pub fn fixed(mut self, fixed: &'static str) -> Self {
        self.fixed = Some(fixed);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Sort a declared table into invocation order. Called once per processor
/// type from its `LazyLock` initializer; the sort is stable, so equal keys
/// keep declaration order.
pub fn build_handler_table<P>(mut handlers: Vec<FieldHandler<P>>) -> Vec<FieldHandler<P>> {
    handlers.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.field.cmp(&b.field))
            .then(a.component.unwrap_or(0).cmp(&b.component.unwrap_or(0)))
    });
    handlers
}

/// Run every handler against one segment: extract, convert, skip empty,
/// invoke. Repeating fields invoke the callback once per repetition. A
/// failed conversion is logged and skipped, never fatal.
pub fn apply_handlers<P>(
    processor: &mut P,
    handlers: &[FieldHandler<P>],
    segment: &Segment,
    ctx: &mut ParseContext,
) {
    if ctx.warn_on_missing_handler() {
        for field in 1..=segment.field_count() {
            if segment.field_raw(field).is_some() && !handlers.iter().any(|h| h.field == field) {
                warn!(
                    segment = %segment.name,
                    field,
                    "populated field has no handler; data will be dropped"
                );
            }
        }
    }
    for handler in handlers {
        if let Some(fixed) = handler.fixed {
            (handler.apply)(processor, json!(fixed), ctx);
            continue;
        }
        for repeat in segment.field_repeats(handler.field).to_vec() {
            let source = match handler.component {
                Some(component) => match repeat.get(component - 1) {
                    // A pulled-out component exposes its sub-components
                    // as components of the contained type.
                    Some(sub) => SourceValue::new(
                        handler.source_type,
                        sub.iter().map(|s| vec![s.clone()]).collect(),
                    ),
                    None => continue,
                },
                None => SourceValue::new(handler.source_type, repeat.clone()),
            };
            if source.is_empty() {
                continue;
            }
            match convert(handler.target, &source, handler.table) {
                Some(value) => (handler.apply)(processor, value, ctx),
                None => trace!(
                    segment = %segment.name,
                    field = handler.field,
                    "value did not convert; skipping"
                ),
            }
        }
    }
}
