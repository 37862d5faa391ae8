#![deny(unsafe_code)]

//! OBX: observation/result. One Observation per segment, with the value
//! shape chosen by the declared value type.

use std::sync::LazyLock;

use serde_json::{Value, json};

use v2f_convert::TargetType;
use v2f_convert::engine::convert;
use v2f_model::message::SourceValue;
use v2f_model::{Segment, is_deleted_value};

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, push_on, set_on, set_primitive};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

#[derive(Default)]
pub struct ObxProcessor {
    observation: String,
    value_type: Option<String>,
    units: Option<String>,
}

static HANDLERS: LazyLock<Vec<FieldHandler<ObxProcessor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(0, "ID", TargetType::Code, |p: &mut ObxProcessor, v, ctx| {
            set_on(ctx, &p.observation.clone(), "status", v);
        })
        .fixed("unknown"),
        // OBX-2 and OBX-6 are interpretation hints for OBX-5, so they
        // apply first.
        FieldHandler::new(2, "ID", TargetType::Code, |p: &mut ObxProcessor, v, _| {
            p.value_type = v.as_str().map(str::to_string);
        })
        .priority(2),
        FieldHandler::new(6, "CWE", TargetType::Code, |p: &mut ObxProcessor, v, _| {
            p.units = v.as_str().map(str::to_string);
        })
        .priority(1),
        FieldHandler::new(3, "CWE", TargetType::CodeableConcept, |p: &mut ObxProcessor, v, ctx| {
            set_on(ctx, &p.observation.clone(), "code", v);
        }),
        FieldHandler::new(5, "ST", TargetType::String, apply_value),
        FieldHandler::new(8, "CWE", TargetType::CodeableConcept, |p: &mut ObxProcessor, v, ctx| {
            push_on(ctx, &p.observation.clone(), "interpretation", v);
        })
        .table("0078"),
        FieldHandler::new(11, "ID", TargetType::Code, apply_status),
        FieldHandler::new(14, "DTM", TargetType::DateTime, |p: &mut ObxProcessor, v, ctx| {
            set_primitive(ctx, &p.observation.clone(), "effectiveDateTime", v);
        }),
    ])
});

/// Re-interpret the raw value under the declared OBX-2 type.
fn apply_value(p: &mut ObxProcessor, value: Value, ctx: &mut ParseContext) {
    let observation = p.observation.clone();
    if is_deleted_value(&value) {
        set_primitive(ctx, &observation, "valueString", value);
        return;
    }
    let Some(raw) = value.as_str() else { return };
    let type_name = p.value_type.as_deref().unwrap_or("ST");
    match type_name {
        "NM" => {
            let mut components = vec![vec![raw.to_string()]];
            if let Some(unit) = &p.units {
                components.push(vec![unit.clone()]);
            }
            let source = SourceValue::new("CQ", components);
            if let Some(quantity) = convert(TargetType::Quantity, &source, None) {
                set_on(ctx, &observation, "valueQuantity", quantity);
            }
        }
        "CWE" | "CE" | "CNE" => {
            let source = SourceValue::parse(type_name, raw);
            if let Some(concept) = convert(TargetType::CodeableConcept, &source, None) {
                set_on(ctx, &observation, "valueCodeableConcept", concept);
            }
        }
        "DT" | "TS" | "DTM" => {
            let source = SourceValue::parse("DTM", raw);
            if let Some(when) = convert(TargetType::DateTime, &source, None) {
                set_on(ctx, &observation, "valueDateTime", when);
            }
        }
        "TM" => {
            let source = SourceValue::parse("TM", raw);
            if let Some(time) = convert(TargetType::Time, &source, None) {
                set_on(ctx, &observation, "valueTime", time);
            }
        }
        _ => set_on(ctx, &observation, "valueString", json!(raw)),
    }
}

fn apply_status(p: &mut ObxProcessor, value: Value, ctx: &mut ParseContext) {
    let Some(code) = value.as_str() else { return };
    let status = match code.to_ascii_uppercase().as_str() {
        "F" => "final",
        "P" | "R" => "preliminary",
        "C" => "corrected",
        "A" => "amended",
        "X" => "cancelled",
        "D" | "W" => "entered-in-error",
        _ => return,
    };
    set_on(ctx, &p.observation.clone(), "status", json!(status));
}

impl ObxProcessor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }
}

impl SegmentProcessor for ObxProcessor {
    fn name(&self) -> &'static str {
        "OBX"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        self.observation = ctx.create_resource("Observation");
        let observation = self.observation.clone();
        if let Some(patient) = ctx.bundle().first_of_type("Patient") {
            let subject = patient.local_reference();
            set_on(ctx, &observation, "subject.reference", json!(subject));
        }
        apply_handlers(self, &HANDLERS, segment, ctx);
        Ok(vec![observation])
    }
}
