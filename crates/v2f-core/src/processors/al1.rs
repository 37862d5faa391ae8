#![deny(unsafe_code)]

//! AL1: allergy information. One AllergyIntolerance per segment.

use std::sync::LazyLock;

use serde_json::{Value, json};

use v2f_convert::TargetType;
use v2f_model::Segment;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, set_on};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

#[derive(Default)]
pub struct Al1Processor {
    allergy: String,
}

static HANDLERS: LazyLock<Vec<FieldHandler<Al1Processor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(2, "CWE", TargetType::Code, apply_category).table("0127"),
        FieldHandler::new(3, "CWE", TargetType::CodeableConcept, |p: &mut Al1Processor, v, ctx| {
            set_on(ctx, &p.allergy.clone(), "code", v);
        }),
        FieldHandler::new(4, "CWE", TargetType::Code, apply_severity).table("0128"),
        FieldHandler::new(5, "ST", TargetType::String, |p: &mut Al1Processor, v, ctx| {
            set_on(ctx, &p.allergy.clone(), "reaction[0].description", v);
        }),
        FieldHandler::new(6, "DTM", TargetType::DateTime, |p: &mut Al1Processor, v, ctx| {
            set_on(ctx, &p.allergy.clone(), "recordedDate", v);
        }),
    ])
});

fn apply_category(p: &mut Al1Processor, value: Value, ctx: &mut ParseContext) {
    let Some(code) = value.as_str() else { return };
    let category = match code.to_ascii_uppercase().as_str() {
        "DA" | "MA" | "MC" => "medication",
        "FA" => "food",
        "EA" | "PA" | "AA" => "environment",
        _ => return,
    };
    if let Some(resource) = ctx.resource_mut(&p.allergy.clone()) {
        resource.push("category", json!(category));
    }
}

fn apply_severity(p: &mut Al1Processor, value: Value, ctx: &mut ParseContext) {
    let Some(code) = value.as_str() else { return };
    let severity = match code.to_ascii_uppercase().as_str() {
        "SV" => "severe",
        "MO" => "moderate",
        "MI" => "mild",
        _ => return,
    };
    set_on(ctx, &p.allergy.clone(), "reaction[0].severity", json!(severity));
}

impl Al1Processor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }
}

impl SegmentProcessor for Al1Processor {
    fn name(&self) -> &'static str {
        "AL1"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        self.allergy = ctx.create_resource("AllergyIntolerance");
        let allergy = self.allergy.clone();
        if let Some(patient) = ctx.bundle().first_of_type("Patient") {
            let subject = patient.local_reference();
            set_on(ctx, &allergy, "patient.reference", json!(subject));
        }
        apply_handlers(self, &HANDLERS, segment, ctx);
        Ok(vec![allergy])
    }
}
