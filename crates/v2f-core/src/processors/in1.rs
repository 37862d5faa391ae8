#![deny(unsafe_code)]

//! IN1: insurance. One Coverage per segment, plus the payor Organization
//! named by the plan's company identifier and name.

use std::sync::LazyLock;

use serde_json::json;

use v2f_convert::TargetType;
use v2f_convert::engine::convert;
use v2f_model::Segment;
use v2f_model::message::SourceValue;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, push_on, set_on, set_primitive};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

#[derive(Default)]
pub struct In1Processor {
    coverage: String,
    touched: Vec<String>,
}

static HANDLERS: LazyLock<Vec<FieldHandler<In1Processor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(0, "ID", TargetType::Code, |p: &mut In1Processor, v, ctx| {
            set_on(ctx, &p.coverage.clone(), "status", v);
        })
        .fixed("active"),
        FieldHandler::new(2, "CWE", TargetType::CodeableConcept, |p: &mut In1Processor, v, ctx| {
            set_on(ctx, &p.coverage.clone(), "type", v);
        }),
        FieldHandler::new(12, "DTM", TargetType::Date, |p: &mut In1Processor, v, ctx| {
            set_primitive(ctx, &p.coverage.clone(), "period.start", v);
        }),
        FieldHandler::new(13, "DTM", TargetType::Date, |p: &mut In1Processor, v, ctx| {
            set_primitive(ctx, &p.coverage.clone(), "period.end", v);
        }),
        FieldHandler::new(36, "ST", TargetType::String, |p: &mut In1Processor, v, ctx| {
            set_on(ctx, &p.coverage.clone(), "subscriberId", v);
        }),
    ])
});

impl In1Processor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }

    /// Find or create the payor named by IN1-3 (company id) and IN1-4
    /// (company name). Matching is by name so repeated IN1 segments for
    /// the same carrier reuse one Organization.
    fn resolve_payor(&mut self, segment: &Segment, ctx: &mut ParseContext) {
        let name = segment
            .field_components(4)
            .map(|components| SourceValue::new("XON", components.clone()))
            .and_then(|v| v.component(1).map(str::to_string));
        let identifiers: Vec<_> = segment
            .field_repeats(3)
            .to_vec()
            .into_iter()
            .filter_map(|repeat| {
                convert(
                    TargetType::Identifier,
                    &SourceValue::new("CX", repeat),
                    None,
                )
            })
            .collect();
        if name.is_none() && identifiers.is_empty() {
            return;
        }

        let name_match = name.clone();
        let organization = ctx.find_or_create_by("Organization", |r| match &name_match {
            Some(n) => r.get_str("name") == Some(n.as_str()),
            None => false,
        });
        if let Some(resource) = ctx.resource_mut(&organization) {
            if resource.get_str("name").is_none() {
                if let Some(name) = name {
                    resource.set("name", json!(name));
                }
            }
            if resource.get("identifier").is_none() {
                for identifier in identifiers {
                    resource.push("identifier", identifier);
                }
            }
        }
        push_on(
            ctx,
            &self.coverage.clone(),
            "payor",
            json!({ "reference": organization }),
        );
        self.touched.push(organization);
    }
}

impl SegmentProcessor for In1Processor {
    fn name(&self) -> &'static str {
        "IN1"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        self.coverage = ctx.create_resource("Coverage");
        let coverage = self.coverage.clone();
        self.touched.push(coverage.clone());
        if let Some(patient) = ctx.bundle().first_of_type("Patient") {
            let beneficiary = patient.local_reference();
            set_on(ctx, &coverage, "beneficiary.reference", json!(beneficiary));
        }
        apply_handlers(self, &HANDLERS, segment, ctx);
        self.resolve_payor(segment, ctx);
        Ok(std::mem::take(&mut self.touched))
    }
}
