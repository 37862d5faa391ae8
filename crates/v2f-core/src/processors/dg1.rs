#![deny(unsafe_code)]

//! DG1: diagnosis. One Condition per segment.

use std::sync::LazyLock;

use serde_json::json;

use v2f_convert::TargetType;
use v2f_model::Segment;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, push_on, set_on, set_primitive};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

#[derive(Default)]
pub struct Dg1Processor {
    condition: String,
}

static HANDLERS: LazyLock<Vec<FieldHandler<Dg1Processor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(3, "CWE", TargetType::CodeableConcept, |p: &mut Dg1Processor, v, ctx| {
            set_on(ctx, &p.condition.clone(), "code", v);
        }),
        // Free-text description backs up a missing coded diagnosis.
        FieldHandler::new(4, "ST", TargetType::String, |p: &mut Dg1Processor, v, ctx| {
            let condition = p.condition.clone();
            let missing = ctx
                .resource_mut(&condition)
                .is_some_and(|r| r.get("code.text").is_none());
            if missing {
                set_on(ctx, &condition, "code.text", v);
            }
        }),
        FieldHandler::new(5, "DTM", TargetType::DateTime, |p: &mut Dg1Processor, v, ctx| {
            set_primitive(ctx, &p.condition.clone(), "onsetDateTime", v);
        }),
        FieldHandler::new(6, "IS", TargetType::CodeableConcept, |p: &mut Dg1Processor, v, ctx| {
            push_on(ctx, &p.condition.clone(), "category", v);
        }),
    ])
});

impl Dg1Processor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }
}

impl SegmentProcessor for Dg1Processor {
    fn name(&self) -> &'static str {
        "DG1"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        self.condition = ctx.create_resource("Condition");
        let condition = self.condition.clone();
        if let Some(patient) = ctx.bundle().first_of_type("Patient") {
            let subject = patient.local_reference();
            set_on(ctx, &condition, "subject.reference", json!(subject));
        }
        apply_handlers(self, &HANDLERS, segment, ctx);
        Ok(vec![condition])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use v2f_model::{Message, SequentialIdGenerator};

    fn run(line: &str) -> (ParseContext, String) {
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), false);
        let message = Message::parse_er7(line).unwrap();
        let touched = Dg1Processor::default()
            .process(message.segment("DG1").unwrap(), &mut ctx)
            .unwrap();
        (ctx, touched[0].clone())
    }

    #[test]
    fn coded_diagnosis_with_onset_and_type() {
        let (mut ctx, condition) =
            run("DG1|1||I10^Essential hypertension^I10|Hypertension|20180201|F");
        let resource = ctx.resource_mut(&condition).unwrap();
        assert_eq!(resource.get_str("code.coding[0].code"), Some("I10"));
        assert_eq!(
            resource.get_str("code.coding[0].system"),
            Some("http://hl7.org/fhir/sid/icd-10-cm")
        );
        assert_eq!(resource.get_str("onsetDateTime"), Some("2018-02-01"));
        assert_eq!(resource.get_str("category[0].coding[0].code"), Some("F"));
    }

    #[test]
    fn description_fills_missing_text_only() {
        let (mut ctx, condition) = run("DG1|1|||Chest pain, unspecified");
        let resource = ctx.resource_mut(&condition).unwrap();
        assert_eq!(resource.get_str("code.text"), Some("Chest pain, unspecified"));
    }
}
