#![deny(unsafe_code)]

//! NK1: next of kin. One RelatedPerson per segment.

use std::sync::LazyLock;

use serde_json::json;

use v2f_convert::TargetType;
use v2f_model::Segment;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, push_on, push_telecom};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

#[derive(Default)]
pub struct Nk1Processor {
    related: String,
}

static HANDLERS: LazyLock<Vec<FieldHandler<Nk1Processor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(2, "XPN", TargetType::HumanName, |p: &mut Nk1Processor, v, ctx| {
            push_on(ctx, &p.related.clone(), "name", v);
        }),
        FieldHandler::new(3, "CWE", TargetType::CodeableConcept, |p: &mut Nk1Processor, v, ctx| {
            push_on(ctx, &p.related.clone(), "relationship", v);
        })
        .table("0063"),
        FieldHandler::new(4, "XAD", TargetType::Address, |p: &mut Nk1Processor, v, ctx| {
            push_on(ctx, &p.related.clone(), "address", v);
        }),
        FieldHandler::new(5, "XTN", TargetType::ContactPoint, |p: &mut Nk1Processor, v, ctx| {
            push_telecom(ctx, &p.related.clone(), v, "home");
        }),
        FieldHandler::new(6, "XTN", TargetType::ContactPoint, |p: &mut Nk1Processor, v, ctx| {
            push_telecom(ctx, &p.related.clone(), v, "work");
        }),
    ])
});

impl Nk1Processor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }
}

impl SegmentProcessor for Nk1Processor {
    fn name(&self) -> &'static str {
        "NK1"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        let patient = ctx.find_or_create_first("Patient");
        self.related = ctx.create_resource("RelatedPerson");
        let related = self.related.clone();
        if let Some(resource) = ctx.resource_mut(&related) {
            resource.set("patient.reference", json!(patient));
        }
        apply_handlers(self, &HANDLERS, segment, ctx);
        Ok(vec![related])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use v2f_model::{Message, SequentialIdGenerator};

    #[test]
    fn each_segment_yields_a_related_person_linked_to_the_patient() {
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), false);
        let patient = ctx.find_or_create_first("Patient");
        let message =
            Message::parse_er7("NK1|1|Doe^John|SPO^Spouse|456 Oak Ave^^Springfield^IL|5551234567")
                .unwrap();
        let touched = Nk1Processor::default()
            .process(message.segment("NK1").unwrap(), &mut ctx)
            .unwrap();

        let resource = ctx.resource_mut(&touched[0]).unwrap();
        assert_eq!(resource.get_str("patient.reference"), Some(patient.as_str()));
        assert_eq!(resource.get_str("name[0].family"), Some("Doe"));
        assert_eq!(
            resource.get_str("relationship[0].coding[0].code"),
            Some("SPO")
        );
        assert_eq!(resource.get_str("telecom[0].use"), Some("home"));
    }

    #[test]
    fn repeated_segments_yield_distinct_people() {
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), false);
        for line in ["NK1|1|One^A|SPO", "NK1|2|Two^B|CHD"] {
            let message = Message::parse_er7(line).unwrap();
            Nk1Processor::default()
                .process(message.segment("NK1").unwrap(), &mut ctx)
                .unwrap();
        }
        assert_eq!(ctx.bundle().resources_of_type("RelatedPerson").count(), 2);
    }
}
