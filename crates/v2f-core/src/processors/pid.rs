#![deny(unsafe_code)]

//! PID: patient identification.
//!
//! Demographics accumulate onto the one patient of the conversion; a
//! second PID updates the same resource rather than minting another.

use std::sync::LazyLock;

use serde_json::{Value, json};

use v2f_convert::TargetType;
use v2f_model::Segment;
use v2f_model::is_deleted_value;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, push_on, push_telecom, set_on, set_primitive};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

#[derive(Default)]
pub struct PidProcessor {
    patient: String,
    deceased_time_known: bool,
}

static HANDLERS: LazyLock<Vec<FieldHandler<PidProcessor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(3, "CX", TargetType::Identifier, |p: &mut PidProcessor, v, ctx| {
            push_on(ctx, &p.patient.clone(), "identifier", v);
        }),
        FieldHandler::new(5, "XPN", TargetType::HumanName, |p: &mut PidProcessor, v, ctx| {
            push_on(ctx, &p.patient.clone(), "name", v);
        }),
        FieldHandler::new(7, "DTM", TargetType::Date, |p: &mut PidProcessor, v, ctx| {
            set_primitive(ctx, &p.patient.clone(), "birthDate", v);
        }),
        FieldHandler::new(8, "IS", TargetType::Code, apply_gender).table("0001"),
        FieldHandler::new(11, "XAD", TargetType::Address, |p: &mut PidProcessor, v, ctx| {
            push_on(ctx, &p.patient.clone(), "address", v);
        }),
        FieldHandler::new(13, "XTN", TargetType::ContactPoint, |p: &mut PidProcessor, v, ctx| {
            push_telecom(ctx, &p.patient.clone(), v, "home");
        }),
        FieldHandler::new(14, "XTN", TargetType::ContactPoint, |p: &mut PidProcessor, v, ctx| {
            push_telecom(ctx, &p.patient.clone(), v, "work");
        }),
        FieldHandler::new(16, "CWE", TargetType::CodeableConcept, |p: &mut PidProcessor, v, ctx| {
            set_on(ctx, &p.patient.clone(), "maritalStatus", v);
        })
        .table("0002"),
        FieldHandler::new(29, "DTM", TargetType::DateTime, apply_deceased_time),
        FieldHandler::new(30, "ID", TargetType::Boolean, apply_deceased_flag),
    ])
});

fn apply_gender(p: &mut PidProcessor, value: Value, ctx: &mut ParseContext) {
    let patient = p.patient.clone();
    if is_deleted_value(&value) {
        set_primitive(ctx, &patient, "gender", value);
        return;
    }
    let Some(code) = value.as_str() else { return };
    let gender = match code.to_ascii_uppercase().as_str() {
        "F" => "female",
        "M" => "male",
        "O" | "A" | "N" => "other",
        _ => "unknown",
    };
    set_on(ctx, &patient, "gender", json!(gender));
}

/// A known death time supersedes the bare boolean.
fn apply_deceased_time(p: &mut PidProcessor, value: Value, ctx: &mut ParseContext) {
    let patient = p.patient.clone();
    p.deceased_time_known = !is_deleted_value(&value);
    if let Some(resource) = ctx.resource_mut(&patient) {
        resource.remove("deceasedBoolean");
    }
    set_primitive(ctx, &patient, "deceasedDateTime", value);
}

fn apply_deceased_flag(p: &mut PidProcessor, value: Value, ctx: &mut ParseContext) {
    if p.deceased_time_known {
        return;
    }
    set_primitive(ctx, &p.patient.clone(), "deceasedBoolean", value);
}

impl PidProcessor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }
}

impl SegmentProcessor for PidProcessor {
    fn name(&self) -> &'static str {
        "PID"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        self.patient = ctx.find_or_create_first("Patient");
        apply_handlers(self, &HANDLERS, segment, ctx);
        Ok(vec![self.patient.clone()])
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
        let segment = message.segment("PID").unwrap();
        let touched = PidProcessor::default()
            .process(segment, &mut ctx)
            .unwrap();
        (ctx, touched[0].clone())
    }

    #[test]
    fn demographics_land_on_one_patient() {
        let (mut ctx, patient) = run(
            "PID|1||12345^^^Hosp&1.2.3.4&ISO^MR~67890^^^&2.16.840.1.113883.4.1&ISO^SS||Doe^Jane^Q|||F|||123 Main St^^Springfield^IL^62701||^PRN^PH^^^555^1234567",
        );
        let resource = ctx.resource_mut(&patient).unwrap();
        assert_eq!(
            resource.get("identifier").unwrap().as_array().unwrap().len(),
            2,
            "one identifier per repetition"
        );
        assert_eq!(resource.get_str("name[0].family"), Some("Doe"));
        assert_eq!(resource.get_str("gender"), Some("female"));
        assert_eq!(resource.get_str("address[0].city"), Some("Springfield"));
        assert_eq!(resource.get_str("telecom[0].use"), Some("home"));
    }

    #[test]
    fn second_pid_reuses_the_same_patient() {
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), false);
        for line in ["PID|1||A1||One^P", "PID|1||A2||Two^P"] {
            let message = Message::parse_er7(line).unwrap();
            PidProcessor::default()
                .process(message.segment("PID").unwrap(), &mut ctx)
                .unwrap();
        }
        assert_eq!(ctx.bundle().resources_of_type("Patient").count(), 1);
    }

    fn run_segment(build: impl FnOnce(&mut Segment)) -> (ParseContext, String) {
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), false);
        let mut segment = Segment::new("PID");
        build(&mut segment);
        let touched = PidProcessor::default()
            .process(&segment, &mut ctx)
            .unwrap();
        (ctx, touched[0].clone())
    }

    #[test]
    fn death_time_wins_over_death_flag() {
        let (mut ctx, patient) = run_segment(|pid| {
            pid.set_field(5, "Doe^J")
                .set_field(29, "20210405")
                .set_field(30, "Y");
        });
        let resource = ctx.resource_mut(&patient).unwrap();
        assert_eq!(resource.get_str("deceasedDateTime"), Some("2021-04-05"));
        assert!(resource.get("deceasedBoolean").is_none());
    }

    #[test]
    fn death_flag_alone_is_kept() {
        let (mut ctx, patient) = run_segment(|pid| {
            pid.set_field(5, "Doe^J").set_field(30, "Y");
        });
        let resource = ctx.resource_mut(&patient).unwrap();
        assert_eq!(resource.get("deceasedBoolean"), Some(&json!(true)));
    }

    #[test]
    fn deleted_birth_date_is_marked_not_dropped() {
        let (mut ctx, patient) = run_segment(|pid| {
            pid.set_field(5, "Doe^J")
                .set_field(7, "\"\"")
                .set_field(8, "F");
        });
        let resource = ctx.resource_mut(&patient).unwrap();
        assert!(resource.get("birthDate").is_none());
        assert!(resource.get("_birthDate").is_some());
    }
}
