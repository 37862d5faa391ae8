#![deny(unsafe_code)]

//! PV1: patient visit. One Encounter per segment, plus the Locations and
//! the attending Practitioner it points at.

use std::sync::LazyLock;

use serde_json::json;

use v2f_convert::TargetType;
use v2f_convert::engine::convert;
use v2f_model::message::SourceValue;
use v2f_model::Segment;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, push_on, set_on, set_primitive};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

const PARTICIPANT_TYPE_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/v3-ParticipationType";

#[derive(Default)]
pub struct Pv1Processor {
    encounter: String,
    touched: Vec<String>,
}

static HANDLERS: LazyLock<Vec<FieldHandler<Pv1Processor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(0, "ID", TargetType::Code, |p: &mut Pv1Processor, v, ctx| {
            set_on(ctx, &p.encounter.clone(), "status", v);
        })
        .fixed("unknown"),
        FieldHandler::new(2, "IS", TargetType::Coding, |p: &mut Pv1Processor, v, ctx| {
            set_on(ctx, &p.encounter.clone(), "class", v);
        })
        .table("0004"),
        FieldHandler::new(19, "CX", TargetType::Identifier, |p: &mut Pv1Processor, v, ctx| {
            push_on(ctx, &p.encounter.clone(), "identifier", v);
        }),
        FieldHandler::new(44, "DTM", TargetType::DateTime, |p: &mut Pv1Processor, v, ctx| {
            set_primitive(ctx, &p.encounter.clone(), "period.start", v);
        }),
        FieldHandler::new(45, "DTM", TargetType::DateTime, |p: &mut Pv1Processor, v, ctx| {
            set_primitive(ctx, &p.encounter.clone(), "period.end", v);
        }),
    ])
});

/// PL levels in containment order: (component, physical type code).
const LOCATION_LEVELS: [(usize, &str); 4] = [(4, "bu"), (1, "wa"), (2, "ro"), (3, "bd")];

impl Pv1Processor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }

    /// Build the location chain named by a PL value, reusing bundle
    /// entries with the same name and parent. Returns the leaf.
    fn resolve_locations(&mut self, value: &SourceValue, ctx: &mut ParseContext) -> Option<String> {
        let mut parent: Option<String> = None;
        for (component, physical_type) in LOCATION_LEVELS {
            // The facility is an HD; its name is the first sub-component.
            let Some(name) = value.subcomponent(component, 1) else {
                continue;
            };
            let name = name.to_string();
            let parent_ref = parent.clone();
            let location = ctx.find_or_create_by("Location", |r| {
                r.get_str("name") == Some(name.as_str())
                    && r.get_str("partOf.reference") == parent_ref.as_deref()
            });
            if let Some(resource) = ctx.resource_mut(&location) {
                if resource.get_str("name").is_none() {
                    resource.set("name", json!(name));
                    resource.set("mode", json!("instance"));
                    resource.set("physicalType.coding[0].code", json!(physical_type));
                    if let Some(parent) = &parent_ref {
                        resource.set("partOf.reference", json!(parent));
                    }
                }
            }
            if !self.touched.contains(&location) {
                self.touched.push(location.clone());
            }
            parent = Some(location);
        }
        parent
    }

    /// Find or create the practitioner named by one XCN repetition and
    /// attach them as a participant.
    fn attach_practitioner(
        &mut self,
        value: &SourceValue,
        role: &str,
        ctx: &mut ParseContext,
    ) {
        let identifier = value.component(1).map(str::to_string);
        let name = convert(TargetType::HumanName, value, None);
        if identifier.is_none() && name.is_none() {
            return;
        }
        let id_match = identifier.clone();
        let practitioner = ctx.find_or_create_by("Practitioner", |r| match &id_match {
            Some(id) => r.get_str("identifier[0].value") == Some(id.as_str()),
            None => false,
        });
        if let Some(resource) = ctx.resource_mut(&practitioner) {
            if resource.get("identifier").is_none() {
                if let Some(id) = identifier {
                    resource.set("identifier[0].value", json!(id));
                }
            }
            if resource.get("name").is_none() {
                if let Some(name) = name {
                    resource.push("name", name);
                }
            }
        }
        push_on(
            ctx,
            &self.encounter.clone(),
            "participant",
            json!({
                "type": [{
                    "coding": [{ "system": PARTICIPANT_TYPE_SYSTEM, "code": role }],
                }],
                "individual": { "reference": practitioner },
            }),
        );
        if !self.touched.contains(&practitioner) {
            self.touched.push(practitioner);
        }
    }
}

impl SegmentProcessor for Pv1Processor {
    fn name(&self) -> &'static str {
        "PV1"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        let patient = ctx.find_or_create_first("Patient");
        self.encounter = ctx.create_resource("Encounter");
        let encounter = self.encounter.clone();
        self.touched.push(encounter.clone());
        set_on(ctx, &encounter, "subject.reference", json!(patient));

        apply_handlers(self, &HANDLERS, segment, ctx);

        if let Some(components) = segment.field_components(3) {
            let value = SourceValue::new("PL", components.clone());
            if let Some(leaf) = self.resolve_locations(&value, ctx) {
                push_on(
                    ctx,
                    &encounter,
                    "location",
                    json!({ "location": { "reference": leaf } }),
                );
            }
        }
        for repeat in segment.field_repeats(7).to_vec() {
            let value = SourceValue::new("XCN", repeat);
            self.attach_practitioner(&value, "ATND", ctx);
        }

        Ok(std::mem::take(&mut self.touched))
    }
}
