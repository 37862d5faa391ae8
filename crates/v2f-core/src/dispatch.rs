#![deny(unsafe_code)]

//! Top-level dispatcher: walks the message's structure-units in document
//! order, hands each to its processor, and finishes the bundle with the
//! normalization pass and provenance reordering.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;
use tracing::{info, warn};

use v2f_model::message::{Message, UnitId, UnitKind};
use v2f_model::{Bundle, IdGenerator, SourceValue, UuidGenerator};

use crate::context::ParseContext;
use crate::processors::{ProcessorFactory, ProcessorRegistry};

const RAW_MESSAGE_CONTENT_TYPE: &str = "application/hl7-v2+er7";
const PROVENANCE_ACTIVITY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/v3-DataOperation";
const PROVENANCE_AGENT_TYPE_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/provenance-participant-type";

/// Conversion knobs, threaded through explicitly.
#[derive(Clone)]
pub struct ConverterOptions {
    /// Emit Provenance records for synthesized resources. The raw-message
    /// Binary is captured regardless.
    pub provenance: bool,
    /// Warn when a mapped segment carries fields no handler consumes.
    pub warn_on_missing_handler: bool,
    pub id_generator: Arc<dyn IdGenerator>,
    /// Fixed `Provenance.recorded` instant; wall clock when unset.
    pub recorded: Option<DateTime<Utc>>,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            provenance: true,
            warn_on_missing_handler: false,
            id_generator: Arc::new(UuidGenerator),
            recorded: None,
        }
    }
}

impl ConverterOptions {
    pub fn with_provenance(mut self, provenance: bool) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_warn_on_missing_handler(mut self, warn: bool) -> Self {
        self.warn_on_missing_handler = warn;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = ids;
        self
    }

    pub fn with_recorded(mut self, recorded: DateTime<Utc>) -> Self {
        self.recorded = Some(recorded);
        self
    }
}

/// Converts whole messages. Reusable across messages; the per-segment
/// resolution cache warms up on first use and the negative entries keep
/// repeated unmapped segments from logging more than once each.
pub struct MessageConverter {
    options: ConverterOptions,
    registry: ProcessorRegistry,
    resolution_cache: HashMap<String, Option<ProcessorFactory>>,
}

impl Default for MessageConverter {
    fn default() -> Self {
        Self::new(ConverterOptions::default())
    }
}

impl MessageConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self {
            options,
            registry: ProcessorRegistry::with_builtins(),
            resolution_cache: HashMap::new(),
        }
    }

    /// Register or replace a processor for a segment name.
    pub fn register_processor(&mut self, name: &str, factory: ProcessorFactory) {
        self.registry.register(name, factory);
        self.resolution_cache.clear();
    }

    /// Convert one message into a bundle. Never fails: malformed units are
    /// skipped with a warning and everything else still converts.
    pub fn convert(&mut self, message: &Message) -> Bundle {
        let mut ctx =
            ParseContext::new(self.options.id_generator.clone(), self.options.provenance)
                .with_warn_on_missing_handler(self.options.warn_on_missing_handler);
        seed_event(&mut ctx, message);
        let source_ref = self.capture_raw_message(message, &mut ctx);
        let recorded = self
            .options
            .recorded
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let mut processed: Vec<UnitId> = Vec::new();
        let mut provenance_refs: HashMap<String, String> = HashMap::new();
        for unit in message.units() {
            if processed.contains(&unit.id) {
                info!(unit = unit.name, "unit already consumed by an earlier processor; skipping");
                continue;
            }
            let Some(factory) = self.resolve(unit.name, unit.kind) else {
                continue;
            };
            let mut processor = factory();
            let outcome = match unit.segment {
                Some(segment) => processor.process(segment, &mut ctx),
                None => processor.process_group(&unit, &mut ctx),
            };
            match outcome {
                Ok(touched) if !touched.is_empty() => {
                    processed.push(unit.id);
                    // A claimed group consumes every unit inside it; their
                    // ids follow the group's own in flatten order.
                    if unit.segment.is_none() {
                        for offset in 1..=unit.descendant_count() {
                            processed.push(UnitId(unit.id.0 + offset));
                        }
                    }
                    if ctx.provenance_enabled() {
                        record_provenance(
                            &mut ctx,
                            &mut provenance_refs,
                            &touched,
                            unit.name,
                            &source_ref,
                            &recorded,
                        );
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(unit = unit.name, %error, "unit conversion failed; continuing");
                }
            }
        }

        let mut bundle = ctx.into_bundle();
        v2f_normalization::normalize(&mut bundle);
        bundle.move_type_to_end("Provenance");
        bundle
    }

    fn resolve(&mut self, name: &str, kind: UnitKind) -> Option<ProcessorFactory> {
        let key = name.to_ascii_uppercase();
        if let Some(cached) = self.resolution_cache.get(&key) {
            return *cached;
        }
        let factory = self.registry.resolve(&key);
        if factory.is_none() && kind == UnitKind::Segment {
            // Once per name; groups resolve silently since their children
            // are dispatched on their own.
            warn!(segment = %key, "no processor registered; segment data will be dropped");
        }
        self.resolution_cache.insert(key, factory);
        factory
    }

    /// Capture the wire text as a Binary so provenance can point at it.
    /// Always synthesized, even with provenance records disabled.
    fn capture_raw_message(&self, message: &Message, ctx: &mut ParseContext) -> String {
        let binary = ctx.create_resource("Binary");
        if let Some(resource) = ctx.resource_mut(&binary) {
            resource.set("contentType", json!(RAW_MESSAGE_CONTENT_TYPE));
            resource.set("data", json!(BASE64.encode(message.to_er7())));
        }
        binary
    }
}

/// Read the event classification and declared profiles from MSH before
/// any unit is dispatched.
fn seed_event(ctx: &mut ParseContext, message: &Message) {
    let Some(msh) = message.segment("MSH") else {
        warn!("message has no MSH; converting without an event classification");
        return;
    };
    let message_type = msh.field_components(9).map(|components| {
        let value = SourceValue::new("MSG", components.clone());
        (
            value.component(1).map(str::to_string),
            value.component(2).map(str::to_string),
        )
    });
    if let Some((kind, trigger)) = message_type {
        ctx.set_event(kind, trigger);
    }
    for repeat in msh.field_repeats(21).to_vec() {
        let value = SourceValue::new("EI", repeat);
        if let Some(profile) = value.component(1).or_else(|| value.component(3)) {
            ctx.add_profile(profile.to_string());
        }
    }
}

/// Create or extend the Provenance entry for each touched resource. One
/// Provenance per resource; later units contributing to the same resource
/// add their segment name to the source entity display.
fn record_provenance(
    ctx: &mut ParseContext,
    provenance_refs: &mut HashMap<String, String>,
    touched: &[String],
    unit_name: &str,
    source_ref: &str,
    recorded: &str,
) {
    for target in touched {
        if let Some(existing) = provenance_refs.get(target) {
            let existing = existing.clone();
            if let Some(resource) = ctx.resource_mut(&existing) {
                let display = resource.get_str("entity[0].what.display").unwrap_or_default();
                if !display.split(", ").any(|part| part == unit_name) {
                    let joined = if display.is_empty() {
                        unit_name.to_string()
                    } else {
                        format!("{display}, {unit_name}")
                    };
                    resource.set("entity[0].what.display", json!(joined));
                }
            }
            continue;
        }
        let provenance = ctx.create_resource("Provenance");
        if let Some(resource) = ctx.resource_mut(&provenance) {
            resource.set("target[0].reference", json!(target));
            resource.set("recorded", json!(recorded));
            resource.set(
                "activity.coding[0]",
                json!({ "system": PROVENANCE_ACTIVITY_SYSTEM, "code": "CREATE" }),
            );
            resource.set(
                "agent[0].type.coding[0]",
                json!({ "system": PROVENANCE_AGENT_TYPE_SYSTEM, "code": "assembler" }),
            );
            resource.set("entity[0].role", json!("source"));
            resource.set("entity[0].what.display", json!(unit_name));
            resource.set("entity[0].what.reference", json!(source_ref));
        }
        provenance_refs.insert(target.clone(), provenance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use v2f_model::message::{MessageElement, Segment, Unit};
    use v2f_model::SequentialIdGenerator;

    fn converter() -> MessageConverter {
        MessageConverter::new(
            ConverterOptions::default()
                .with_id_generator(Arc::new(SequentialIdGenerator::default()))
                .with_recorded("2024-06-01T00:00:00Z".parse().unwrap()),
        )
    }

    #[test]
    fn event_classification_is_seeded_from_msh() {
        let message = Message::parse_er7(
            "MSH|^~\\&|App|Fac|||20200304||ADT^A01|M1|P|2.6|||||||||Profile1^^urn:1.2.3^ISO",
        )
        .unwrap();
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), false);
        seed_event(&mut ctx, &message);
        assert_eq!(ctx.message_type(), Some("ADT"));
        assert_eq!(ctx.event_code(), Some("A01"));
        assert_eq!(ctx.profiles(), ["Profile1"]);
    }

    #[test]
    fn provenance_is_shared_per_resource_and_lists_contributors() {
        let mut ctx = ParseContext::new(Arc::new(SequentialIdGenerator::default()), true);
        let patient = ctx.find_or_create_first("Patient");
        let mut refs = HashMap::new();
        record_provenance(
            &mut ctx,
            &mut refs,
            &[patient.clone()],
            "PID",
            "Binary/b1",
            "2024-06-01T00:00:00Z",
        );
        record_provenance(
            &mut ctx,
            &mut refs,
            &[patient.clone()],
            "NK1",
            "Binary/b1",
            "2024-06-01T00:00:00Z",
        );
        assert_eq!(ctx.bundle().resources_of_type("Provenance").count(), 1);
        let provenance = ctx.bundle().first_of_type("Provenance").unwrap();
        assert_eq!(
            provenance.get_str("entity[0].what.display"),
            Some("PID, NK1")
        );
        assert_eq!(
            provenance.get_str("target[0].reference"),
            Some(patient.as_str())
        );
    }

    #[test]
    fn unmapped_segments_warn_once_and_convert_continues() {
        let mut converter = converter();
        let message =
            Message::parse_er7("MSH|^~\\&|App|Fac|||20200304||ADT^A01|M1|P|2.6\rZZZ|custom\rPID|1||P1||Doe^J")
                .unwrap();
        let bundle = converter.convert(&message);
        assert!(bundle.first_of_type("Patient").is_some());
        assert!(
            converter.resolution_cache.contains_key("ZZZ"),
            "negative entry cached"
        );
    }

    #[test]
    fn disabling_provenance_drops_records_but_keeps_the_raw_message() {
        let mut converter = MessageConverter::new(
            ConverterOptions::default()
                .with_provenance(false)
                .with_id_generator(Arc::new(SequentialIdGenerator::default())),
        );
        let message =
            Message::parse_er7("MSH|^~\\&|App|Fac|||20200304||ADT^A01|M1|P|2.6\rPID|1||P1||Doe^J")
                .unwrap();
        let bundle = converter.convert(&message);
        let binary = bundle.first_of_type("Binary").unwrap();
        assert_eq!(binary.get_str("contentType"), Some(RAW_MESSAGE_CONTENT_TYPE));
        assert!(bundle.first_of_type("Provenance").is_none());
        assert!(bundle.first_of_type("Patient").is_some());
    }

    struct PatientGroupProcessor;

    impl crate::processors::SegmentProcessor for PatientGroupProcessor {
        fn name(&self) -> &'static str {
            "PATIENT"
        }

        fn process(
            &mut self,
            _segment: &Segment,
            _ctx: &mut ParseContext,
        ) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn process_group(
            &mut self,
            _unit: &Unit<'_>,
            ctx: &mut ParseContext,
        ) -> anyhow::Result<Vec<String>> {
            Ok(vec![ctx.find_or_create_first("Patient")])
        }
    }

    #[test]
    fn a_claimed_group_consumes_its_child_units() {
        let mut converter = converter();
        converter.register_processor("PATIENT", || Box::new(PatientGroupProcessor));
        let mut pid = Segment::new("PID");
        pid.set_field(5, "Doe^Jane");
        let message = Message::new(vec![
            MessageElement::Segment(Segment::new("MSH")),
            MessageElement::Group {
                name: "PATIENT".to_string(),
                children: vec![MessageElement::Segment(pid)],
            },
        ]);
        let bundle = converter.convert(&message);
        assert_eq!(bundle.resources_of_type("Patient").count(), 1);
        let patient = bundle.first_of_type("Patient").unwrap();
        assert!(
            patient.get("name").is_none(),
            "the PID unit was consumed with its group, not dispatched again"
        );
    }

    #[test]
    fn provenance_entries_sort_to_the_end() {
        let mut converter = converter();
        let message = Message::parse_er7(
            "MSH|^~\\&|App|Fac|||20200304||ADT^A01|M1|P|2.6\rPID|1||P1||Doe^J\rPV1|1|I",
        )
        .unwrap();
        let bundle = converter.convert(&message);
        let types: Vec<_> = bundle
            .entries()
            .iter()
            .map(|r| r.resource_type.as_str())
            .collect();
        let first_provenance = types.iter().position(|t| *t == "Provenance").unwrap();
        assert!(types[first_provenance..].iter().all(|t| *t == "Provenance"));
    }
}
