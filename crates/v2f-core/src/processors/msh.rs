#![deny(unsafe_code)]

//! MSH: message header.

use std::sync::LazyLock;

use serde_json::{Value, json};

use v2f_convert::TargetType;
use v2f_model::Segment;

use crate::context::ParseContext;
use crate::processors::{SegmentProcessor, set_on};
use crate::registry::{FieldHandler, apply_handlers, build_handler_table};

const EVENT_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0003";

/// Message kinds whose MSH-9.1 marks a query rather than an event feed.
const QUERY_MESSAGE_TYPES: [&str; 4] = ["QBP", "QRY", "QCN", "QSB"];

#[derive(Default)]
pub struct MshProcessor {
    header: String,
}

static HANDLERS: LazyLock<Vec<FieldHandler<MshProcessor>>> = LazyLock::new(|| {
    build_handler_table(vec![
        FieldHandler::new(3, "HD", TargetType::String, |p: &mut MshProcessor, v, ctx| {
            set_on(ctx, &p.header.clone(), "source.name", v);
        }),
        FieldHandler::new(4, "HD", TargetType::String, |p: &mut MshProcessor, v, ctx| {
            set_on(ctx, &p.header.clone(), "source.endpoint", v);
        }),
        FieldHandler::new(5, "HD", TargetType::String, |p: &mut MshProcessor, v, ctx| {
            set_on(ctx, &p.header.clone(), "destination[0].name", v);
        }),
        FieldHandler::new(6, "HD", TargetType::String, |p: &mut MshProcessor, v, ctx| {
            set_on(ctx, &p.header.clone(), "destination[0].endpoint", v);
        }),
        FieldHandler::new(7, "DTM", TargetType::Instant, |p: &mut MshProcessor, v, ctx| {
            set_on(ctx, &p.header.clone(), "timestamp", v);
        }),
        FieldHandler::new(9, "MSG", TargetType::Code, apply_message_type).component(1),
        FieldHandler::new(9, "ID", TargetType::Code, apply_event_code).component(2),
        FieldHandler::new(10, "ST", TargetType::String, |p: &mut MshProcessor, v, ctx| {
            set_on(
                ctx,
                &p.header.clone(),
                "meta.tag[0]",
                json!({ "code": v, "display": "message control id" }),
            );
        }),
    ])
});

fn apply_message_type(p: &mut MshProcessor, value: Value, ctx: &mut ParseContext) {
    let Some(code) = value.as_str() else { return };
    let kind = if QUERY_MESSAGE_TYPES.contains(&code) {
        "query"
    } else {
        "event"
    };
    ctx.set_property("message-kind", kind);
    set_on(
        ctx,
        &p.header.clone(),
        "eventCoding.extension[0]",
        json!({ "url": "urn:hl7v2:message-type", "valueCode": code }),
    );
}

fn apply_event_code(p: &mut MshProcessor, value: Value, ctx: &mut ParseContext) {
    let header = p.header.clone();
    set_on(ctx, &header, "eventCoding.system", json!(EVENT_SYSTEM));
    set_on(ctx, &header, "eventCoding.code", value);
}

impl MshProcessor {
    pub fn boxed() -> Box<dyn SegmentProcessor> {
        Box::new(Self::default())
    }
}

impl SegmentProcessor for MshProcessor {
    fn name(&self) -> &'static str {
        "MSH"
    }

    fn process(
        &mut self,
        segment: &Segment,
        ctx: &mut ParseContext,
    ) -> anyhow::Result<Vec<String>> {
        self.header = ctx.create_resource("MessageHeader");
        apply_handlers(self, &HANDLERS, segment, ctx);
        Ok(vec![self.header.clone()])
    }
}
