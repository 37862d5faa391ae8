#![deny(unsafe_code)]

//! Minimal HL7 V2 message object model.
//!
//! The full wire-format tokenizer is an external collaborator; this module
//! carries only what the conversion engine consumes: document-ordered
//! structure-units, field/component random access, and a lossless
//! re-encoding used for provenance capture.

use crate::error::{ModelError, Result};

const SEGMENT_SEPARATORS: [char; 2] = ['\r', '\n'];
const FIELD_SEP: char = '|';
const REPEAT_SEP: char = '~';
const COMPONENT_SEP: char = '^';
const SUBCOMPONENT_SEP: char = '&';

/// The HL7 "delete this field" sentinel: a field consisting of two
/// double-quote characters.
pub const DELETION_SENTINEL: &str = "\"\"";

/// One repetition of a field: components, each a list of sub-components.
type Repeat = Vec<Vec<String>>;

/// A parsed message: an ordered tree of segments and named groups.
#[derive(Debug, Clone, Default)]
pub struct Message {
    elements: Vec<MessageElement>,
    raw: Option<String>,
}

/// One node of the message tree.
#[derive(Debug, Clone)]
pub enum MessageElement {
    Segment(Segment),
    Group {
        name: String,
        children: Vec<MessageElement>,
    },
}

/// Stable identity of one structure-unit within one conversion.
///
/// Assigned at flatten time in document order; identity, not content, so
/// two structurally identical segments remain distinct units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A leaf segment.
    Segment,
    /// A named group of elements.
    Group,
}

/// One flattened structure-unit handed to the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct Unit<'a> {
    pub id: UnitId,
    pub name: &'a str,
    pub kind: UnitKind,
    pub segment: Option<&'a Segment>,
    /// Child elements of a group unit; `None` for leaf segments.
    pub children: Option<&'a [MessageElement]>,
}

impl Unit<'_> {
    /// Number of flattened units inside this group, zero for segments.
    /// Descendants occupy the ids directly following the group's own.
    pub fn descendant_count(&self) -> usize {
        self.children.map(count_units).unwrap_or(0)
    }
}

impl Message {
    pub fn new(elements: Vec<MessageElement>) -> Self {
        Self {
            elements,
            raw: None,
        }
    }

    /// Decode an ER7-encoded message.
    ///
    /// Splits on segment, field, repetition, component, and sub-component
    /// separators. The MSH segment gets its conventional numbering: field 1
    /// is the field separator itself and field 2 (the encoding characters)
    /// is kept verbatim.
    pub fn parse_er7(input: &str) -> Result<Self> {
        let mut elements = Vec::new();
        for line in input.split(SEGMENT_SEPARATORS) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            elements.push(MessageElement::Segment(Segment::parse_er7_line(line)?));
        }
        Ok(Self {
            elements,
            raw: Some(input.to_string()),
        })
    }

    /// Re-encode to wire text. Lossless for parsed messages (the original
    /// text is retained); constructed messages are encoded field by field.
    pub fn to_er7(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut lines = Vec::new();
        collect_er7_lines(&self.elements, &mut lines);
        lines.join("\r")
    }

    pub fn elements(&self) -> &[MessageElement] {
        &self.elements
    }

    /// Flatten into document-ordered structure-units, group markers before
    /// their children, each with a fresh [`UnitId`].
    pub fn units(&self) -> Vec<Unit<'_>> {
        let mut units = Vec::new();
        flatten(&self.elements, &mut units);
        units
    }

    /// The first segment with the given name, if any.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.units()
            .into_iter()
            .find(|u| u.kind == UnitKind::Segment && u.name.eq_ignore_ascii_case(name))
            .and_then(|u| u.segment)
    }
}

fn flatten<'a>(elements: &'a [MessageElement], out: &mut Vec<Unit<'a>>) {
    for element in elements {
        match element {
            MessageElement::Segment(seg) => out.push(Unit {
                id: UnitId(out.len()),
                name: &seg.name,
                kind: UnitKind::Segment,
                segment: Some(seg),
                children: None,
            }),
            MessageElement::Group { name, children } => {
                out.push(Unit {
                    id: UnitId(out.len()),
                    name,
                    kind: UnitKind::Group,
                    segment: None,
                    children: Some(children),
                });
                flatten(children, out);
            }
        }
    }
}

fn count_units(elements: &[MessageElement]) -> usize {
    elements
        .iter()
        .map(|element| match element {
            MessageElement::Segment(_) => 1,
            MessageElement::Group { children, .. } => 1 + count_units(children),
        })
        .sum()
}

fn collect_er7_lines(elements: &[MessageElement], out: &mut Vec<String>) {
    for element in elements {
        match element {
            MessageElement::Segment(seg) => out.push(seg.to_er7()),
            MessageElement::Group { children, .. } => collect_er7_lines(children, out),
        }
    }
}

/// One segment: a three-letter name plus 1-based fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    fields: Vec<Vec<Repeat>>,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    fn parse_er7_line(line: &str) -> Result<Self> {
        let mut parts = line.split(FIELD_SEP);
        let name = parts.next().unwrap_or("").trim().to_string();
        if name.len() != 3 || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ModelError::InvalidSegmentName(name));
        }
        let mut segment = Segment::new(&name);
        if name == "MSH" {
            // MSH-1 is the field separator itself; MSH-2 (encoding
            // characters) must not be component-split.
            segment.fields.push(vec![vec![vec!["|".to_string()]]]);
            if let Some(encoding) = parts.next() {
                segment.fields.push(vec![vec![vec![encoding.to_string()]]]);
            }
        }
        for part in parts {
            segment.fields.push(parse_field(part));
        }
        Ok(segment)
    }

    /// Set field `index` (1-based) from raw ER7 field text.
    pub fn set_field(&mut self, index: usize, value: &str) -> &mut Self {
        if index == 0 {
            return self;
        }
        if self.fields.len() < index {
            self.fields.resize(index, Vec::new());
        }
        self.fields[index - 1] = parse_field(value);
        self
    }

    /// First repetition of field `index` (1-based), as components of
    /// sub-components. `None` when the field is absent or empty.
    pub fn field_components(&self, index: usize) -> Option<&Repeat> {
        self.field_repeats(index).first()
    }

    /// All repetitions of field `index` (1-based).
    pub fn field_repeats(&self, index: usize) -> &[Repeat] {
        if index == 0 {
            return &[];
        }
        self.fields
            .get(index - 1)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Highest field index carried by this segment.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Raw ER7 text of field `index` (first repetition), `None` when blank.
    pub fn field_raw(&self, index: usize) -> Option<String> {
        let raw = encode_repeat(self.field_components(index)?);
        if raw.is_empty() { None } else { Some(raw) }
    }

    pub fn to_er7(&self) -> String {
        let mut out = self.name.clone();
        let fields: &[Vec<Repeat>] = if self.name == "MSH" {
            // MSH-1 is implied by the separator following the name.
            self.fields.get(1..).unwrap_or_default()
        } else {
            &self.fields
        };
        for field in fields {
            out.push(FIELD_SEP);
            let encoded: Vec<String> = field.iter().map(|r| encode_repeat(r)).collect();
            out.push_str(&encoded.join(&REPEAT_SEP.to_string()));
        }
        out
    }
}

fn parse_field(raw: &str) -> Vec<Repeat> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(REPEAT_SEP)
        .map(|rep| {
            rep.split(COMPONENT_SEP)
                .map(|comp| {
                    comp.split(SUBCOMPONENT_SEP)
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect::<Repeat>()
        })
        .collect()
}

fn encode_repeat(components: &Repeat) -> String {
    components
        .iter()
        .map(|comp| comp.join(&SUBCOMPONENT_SEP.to_string()))
        .collect::<Vec<_>>()
        .join(&COMPONENT_SEP.to_string())
}

/// One legacy field value handed to the datatype conversion engine: the
/// declared structural type name plus component/sub-component data.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceValue {
    type_name: String,
    components: Repeat,
}

impl SourceValue {
    pub fn new(type_name: impl Into<String>, components: Repeat) -> Self {
        Self {
            type_name: type_name.into(),
            components,
        }
    }

    /// Split raw ER7 field text into components and sub-components.
    pub fn parse(type_name: impl Into<String>, raw: &str) -> Self {
        Self {
            type_name: type_name.into(),
            components: parse_field(raw).into_iter().next().unwrap_or_default(),
        }
    }

    pub fn scalar(type_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            components: vec![vec![text.into()]],
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whole-value ER7 text (components rejoined).
    pub fn raw(&self) -> String {
        encode_repeat(&self.components)
    }

    /// Component `index` (1-based), first sub-component, trimmed to `None`
    /// when blank.
    pub fn component(&self, index: usize) -> Option<&str> {
        self.subcomponent(index, 1)
    }

    /// Sub-component `sub` of component `index` (both 1-based).
    pub fn subcomponent(&self, index: usize, sub: usize) -> Option<&str> {
        if index == 0 || sub == 0 {
            return None;
        }
        let value = self.components.get(index - 1)?.get(sub - 1)?.trim();
        if value.is_empty() { None } else { Some(value) }
    }

    /// A scalar has at most one component with one sub-component.
    pub fn is_scalar(&self) -> bool {
        self.components.len() <= 1 && self.components.first().is_none_or(|c| c.len() <= 1)
    }

    pub fn is_empty(&self) -> bool {
        self.components
            .iter()
            .all(|c| c.iter().all(|s| s.trim().is_empty()))
    }

    /// Whether this value is the explicit deletion sentinel (`""`).
    pub fn is_deletion(&self) -> bool {
        self.is_scalar() && self.raw().trim() == DELETION_SENTINEL
    }

    /// Re-type this value, keeping the data (value-type overrides).
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }
}
