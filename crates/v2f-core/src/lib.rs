//! Conversion core: the message dispatcher, parse context, field-mapping
//! registry, and the built-in segment processors.

pub mod context;
pub mod dispatch;
pub mod processors;
pub mod registry;

pub use context::ParseContext;
pub use dispatch::{ConverterOptions, MessageConverter};
pub use processors::{ProcessorFactory, SegmentProcessor};
pub use registry::FieldHandler;
