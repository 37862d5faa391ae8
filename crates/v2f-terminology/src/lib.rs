pub mod naming;
pub mod tables;

pub use naming::{SystemLookup, normalize_system};
pub use tables::{CodeTable, table};
