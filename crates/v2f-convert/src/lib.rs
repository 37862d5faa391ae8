pub mod address;
pub mod codes;
pub mod datetime;
pub mod engine;
pub mod identifier;
pub mod name;
pub mod numeric;
pub mod quantity;
pub mod telecom;
pub mod text;

pub use engine::{TargetType, convert};
