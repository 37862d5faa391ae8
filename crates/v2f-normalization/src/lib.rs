pub mod merge;
pub mod rules;

pub use merge::normalize;
