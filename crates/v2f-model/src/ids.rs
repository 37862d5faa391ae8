#![deny(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh resource and bundle identifiers.
///
/// The default generator produces time-ordered, lexicographically sortable
/// ids. Tests substitute [`SequentialIdGenerator`] to get deterministic
/// output.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Default generator backed by UUID v7 (time-ordered).
#[derive(Debug, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::now_v7().to_string()
    }
}

/// Deterministic generator for tests: `prefix-1`, `prefix-2`, ...
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{n}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_deterministic() {
        let generator = SequentialIdGenerator::new("res");
        assert_eq!(generator.next_id(), "res-1");
        assert_eq!(generator.next_id(), "res-2");
        assert_eq!(generator.next_id(), "res-3");
    }

    #[test]
    fn uuid_ids_sort_in_generation_order() {
        let generator = UuidGenerator;
        let a = generator.next_id();
        let b = generator.next_id();
        assert_ne!(a, b);
        assert!(a <= b, "v7 uuids are lexicographically time-ordered");
    }
}
