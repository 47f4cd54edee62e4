//! Per-split instance numbering for dataset exports.

use std::collections::HashMap;

/// Hands out 1-based instance ids, counted separately for each split.
///
/// A counter can be seeded with the number of instances already written, so
/// appending to an existing export continues the numbering.
#[derive(Debug, Clone, Default)]
pub struct InstanceCounter {
    counts: HashMap<String, u32>,
}

impl InstanceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of instances already present in `split`.
    pub fn seed(&mut self, split: &str, existing: u32) {
        self.counts.insert(split.to_string(), existing);
    }

    pub fn next_id(&mut self, split: &str) -> u32 {
        let count = self.counts.entry(split.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, split: &str) -> u32 {
        self.counts.get(split).copied().unwrap_or(0)
    }

    /// Zero-padded id as used in exported file names.
    pub fn format_id(id: u32) -> String {
        format!("{id:04}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_are_counted_independently() {
        let mut counter = InstanceCounter::new();
        assert_eq!(counter.next_id("train"), 1);
        assert_eq!(counter.next_id("train"), 2);
        assert_eq!(counter.next_id("val"), 1);
        assert_eq!(counter.count("train"), 2);
        assert_eq!(counter.count("test"), 0);
    }

    #[test]
    fn test_seeded_counter_continues() {
        let mut counter = InstanceCounter::new();
        counter.seed("train", 41);
        assert_eq!(counter.next_id("train"), 42);
        assert_eq!(InstanceCounter::format_id(42), "0042");
        assert_eq!(InstanceCounter::format_id(12345), "12345");
    }
}
