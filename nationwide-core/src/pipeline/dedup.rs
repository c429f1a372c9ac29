//! VIN uniqueness across a run

use std::collections::HashSet;

/// Identifiers already processed in the current run
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, identifier: &str) -> bool {
        self.seen.contains(identifier)
    }

    pub fn mark(&mut self, identifier: &str) {
        self.seen.insert(identifier.to_string());
    }
}
