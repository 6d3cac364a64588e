//! Per-pass counters for job summaries.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe named counters, reset at the start of every job pass.
pub struct PassStats {
    counters: BTreeMap<&'static str, AtomicU64>,
}

impl PassStats {
    pub fn new(names: &[&'static str]) -> Self {
        let counters = names.iter().map(|&n| (n, AtomicU64::new(0))).collect();
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        self.add(name, 1);
    }

    /// Unknown names are ignored.
    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        for counter in self.counters.values() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// `name=value` pairs in name order, for a one-line log summary.
    pub fn summary(&self) -> String {
        self.counters
            .iter()
            .map(|(k, v)| format!("{k}={}", v.load(Ordering::Relaxed)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
