//! Counter and gauge storage

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe named counters and gauges
pub struct Metrics {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    gauges: RwLock<HashMap<String, Arc<AtomicI64>>>,
}

impl Metrics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
        }
    }

    /// Increment a counter
    pub fn counter(&self, name: &str, delta: u64) {
        let counters = self.counters.read();
        if let Some(c) = counters.get(name) {
            c.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        drop(counters);

        let mut counters = self.counters.write();
        let c = counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)));
        c.fetch_add(delta, Ordering::Relaxed);
    }

    /// Set a gauge value
    pub fn gauge(&self, name: &str, value: i64) {
        let gauges = self.gauges.read();
        if let Some(g) = gauges.get(name) {
            g.store(value, Ordering::Relaxed);
            return;
        }
        drop(gauges);

        let mut gauges = self.gauges.write();
        let g = gauges
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicI64::new(0)));
        g.store(value, Ordering::Relaxed);
    }

    /// Get a counter value
    pub fn get_counter(&self, name: &str) -> Option<u64> {
        self.counters
            .read()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
    }

    /// Get a gauge value
    pub fn get_gauge(&self, name: &str) -> Option<i64> {
        self.gauges
            .read()
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
    }

    /// All counter names and values
    pub fn all_counters(&self) -> Vec<(String, u64)> {
        self.counters
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
            .collect()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
