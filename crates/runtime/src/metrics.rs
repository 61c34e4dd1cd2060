use std::collections::BTreeMap;
use std::time::Duration;

/// Deterministic counters and latency histograms.
///
/// Uses sorted maps so snapshots have stable ordering regardless of the order
/// in which names were first recorded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    latencies: BTreeMap<&'static str, Histogram>,
}

/// Millisecond latency summary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum_ms: u64,
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Histogram {
    pub fn record(&mut self, value_ms: u64) {
        if self.count == 0 {
            self.min_ms = value_ms;
            self.max_ms = value_ms;
        } else {
            self.min_ms = self.min_ms.min(value_ms);
            self.max_ms = self.max_ms.max(value_ms);
        }
        self.count += 1;
        self.sum_ms = self.sum_ms.saturating_add(value_ms);
    }

    pub fn mean_ms(&self) -> Option<u64> {
        (self.count > 0).then(|| self.sum_ms / self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub latencies: Vec<(&'static str, Histogram)>,
}

impl MetricsSnapshot {
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .find(|(k, _)| *k == name)
            .map_or(0, |(_, v)| *v)
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.latencies.clear();
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn record_latency(&mut self, name: &'static str, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.latencies.entry(name).or_default().record(ms);
    }

    pub fn latency(&self, name: &str) -> Option<Histogram> {
        self.latencies.get(name).copied()
    }

    /// Stable, sorted snapshot suitable for logs.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            latencies: self.latencies.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Histogram, Metrics};
    use std::time::Duration;

    #[test]
    fn counters_accumulate() {
        let mut m = Metrics::new();
        m.inc("fetch.issued");
        m.add("fetch.issued", 2);
        assert_eq!(m.counter("fetch.issued"), 3);
        assert_eq!(m.counter("fetch.failed"), 0);
    }

    #[test]
    fn histogram_tracks_bounds_and_mean() {
        let mut h = Histogram::default();
        assert_eq!(h.mean_ms(), None);
        h.record(30);
        h.record(10);
        h.record(20);
        assert_eq!((h.count, h.sum_ms, h.min_ms, h.max_ms), (3, 60, 10, 30));
        assert_eq!(h.mean_ms(), Some(20));
    }

    #[test]
    fn snapshot_is_stably_sorted() {
        let mut m = Metrics::new();
        m.inc("fetch.issued");
        m.inc("fetch.applied");
        m.record_latency("latency.land-use", Duration::from_millis(5));
        m.record_latency("latency.claims", Duration::from_millis(7));

        let snap = m.snapshot();
        assert_eq!(snap.counters, vec![("fetch.applied", 1), ("fetch.issued", 1)]);
        assert_eq!(snap.latencies[0].0, "latency.claims");
        assert_eq!(snap.latencies[1].1.max_ms, 5);
    }
}
