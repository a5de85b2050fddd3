//! Periodic sampling of OS counters into the metric table.

use std::time::Duration;

use crate::metrics::counters::HostCounters;
use crate::metrics::{MetricTable, MetricValue};

/// Owns the metric table and drives it from OS counter snapshots.
///
/// One sampler exists per process; the metrics job locks it for the whole
/// sample-and-publish tick, so ticks never interleave.
pub struct MetricSampler {
    counters: HostCounters,
    table: MetricTable,
    interval_secs: f64,
}

impl MetricSampler {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        MetricSampler {
            counters: HostCounters::new(),
            table: MetricTable::new(),
            interval_secs: interval.as_secs_f64(),
        }
    }

    /// Takes the startup sample that seeds `last_raw` for every metric, so
    /// the first scheduled publish reports a real interval instead of a
    /// delta from zero. Call once before the scheduler starts.
    pub fn seed(&mut self) {
        let snapshot = self.counters.snapshot();
        for (name, raw) in snapshot.pairs() {
            self.table.seed(name, raw);
        }
    }

    /// Samples every OS counter and returns the resulting report values.
    pub fn sample(&mut self) -> Vec<MetricValue> {
        let snapshot = self.counters.snapshot();
        for (name, raw) in snapshot.pairs() {
            self.table.record(name, raw, self.interval_secs);
        }
        self.table.snapshot()
    }

    #[must_use]
    pub fn table(&self) -> &MetricTable {
        &self.table
    }
}
