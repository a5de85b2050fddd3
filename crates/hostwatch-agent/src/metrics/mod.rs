//! Metric state: the fixed catalog and the table of current values.
//!
//! The agent reports a fixed set of host metrics. **Absolute** metrics
//! (CPU, memory) report the latest raw sample as-is. **Relative** metrics
//! (disk, network) are cumulative OS counters converted to a per-second
//! rate over the sampling interval:
//!
//! ```text
//! report_value = (new_raw - last_raw) / interval_secs
//! ```
//!
//! The table is created once at startup from [`METRIC_CATALOG`]; after that
//! only values change. The sampler is the sole writer, the shipper takes
//! read-only snapshots, and both run inside the same serialized job tick.

pub mod counters;
pub mod sampler;
pub mod shipper;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Reported as the latest raw sample.
    Absolute,
    /// Reported as a rate derived from the delta between raw samples.
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Percent,
    Count,
    Bytes,
    BytesPerSecond,
    CountPerSecond,
}

impl MetricUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MetricUnit::Percent => "Percent",
            MetricUnit::Count => "Count",
            MetricUnit::Bytes => "Bytes",
            MetricUnit::BytesPerSecond => "Bytes/Second",
            MetricUnit::CountPerSecond => "Count/Second",
        }
    }
}

/// The full metric set, fixed for the process lifetime.
pub const METRIC_CATALOG: &[(&str, MetricUnit, MetricKind)] = &[
    ("cpu_usage", MetricUnit::Percent, MetricKind::Absolute),
    ("cpu_count", MetricUnit::Count, MetricKind::Absolute),
    ("mem_used", MetricUnit::Bytes, MetricKind::Absolute),
    ("mem_available", MetricUnit::Bytes, MetricKind::Absolute),
    ("mem_used_percent", MetricUnit::Percent, MetricKind::Absolute),
    ("disk_read_bytes", MetricUnit::BytesPerSecond, MetricKind::Relative),
    ("disk_write_bytes", MetricUnit::BytesPerSecond, MetricKind::Relative),
    ("disk_read_ops", MetricUnit::CountPerSecond, MetricKind::Relative),
    ("disk_write_ops", MetricUnit::CountPerSecond, MetricKind::Relative),
    ("net_bytes_in", MetricUnit::BytesPerSecond, MetricKind::Relative),
    ("net_bytes_out", MetricUnit::BytesPerSecond, MetricKind::Relative),
    ("net_packets_in", MetricUnit::CountPerSecond, MetricKind::Relative),
    ("net_packets_out", MetricUnit::CountPerSecond, MetricKind::Relative),
];

#[derive(Debug)]
struct Metric {
    name: &'static str,
    unit: MetricUnit,
    kind: MetricKind,
    last_raw: f64,
    report_value: f64,
}

/// A snapshot entry handed to the shipper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValue {
    pub name: &'static str,
    pub unit: MetricUnit,
    pub value: f64,
}

/// Current and derived values for every catalog metric.
#[derive(Debug)]
pub struct MetricTable {
    metrics: Vec<Metric>,
}

impl Default for MetricTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTable {
    /// Builds the table from [`METRIC_CATALOG`]. The name set never changes
    /// afterwards.
    #[must_use]
    pub fn new() -> Self {
        let metrics = METRIC_CATALOG
            .iter()
            .map(|&(name, unit, kind)| Metric {
                name,
                unit,
                kind,
                last_raw: 0.0,
                report_value: 0.0,
            })
            .collect();
        MetricTable { metrics }
    }

    /// Stores a raw sample for `name`, applying the metric's kind.
    ///
    /// Relative metrics whose counter went backwards (a reset) report zero
    /// for this interval and re-seed from the new raw value. Unknown names
    /// are ignored.
    pub fn record(&mut self, name: &str, raw: f64, interval_secs: f64) {
        let Some(metric) = self.metrics.iter_mut().find(|m| m.name == name) else {
            debug!("METRICS | Ignoring sample for unknown metric {}", name);
            return;
        };

        match metric.kind {
            MetricKind::Absolute => {
                metric.report_value = raw;
            }
            MetricKind::Relative => {
                if raw < metric.last_raw || interval_secs <= 0.0 {
                    metric.report_value = 0.0;
                } else {
                    metric.report_value = (raw - metric.last_raw) / interval_secs;
                }
            }
        }
        metric.last_raw = raw;
    }

    /// Seeds `last_raw` without producing a report value. Used for the
    /// startup sample so the first published rate covers a real interval
    /// instead of a delta from zero.
    pub fn seed(&mut self, name: &str, raw: f64) {
        if let Some(metric) = self.metrics.iter_mut().find(|m| m.name == name) {
            metric.last_raw = raw;
        }
    }

    /// Read-only snapshot of every report value, in catalog order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MetricValue> {
        self.metrics
            .iter()
            .map(|m| MetricValue {
                name: m.name,
                unit: m.unit,
                value: m.report_value,
            })
            .collect()
    }

    /// Current report value for a metric, if it exists.
    #[must_use]
    pub fn report_value(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.report_value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_catalog() {
        let table = MetricTable::new();
        assert_eq!(table.len(), METRIC_CATALOG.len());
        let snapshot = table.snapshot();
        for (value, &(name, unit, _)) in snapshot.iter().zip(METRIC_CATALOG) {
            assert_eq!(value.name, name);
            assert_eq!(value.unit, unit);
            assert_eq!(value.value, 0.0);
        }
    }

    #[test]
    fn test_absolute_reports_latest_raw() {
        let mut table = MetricTable::new();
        table.record("cpu_usage", 42.5, 300.0);
        assert_eq!(table.report_value("cpu_usage"), Some(42.5));

        table.record("cpu_usage", 17.0, 300.0);
        assert_eq!(table.report_value("cpu_usage"), Some(17.0));
    }

    #[test]
    fn test_relative_reports_rate_over_interval() {
        let mut table = MetricTable::new();
        table.seed("net_bytes_in", 1_000.0);
        table.record("net_bytes_in", 4_000.0, 300.0);
        assert_eq!(table.report_value("net_bytes_in"), Some(10.0));
    }

    #[test]
    fn test_relative_chains_between_samples() {
        let mut table = MetricTable::new();
        table.seed("disk_read_bytes", 0.0);
        table.record("disk_read_bytes", 600.0, 60.0);
        assert_eq!(table.report_value("disk_read_bytes"), Some(10.0));

        // The second interval is measured from the previous raw value
        table.record("disk_read_bytes", 1_800.0, 60.0);
        assert_eq!(table.report_value("disk_read_bytes"), Some(20.0));
    }

    #[test]
    fn test_counter_reset_reports_zero_and_reseeds() {
        let mut table = MetricTable::new();
        table.seed("net_packets_in", 9_000.0);
        table.record("net_packets_in", 100.0, 10.0);
        assert_eq!(table.report_value("net_packets_in"), Some(0.0));

        // Next interval resumes from the post-reset raw value
        table.record("net_packets_in", 200.0, 10.0);
        assert_eq!(table.report_value("net_packets_in"), Some(10.0));
    }

    #[test]
    fn test_seed_does_not_produce_report_value() {
        let mut table = MetricTable::new();
        table.seed("disk_write_ops", 5_000.0);
        assert_eq!(table.report_value("disk_write_ops"), Some(0.0));
    }

    #[test]
    fn test_unknown_metric_is_ignored() {
        let mut table = MetricTable::new();
        table.record("no_such_metric", 1.0, 10.0);
        assert_eq!(table.len(), METRIC_CATALOG.len());
        assert_eq!(table.report_value("no_such_metric"), None);
    }

    #[test]
    fn test_unit_strings() {
        assert_eq!(MetricUnit::Percent.as_str(), "Percent");
        assert_eq!(MetricUnit::BytesPerSecond.as_str(), "Bytes/Second");
        assert_eq!(MetricUnit::CountPerSecond.as_str(), "Count/Second");
    }
}
