//! typed metric values, and the snapshots that carry them.

use std::time::Instant;

/// a single typed telemetry value.
#[derive(Clone, Debug, PartialEq)]
pub enum Metric {
    /// a utilization, in `[0, 100]`.
    Percentage(f64),
    /// a quantity of bytes.
    Bytes(u64),
    /// a temperature, in whole degrees celsius.
    Temperature(i32),
    /// a throughput, in bytes per second.
    Rate(f64),
    /// free text, e.g. a version string.
    Text(String),
    /// the most demanding processes, ordered by cpu usage.
    Processes(Vec<ProcessRow>),
    /// the source could not produce a value this tick.
    Unavailable,
}

/// one row of the process table.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessRow {
    pub pid: u32,
    pub name: String,
    /// cpu usage, where 100 is one fully busy core.
    pub cpu: f32,
    /// resident memory, in bytes.
    pub memory: u64,
}

/// the outcome of sampling one source.
#[derive(Clone, Debug, PartialEq)]
pub enum Reading {
    /// one value, recorded under the source's own id.
    Single(Metric),
    /// a group of values, each recorded under `"{source id}.{key}"`.
    Keyed(Vec<(String, Metric)>),
}

/// every metric observed during one tick, in registry order.
///
/// snapshots are never mutated once built; the next tick produces a new one.
#[derive(Clone, Debug)]
pub struct Snapshot {
    time: Instant,
    metrics: Vec<(String, Metric)>,
}

// === impl Metric ===

impl Metric {
    /// a percentage, clamped into `[0, 100]`. `NaN` becomes zero.
    pub fn percentage(value: f64) -> Self {
        if value.is_nan() {
            return Self::Percentage(0.0);
        }
        Self::Percentage(value.clamp(0.0, 100.0))
    }

    /// a rate, clamped to be non-negative. `NaN` becomes zero.
    pub fn rate(value: f64) -> Self {
        if value.is_nan() {
            return Self::Rate(0.0);
        }
        Self::Rate(value.max(0.0))
    }

    pub fn as_percentage(&self) -> Option<f64> {
        match self {
            Self::Percentage(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<u64> {
        match self {
            Self::Bytes(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

// === impl Reading ===

impl Reading {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Single(Metric::Text(text.into()))
    }

    /// flattens this reading into `(id, metric)` pairs for the source named `id`.
    pub(crate) fn flatten(self, id: &str) -> Vec<(String, Metric)> {
        match self {
            Self::Single(metric) => vec![(id.to_owned(), metric)],
            Self::Keyed(metrics) => metrics
                .into_iter()
                .map(|(key, metric)| (format!("{id}.{key}"), metric))
                .collect(),
        }
    }
}

// === impl Snapshot ===

impl Snapshot {
    pub(crate) fn new(time: Instant, metrics: Vec<(String, Metric)>) -> Self {
        Self { time, metrics }
    }

    /// when this snapshot was captured.
    pub fn time(&self) -> Instant {
        self.time
    }

    /// returns the metric recorded under `id`, if any.
    pub fn get(&self, id: &str) -> Option<&Metric> {
        self.metrics
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, metric)| metric)
    }

    /// returns the metric recorded under `id`, treating a missing entry as unavailable.
    pub fn metric(&self, id: &str) -> &Metric {
        const UNAVAILABLE: &Metric = &Metric::Unavailable;
        self.get(id).unwrap_or(UNAVAILABLE)
    }

    /// iterates over every entry whose id lies beneath `prefix`, yielding the trailing key.
    ///
    /// for example, `"npu.load"` yields `("0", ..)`, `("1", ..)`, and so on.
    pub fn group<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a Metric)> {
        self.metrics.iter().filter_map(move |(id, metric)| {
            id.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|key| (key, metric))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metric)> {
        self.metrics.iter().map(|(id, metric)| (id.as_str(), metric))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
