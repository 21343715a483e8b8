//! derives throughput from cumulative counters.

use std::{collections::HashMap, time::Instant};

/// converts successive observations of cumulative counters into rates.
///
/// exactly one baseline is retained per counter: each observation replaces the last, so memory
/// use is bounded by the number of distinct counters, not by uptime.
#[derive(Debug, Default)]
pub struct RateTracker {
    baselines: HashMap<String, CounterSample>,
}

/// the most recent observation of a counter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct CounterSample {
    value: u64,
    time: Instant,
}

// === impl RateTracker ===

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// records `value` for `counter` at `now`, returning the rate per second since the last
    /// observation.
    ///
    /// the first observation of a counter has no baseline and reports zero. a counter that went
    /// backwards (a reset, or a device that disappeared) also reports zero.
    pub fn rate(&mut self, counter: &str, value: u64, now: Instant) -> f64 {
        let current = CounterSample { value, time: now };

        let Some(previous) = self.baselines.get_mut(counter) else {
            self.baselines.insert(counter.to_owned(), current);
            return 0.0;
        };

        let previous = std::mem::replace(previous, current);
        let delta = value.saturating_sub(previous.value);
        let elapsed = now
            .checked_duration_since(previous.time)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        if elapsed <= 0.0 {
            return 0.0;
        }

        delta as f64 / elapsed
    }

    /// the number of counters with a retained baseline.
    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}
