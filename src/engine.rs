//! turns a registry of sources into one snapshot per tick.

use {
    crate::{
        metric::{Metric, Snapshot},
        rate::RateTracker,
        registry::Registry,
        source::{Clock, Probe, SourceError, SystemClock},
    },
    tracing::{debug, info, warn},
};

/// samples every registered source, once per tick.
pub struct SampleEngine<C = SystemClock> {
    clock: C,
    registry: Registry,
    rates: RateTracker,
    /// whether each source succeeded on its last sample, in registry order.
    healthy: Vec<bool>,
    /// the number of ticks taken so far.
    ticks: u64,
}

/// a required source failed on the first tick.
#[derive(Debug, thiserror::Error)]
#[error("required source {id} is unreadable: {error}")]
pub struct RequiredSourceError {
    pub id: String,
    #[source]
    pub error: SourceError,
}

// === impl SampleEngine ===

impl<C: Clock> SampleEngine<C> {
    pub fn new(clock: C, registry: Registry) -> Self {
        let healthy = vec![true; registry.len()];
        Self {
            clock,
            registry,
            rates: RateTracker::new(),
            healthy,
            ticks: 0,
        }
    }

    /// samples every source, in registry order.
    ///
    /// a failing source contributes [`Metric::Unavailable`] under its id and never prevents other
    /// sources from being sampled. the one exception is a required source failing on the very
    /// first tick, which aborts startup.
    pub fn tick(&mut self) -> Result<Snapshot, RequiredSourceError> {
        let Self {
            clock,
            registry,
            rates,
            healthy,
            ticks,
        } = self;

        let now = clock.now();
        let first = *ticks == 0;
        let mut probe = Probe { now, rates };
        let mut metrics = Vec::with_capacity(registry.len());

        for (source, healthy) in registry.iter_mut().zip(healthy.iter_mut()) {
            let id = source.id().to_owned();
            match source.sample(&mut probe) {
                Ok(reading) => {
                    if !*healthy {
                        info!(source = %id, "source recovered");
                    }
                    *healthy = true;
                    metrics.extend(reading.flatten(&id));
                }
                Err(error) if first && source.required() => {
                    return Err(RequiredSourceError { id, error });
                }
                Err(error) => {
                    if *healthy {
                        match &error {
                            SourceError::NotAvailable { .. } => {
                                debug!(source = %id, %error, "source unavailable")
                            }
                            SourceError::Read { .. } => warn!(source = %id, %error, "source failed"),
                        }
                    }
                    *healthy = false;
                    metrics.push((id, Metric::Unavailable));
                }
            }
        }

        *ticks += 1;
        Ok(Snapshot::new(now, metrics))
    }

    /// the number of snapshots produced so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
