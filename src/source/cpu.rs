use {
    super::{Clock, Probe, Source, SourceError, StatsSource},
    crate::{
        metric::{Metric, Reading},
        sentinel::Sentinel,
    },
};

/// per-core cpu load, measured from `/proc/stat` between consecutive ticks.
///
/// keys are core indices, plus `all` for the aggregate across every core.
pub struct CpuLoad<C, S> {
    sentinel: Sentinel<C, S>,
}

// === impl CpuLoad ===

impl<C: Clock, S: StatsSource> CpuLoad<C, S> {
    pub fn new(sentinel: Sentinel<C, S>) -> Self {
        Self { sentinel }
    }
}

impl<C: Clock, S: StatsSource> Source for CpuLoad<C, S> {
    fn id(&self) -> &str {
        "cpu.load"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let recording = self
            .sentinel
            .observe()
            .map_err(|error| SourceError::read("/proc/stat", error))?;

        let all = ("all".to_owned(), Metric::percentage(recording.system.percentage()));
        let cores = recording
            .cpus
            .iter()
            .map(|(id, m)| (id.index().to_string(), Metric::percentage(m.percentage())));

        Ok(Reading::Keyed(std::iter::once(all).chain(cores).collect()))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            rate::RateTracker,
            source::{MockClock, MockStatFile},
        },
        std::time::{Duration, Instant},
    };

    #[test]
    fn reports_each_core() {
        let t0 = Instant::now();
        let clock = MockClock::new((0..3).map(|i| t0 + Duration::from_secs(i)));
        let stats = MockStatFile::new([
            "cpu 0 0 0 0 0 0 0 0 0 0\ncpu0 0 0 0 0 0 0 0 0 0 0\ncpu1 0 0 0 0 0 0 0 0 0 0\n",
            "cpu 50 0 0 150 0 0 0 0 0 0\ncpu0 50 0 0 50 0 0 0 0 0 0\ncpu1 0 0 0 100 0 0 0 0 0 0\n",
        ]);
        let mut source = CpuLoad::new(Sentinel::new(clock, stats));
        let mut rates = RateTracker::new();
        let mut probe = Probe {
            now: t0,
            rates: &mut rates,
        };

        let first = source.sample(&mut probe).unwrap();
        let Reading::Keyed(first) = first else {
            panic!("cpu load should be keyed");
        };
        assert!(first.iter().all(|(_, m)| *m == Metric::Percentage(0.0)));

        let second = source.sample(&mut probe).unwrap();
        assert_eq!(
            second,
            Reading::Keyed(vec![
                ("all".to_owned(), Metric::Percentage(25.0)),
                ("0".to_owned(), Metric::Percentage(50.0)),
                ("1".to_owned(), Metric::Percentage(0.0)),
            ])
        );

        // the mock is exhausted, which looks like a missing file.
        assert!(source.sample(&mut probe).is_err());
    }
}
