use {
    crate::{
        source::{Clock, ProcStatFile, StatsSource, SystemClock},
        stat::{CpuId, Measurement, Snapshot, StatReadError},
    },
    std::{collections::BTreeMap, time::Instant},
};

/// observes kernel statistics.
pub struct Sentinel<C = SystemClock, S = ProcStatFile> {
    /// the clock being used to measure time.
    clock: C,
    /// the underlying source of kernel statistics.
    source: S,
    /// the last observed snapshot, if any.
    last: Option<Snapshot>,
}

/// a recording of the system's cpu load.
#[derive(Clone, Debug)]
pub struct Recording {
    /// when the recording began.
    pub start: Instant,
    /// when the recording ended.
    pub end: Instant,
    /// how the system cpus spent their time, in aggregate.
    pub system: Measurement,
    /// how each cpu spent its time.
    pub cpus: BTreeMap<CpuId, Measurement>,
}

// === impl Sentinel ===

impl<C, S> Sentinel<C, S>
where
    C: Clock,
    S: StatsSource,
{
    /// creates a new [`Sentinel`].
    pub fn new(clock: C, source: S) -> Self {
        Self {
            clock,
            source,
            last: None,
        }
    }

    /// returns a [`Recording`] of cpu time since this was last called.
    ///
    /// NB: the first call has nothing to compare against, so it reports every cpu as idle.
    pub fn observe(&mut self) -> Result<Recording, StatReadError> {
        let Self {
            clock,
            source,
            last,
        } = self;

        let new = Snapshot::read(&*source, &*clock)?;
        let prev = last.replace(new.clone()).unwrap_or_else(|| new.clone());

        Ok(Recording::new(prev, new))
    }
}

// === impl Recording ===

impl Recording {
    fn new(
        Snapshot {
            system: system_a,
            cpus: cpus_a,
            time: time_a,
        }: Snapshot,
        Snapshot {
            system: system_b,
            cpus: cpus_b,
            time: time_b,
        }: Snapshot,
    ) -> Recording {
        let system = Measurement::new(&system_a, &system_b);

        // pair up each cpu with its previous reading. a cpu that was just brought online has no
        // previous reading, and is measured against itself.
        let cpus = cpus_b
            .into_iter()
            .map(|(id, times_b)| {
                let times_a = cpus_a.get(&id).unwrap_or(&times_b);
                (id, Measurement::new(times_a, &times_b))
            })
            .collect();

        Self {
            start: time_a,
            end: time_b,
            system,
            cpus,
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::source::{MockClock, MockStatFile},
        std::time::Duration,
    };

    const FIRST: &str = "\
cpu  100 0 100 800 0 0 0 0 0 0
cpu0 50 0 50 400 0 0 0 0 0 0
cpu1 50 0 50 400 0 0 0 0 0 0
";

    const SECOND: &str = "\
cpu  200 0 200 900 0 0 0 0 0 0
cpu0 150 0 50 400 0 0 0 0 0 0
cpu1 50 0 150 500 0 0 0 0 0 0
";

    fn sentinel(stats: &[&str]) -> Sentinel<MockClock, MockStatFile> {
        let t0 = Instant::now();
        let times = (0..stats.len() as u64).map(|i| t0 + Duration::from_secs(i));
        Sentinel::new(MockClock::new(times), MockStatFile::new(stats.iter().copied()))
    }

    #[test]
    fn first_observation_is_idle() {
        let mut sentinel = sentinel(&[FIRST]);
        let recording = sentinel.observe().unwrap();
        assert_eq!(recording.cpus.len(), 2);
        assert!(recording.cpus.values().all(|m| m.percentage() == 0.0));
        assert_eq!(recording.system.percentage(), 0.0);
    }

    #[test]
    fn second_observation_measures_the_interval() {
        let mut sentinel = sentinel(&[FIRST, SECOND]);
        sentinel.observe().unwrap();
        let recording = sentinel.observe().unwrap();

        let cpu0 = &recording.cpus[&CpuId::new(0)];
        let cpu1 = &recording.cpus[&CpuId::new(1)];
        assert_eq!(cpu0.percentage(), 100.0);
        assert_eq!(cpu1.percentage(), 50.0);
        // 200 busy ticks out of 300.
        assert!((recording.system.percentage() - 66.666).abs() < 0.01);
        assert!(recording.end > recording.start);
    }

    #[test]
    fn read_errors_propagate() {
        let mut sentinel = sentinel(&["cpu 1 2 3\n"]);
        assert!(sentinel.observe().is_err());
    }
}
