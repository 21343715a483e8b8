use {
    crate::source::{Clock, StatsSource},
    std::{
        collections::BTreeMap,
        io::{self, BufRead, BufReader},
        str::FromStr,
        time::Instant,
    },
};

pub use self::{
    cpu_time::{CpuTime, Measurement},
    user_hz::UserHz,
};

mod cpu_time;
mod user_hz;

#[cfg(test)]
mod tests;

/// the cpu lines of `/proc/stat`, read at a moment in time.
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// the `cpu` line, summed over every core.
    pub system: CpuTime,
    /// each `cpuN` line.
    pub cpus: BTreeMap<CpuId, CpuTime>,
    pub time: Instant,
}

/// one line of `/proc/stat`.
///
/// only the cpu lines are understood. see `proc_stat(5)` for the rest.
#[derive(Debug, Eq, PartialEq)]
pub enum Entry {
    /// the `cpu` line.
    AllCpu(CpuTime),
    /// a `cpuN` line.
    Cpu(CpuId, CpuTime),
    /// any other line, e.g. `intr`, `ctxt`, or `softirq`.
    Other,
}

/// the index of a logical cpu.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CpuId(u16);

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum EntryParseError {
    #[error("empty entry")]
    Empty,
    #[error("invalid cpu id in {kind:?}")]
    CpuIdParse { kind: String },
    #[error("invalid time value: {0}")]
    UserHzParse(<UserHz as FromStr>::Err),
    #[error("cpu entry has {0} time values, expected 4 to 10")]
    CpuTime(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum StatReadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Entry(#[from] EntryParseError),
    #[error("aggregate cpu entry is missing")]
    MissingAggregate,
}

// === impl Snapshot ===

impl Snapshot {
    /// reads the cpu lines from `stats`, stamped with the clock's current time.
    ///
    /// blank lines and lines about anything other than cpus are skipped.
    pub fn read(stats: &impl StatsSource, clock: &impl Clock) -> Result<Snapshot, StatReadError> {
        let time = clock.now();
        let reader = BufReader::new(stats.open()?);

        let mut system = None;
        let mut cpus = BTreeMap::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Entry>()? {
                Entry::AllCpu(time) => system = Some(time),
                Entry::Cpu(id, time) => {
                    cpus.insert(id, time);
                }
                Entry::Other => {}
            }
        }

        let system = system.ok_or(StatReadError::MissingAggregate)?;
        Ok(Snapshot { system, cpus, time })
    }
}

// === impl CpuId ===

impl CpuId {
    pub fn new(index: u16) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0.into()
    }
}

// === impl Entry ===

impl FromStr for Entry {
    type Err = EntryParseError;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split_ascii_whitespace();
        let kind = fields.next().ok_or(EntryParseError::Empty)?;

        let Some(suffix) = kind.strip_prefix("cpu") else {
            return Ok(Self::Other);
        };

        let times = fields
            .map(str::parse::<UserHz>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(EntryParseError::UserHzParse)?;
        let time = CpuTime::from_fields(&times)?;

        if suffix.is_empty() {
            return Ok(Self::AllCpu(time));
        }

        suffix
            .parse::<u16>()
            .map(|id| Self::Cpu(CpuId(id), time))
            .map_err(|_| EntryParseError::CpuIdParse {
                kind: kind.to_owned(),
            })
    }
}
