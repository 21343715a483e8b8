use super::*;

/// how a cpu has spent its time since boot, in the column order of `/proc/stat`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CpuTime {
    pub user: UserHz,
    /// user mode, at low priority.
    pub nice: UserHz,
    pub system: UserHz,
    pub idle: UserHz,
    /// waiting on i/o. unreliable, and may step backwards.
    pub iowait: UserHz,
    pub irq: UserHz,
    pub softirq: UserHz,
    /// time stolen by the hypervisor.
    pub steal: UserHz,
    pub guest: UserHz,
    pub guest_nice: UserHz,
}

/// busy and idle ticks elapsed between two [`CpuTime`]s.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Measurement {
    busy: UserHz,
    idle: UserHz,
}

// === impl CpuTime ===

impl CpuTime {
    /// the number of columns a modern kernel reports.
    const COLUMNS: usize = 10;

    /// builds a [`CpuTime`] from a line's columns.
    ///
    /// kernels older than 2.6.33 report fewer columns; those missing are zero.
    pub fn from_fields(fields: &[UserHz]) -> Result<Self, EntryParseError> {
        if !(4..=Self::COLUMNS).contains(&fields.len()) {
            return Err(EntryParseError::CpuTime(fields.len()));
        }

        let column = |i: usize| fields.get(i).copied().unwrap_or(UserHz::ZERO);
        Ok(Self {
            user: column(0),
            nice: column(1),
            system: column(2),
            idle: column(3),
            iowait: column(4),
            irq: column(5),
            softirq: column(6),
            steal: column(7),
            guest: column(8),
            guest_nice: column(9),
        })
    }

    /// the ticks spent doing anything but idling.
    ///
    /// iowait counts as busy, as `top(1)` does.
    ///
    /// NB: the kernel already folds guest time into user time, so it is not added again.
    pub fn busy(&self) -> UserHz {
        let Self {
            user,
            nice,
            system,
            iowait,
            irq,
            softirq,
            steal,
            ..
        } = *self;

        user + nice + system + iowait + irq + softirq + steal
    }
}

// === impl Measurement ===

impl Measurement {
    /// the ticks elapsed from `a` to `b`.
    pub fn new(a: &CpuTime, b: &CpuTime) -> Self {
        Self {
            busy: b.busy() - a.busy(),
            idle: b.idle - a.idle,
        }
    }

    /// returns the percentage of busy cpu time, in `[0, 100]`.
    ///
    /// an interval in which no ticks elapsed reports zero.
    pub fn percentage(&self) -> f64 {
        let Self { busy, idle } = *self;
        let percent = (busy / (busy + idle)) * 100.0;

        percent.clamp(0.0, 100.0)
    }
}
