//! telemetry sources.
//!
//! a [`Source`] is a named probe that produces a [`Reading`], or fails with a [`SourceError`].
//! sources never panic on a bad read; the sample engine decides what a failure means.

use {
    crate::{metric::Reading, rate::RateTracker},
    std::{
        fs::File,
        io::{self, BufReader, Read},
        path::{Path, PathBuf},
        time::Instant,
    },
};

pub use self::{clock::*, stats::*};

pub mod board;
pub mod cpu;
pub mod host;
pub mod runtime;

/// a named probe producing one reading per tick.
pub trait Source {
    /// the id under which this source's metrics are recorded.
    fn id(&self) -> &str;

    /// whether the dashboard refuses to start when this source fails on its first sample.
    fn required(&self) -> bool {
        false
    }

    /// samples the source.
    fn sample(&mut self, probe: &mut Probe<'_>) -> Result<Reading, SourceError>;
}

/// state threaded through every source during one tick.
pub struct Probe<'a> {
    /// the moment this tick began.
    pub now: Instant,
    /// baselines for cumulative counters.
    pub rates: &'a mut RateTracker,
}

/// a source failed to produce a reading.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// the underlying file, device, or tool does not exist here.
    #[error("{what} is not available")]
    NotAvailable { what: String },
    /// the data exists, but could not be read or understood.
    #[error("could not read {what}: {reason}")]
    Read { what: String, reason: String },
}

/// samples the inner source once, and replays that outcome on every later tick.
///
/// used for values that cannot change while we run (model strings, driver versions), and for
/// values that are expensive to obtain.
pub struct Cached<S> {
    inner: S,
    outcome: Option<Result<Reading, SourceError>>,
}

// === impl SourceError ===

impl SourceError {
    pub fn not_available(what: impl Into<String>) -> Self {
        Self::NotAvailable { what: what.into() }
    }

    pub fn read(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Read {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    /// classifies an i/o error raised while reading `path`.
    pub fn io(path: &Path, error: io::Error) -> Self {
        let what = path.display().to_string();
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotAvailable { what },
            _ => Self::read(what, error),
        }
    }
}

// === impl Cached ===

impl<S: Source> Cached<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            outcome: None,
        }
    }
}

impl<S: Source> Source for Cached<S> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn required(&self) -> bool {
        self.inner.required()
    }

    fn sample(&mut self, probe: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let Self { inner, outcome } = self;
        outcome.get_or_insert_with(|| inner.sample(probe)).clone()
    }
}

/// reads a whole file as raw bytes.
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>, SourceError> {
    std::fs::read(path).map_err(|error| SourceError::io(path, error))
}

/// reads a whole file as text.
pub(crate) fn read_text(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|error| SourceError::io(path, error))
}

mod clock {
    use super::*;

    pub trait Clock {
        fn now(&self) -> Instant;
    }

    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> Instant {
            Instant::now()
        }
    }

    /// a mock clock, replaying a fixed sequence of instants.
    #[cfg(test)]
    #[derive(Default)]
    pub struct MockClock {
        times: std::cell::RefCell<std::collections::VecDeque<Instant>>,
    }

    #[cfg(test)]
    impl MockClock {
        pub fn new(times: impl IntoIterator<Item = Instant>) -> Self {
            Self {
                times: std::cell::RefCell::new(times.into_iter().collect()),
            }
        }
    }

    #[cfg(test)]
    impl Clock for MockClock {
        fn now(&self) -> Instant {
            let MockClock { times } = self;

            times
                .borrow_mut()
                .pop_front()
                .expect("mock times should not be empty")
        }
    }
}

/// abstracts over providers of kernel statistics.
mod stats {
    use super::*;

    /// a source of kernel statistics.
    pub trait StatsSource {
        /// returns a reader.
        fn open(&self) -> io::Result<impl Read>;
    }

    /// stats backed by `/proc/stat`.
    #[derive(Clone, Debug)]
    pub struct ProcStatFile {
        path: PathBuf,
    }

    /// a mock stat source, replaying a fixed sequence of file contents.
    #[cfg(test)]
    #[derive(Default)]
    pub struct MockStatFile {
        stats: std::cell::RefCell<std::collections::VecDeque<String>>,
    }

    // === impl ProcStatFile ===

    impl StatsSource for ProcStatFile {
        fn open(&self) -> io::Result<impl Read> {
            File::open(&self.path).map(BufReader::new)
        }
    }

    impl ProcStatFile {
        pub const STAT: &str = "/proc/stat";

        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    impl Default for ProcStatFile {
        fn default() -> Self {
            Self::new(Self::STAT)
        }
    }

    // === impl MockStatFile ===

    #[cfg(test)]
    impl MockStatFile {
        pub fn new<S: Into<String>>(stats: impl IntoIterator<Item = S>) -> Self {
            Self {
                stats: std::cell::RefCell::new(stats.into_iter().map(Into::into).collect()),
            }
        }
    }

    #[cfg(test)]
    impl StatsSource for MockStatFile {
        fn open(&self) -> io::Result<impl Read> {
            let Self { stats } = self;

            stats
                .borrow_mut()
                .pop_front()
                .map(io::Cursor::new)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "mock stats exhausted"))
        }
    }
}
