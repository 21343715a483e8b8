//! the refresh loop, and the lifecycle around it.
//!
//! startup checks (privilege, then the first sample) happen before the terminal is touched, so
//! their messages land on an ordinary terminal. only then does the controller enter raw mode and
//! start listening for keys.

use {
    crate::{
        engine::{RequiredSourceError, SampleEngine},
        input::{InputListener, Key},
        metric::Snapshot,
        registry::Board,
        source::Clock,
        terminal::{RawMode, Terminal},
    },
    std::{
        io::{self, Read},
        sync::mpsc::{self, Receiver, Sender, TryRecvError},
        thread,
        time::{Duration, Instant},
    },
    tracing::{debug, error, info},
};

/// draws snapshots.
pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot, board: &Board) -> io::Result<()>;

    /// handles a key that does not stop the dashboard.
    fn key(&mut self, key: Key) {
        let _ = key;
    }
}

/// where the controller is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// how the dashboard exited.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitStatus {
    /// the user asked to quit.
    Clean,
    /// we are not root.
    Privilege,
    /// a required source could not be read at startup.
    RequiredSource,
    /// the terminal could not be set up, or drawn to.
    Terminal,
}

/// a precondition for running the dashboard was not met.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("insufficient privilege: rktop must run as root (effective uid is {euid})")]
    Privilege { euid: u32 },
    #[error(transparent)]
    RequiredSource(#[from] RequiredSourceError),
    #[error("could not set up the terminal: {0}")]
    Terminal(#[source] io::Error),
}

/// runs the dashboard.
pub struct Controller<C: Clock, T: Terminal, R: Renderer> {
    engine: SampleEngine<C>,
    board: Board,
    terminal: T,
    renderer: R,
    interval: Duration,
    require_root: bool,
    euid: fn() -> u32,
    phase: Phase,
    keys: Sender<Key>,
    pending: Receiver<Key>,
}

// === impl Controller ===

impl<C: Clock, T: Terminal, R: Renderer> Controller<C, T, R> {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(engine: SampleEngine<C>, board: Board, terminal: T, renderer: R) -> Self {
        let (keys, pending) = mpsc::channel();
        Self {
            engine,
            board,
            terminal,
            renderer,
            interval: Self::DEFAULT_INTERVAL,
            require_root: true,
            euid: effective_uid,
            phase: Phase::Starting,
            keys,
            pending,
        }
    }

    /// sets the refresh period.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// sets whether the dashboard refuses to start without root.
    pub fn require_root(mut self, require_root: bool) -> Self {
        self.require_root = require_root;
        self
    }

    /// a handle for injecting keys, e.g. from a signal handler.
    pub fn keys(&self) -> Sender<Key> {
        self.keys.clone()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// runs the dashboard until a quit key arrives, reading keys from `input`.
    pub fn run<I>(&mut self, input: I) -> ExitStatus
    where
        I: Read + Send + 'static,
    {
        let Self {
            engine,
            board,
            terminal,
            renderer,
            interval,
            require_root,
            euid,
            phase,
            keys,
            pending,
        } = self;

        Self::transition(phase, Phase::Starting);

        if *require_root {
            let euid = (*euid)();
            if euid != 0 {
                return Self::fail(phase, StartupError::Privilege { euid });
            }
        }

        let mut snapshot = match engine.tick() {
            Ok(snapshot) => snapshot,
            Err(error) => return Self::fail(phase, error.into()),
        };

        let guard = match RawMode::enter(&mut *terminal) {
            Ok(guard) => guard,
            Err(error) => return Self::fail(phase, StartupError::Terminal(error)),
        };
        if let Err(error) = InputListener::spawn(input, keys.clone()) {
            drop(guard);
            return Self::fail(phase, StartupError::Terminal(error));
        }

        Self::transition(phase, Phase::Running);
        let mut status = ExitStatus::Clean;
        let mut failure = None;
        loop {
            let started = Instant::now();

            if let Err(error) = renderer.render(&snapshot, board) {
                status = ExitStatus::Terminal;
                failure = Some(format!("could not draw the dashboard: {error}"));
                break;
            }

            if Self::drain(pending, renderer) {
                info!("quit requested");
                break;
            }

            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }

            snapshot = match engine.tick() {
                Ok(snapshot) => snapshot,
                // required sources only abort the first tick.
                Err(error) => {
                    status = ExitStatus::RequiredSource;
                    failure = Some(error.to_string());
                    break;
                }
            };
        }

        Self::transition(phase, Phase::Stopping);
        if let Err(error) = guard.restore() {
            error!(%error, "could not restore terminal");
            status = ExitStatus::Terminal;
        }
        Self::transition(phase, Phase::Stopped);

        if let Some(failure) = failure {
            error!(%failure, "dashboard stopped");
            eprintln!("rktop: {failure}");
        }
        status
    }

    /// hands every pending key to the renderer, returning true if one asked to quit.
    ///
    /// keys after a quit key are discarded.
    fn drain(pending: &Receiver<Key>, renderer: &mut R) -> bool {
        loop {
            match pending.try_recv() {
                Ok(key) if key.is_quit() => return true,
                Ok(key) => renderer.key(key),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn fail(phase: &mut Phase, error: StartupError) -> ExitStatus {
        Self::transition(phase, Phase::Stopped);
        error!(%error, "startup failed");
        eprintln!("rktop: {error}");
        error.status()
    }

    fn transition(phase: &mut Phase, next: Phase) {
        if *phase != next {
            debug!(from = ?*phase, to = ?next, "controller transition");
        }
        *phase = next;
    }
}

fn effective_uid() -> u32 {
    // SAFETY: `geteuid` has no preconditions, and always succeeds.
    unsafe { libc::geteuid() }
}

// === impl ExitStatus ===

impl ExitStatus {
    /// the process exit code.
    pub fn code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Privilege => 1,
            Self::RequiredSource => 2,
            Self::Terminal => 3,
        }
    }
}

// === impl StartupError ===

impl StartupError {
    pub fn status(&self) -> ExitStatus {
        match self {
            Self::Privilege { .. } => ExitStatus::Privilege,
            Self::RequiredSource(_) => ExitStatus::RequiredSource,
            Self::Terminal(_) => ExitStatus::Terminal,
        }
    }
}
