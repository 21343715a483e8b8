//! the npu runtime library's version, found by scanning the library with an external tool.
//!
//! spawning a process is slow, so this is meant to be wrapped in [`super::Cached`] and run once.

use {
    super::{Probe, Source, SourceError},
    crate::metric::Reading,
    std::{
        io::{self, Read},
        path::PathBuf,
        process::{Command, Stdio},
        thread,
        time::{Duration, Instant},
    },
    tracing::debug,
};

/// the version of `librknnrt.so`.
pub struct RuntimeVersion {
    /// the tool used to dump the library's strings.
    program: String,
    library: PathBuf,
    timeout: Duration,
}

/// the marker preceding the version in the library's embedded strings.
const MARKER: &str = "librknnrt version:";

/// returns the text following the first `librknnrt version:` marker.
pub fn parse_runtime_version(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (_, version) = line.split_once(MARKER)?;
        let version = version.trim();
        (!version.is_empty()).then(|| version.to_owned())
    })
}

/// runs `program` to completion, killing it if it outlives `timeout`.
///
/// stdout is drained on a helper thread so that a chatty child never blocks on a full pipe.
pub fn run_command(program: &str, args: &[&str], timeout: Duration) -> Result<String, SourceError> {
    const POLL: Duration = Duration::from_millis(10);

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => SourceError::not_available(program),
            _ => SourceError::read(program, error),
        })?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| SourceError::read(program, "stdout was not captured"))?;
    let reader = thread::spawn(move || {
        let mut out = Vec::new();
        stdout.read_to_end(&mut out).map(|_| out)
    });

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let out = reader
                    .join()
                    .map_err(|_| SourceError::read(program, "output reader panicked"))?
                    .map_err(|error| SourceError::read(program, error))?;
                if !status.success() {
                    return Err(SourceError::read(program, status));
                }
                return Ok(String::from_utf8_lossy(&out).into_owned());
            }
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SourceError::read(
                    program,
                    format!("timed out after {timeout:?}"),
                ));
            }
            Ok(None) => thread::sleep(POLL),
            Err(error) => return Err(SourceError::read(program, error)),
        }
    }
}

// === impl RuntimeVersion ===

impl RuntimeVersion {
    pub fn new(program: impl Into<String>, library: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            library: library.into(),
            timeout,
        }
    }
}

impl Source for RuntimeVersion {
    fn id(&self) -> &str {
        "npu.runtime"
    }

    fn sample(&mut self, _: &mut Probe<'_>) -> Result<Reading, SourceError> {
        let Self {
            program,
            library,
            timeout,
        } = self;

        if !library.exists() {
            return Err(SourceError::not_available(library.display().to_string()));
        }

        let library = library.display().to_string();
        let started = Instant::now();
        let output = run_command(program, &[&library], *timeout)?;
        debug!(elapsed = ?started.elapsed(), "scanned npu runtime library");

        parse_runtime_version(&output)
            .map(Reading::text)
            .ok_or_else(|| SourceError::read(library, "no version marker"))
    }
}
