//! keyboard input.
//!
//! the [`InputListener`] reads raw bytes on its own thread, so that a blocking read never holds up
//! the refresh cadence. keys are delivered over a channel that the controller drains each tick.

use {
    std::{
        io::{self, Read},
        sync::mpsc::Sender,
        thread::{self, JoinHandle},
    },
    tracing::{debug, warn},
};

pub use self::decode::KeyDecoder;

mod decode;

/// a normalized keypress.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Char(char),
    Esc,
    Up,
    Down,
    Left,
    Right,
    Enter,
    /// ctrl-c, or a termination signal.
    Interrupt,
}

/// reads keys from a byte stream until it ends, or until nobody is listening.
pub struct InputListener;

// === impl Key ===

impl Key {
    /// whether this key asks the dashboard to stop.
    pub fn is_quit(&self) -> bool {
        matches!(
            self,
            Self::Char('q') | Self::Char('Q') | Self::Esc | Self::Interrupt
        )
    }
}

// === impl InputListener ===

impl InputListener {
    const CHUNK: usize = 64;

    /// spawns the listener thread.
    ///
    /// NB: the terminal must already be in raw mode, or reads will wait for a full line.
    pub fn spawn<R>(reader: R, keys: Sender<Key>) -> io::Result<JoinHandle<()>>
    where
        R: Read + Send + 'static,
    {
        thread::Builder::new()
            .name("input".to_owned())
            .spawn(move || Self::listen(reader, keys))
    }

    fn listen(mut reader: impl Read, keys: Sender<Key>) {
        let mut decoder = KeyDecoder::new();
        let mut buf = [0; Self::CHUNK];

        loop {
            let decoded = match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("input closed");
                    if let Some(key) = decoder.flush() {
                        let _ = keys.send(key);
                    }
                    return;
                }
                // a full buffer means more input may already be waiting.
                Ok(n) if n == buf.len() => decoder.feed(&buf),
                Ok(n) => decoder.decode(&buf[..n]),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    warn!(%error, "could not read input");
                    return;
                }
            };

            for key in decoded {
                if keys.send(key).is_err() {
                    debug!("input receiver dropped");
                    return;
                }
            }
        }
    }
}
