//! an incremental decoder for raw terminal bytes.

use super::Key;

const ESC: u8 = 0x1b;
const ETX: u8 = 0x03;

/// decodes a stream of raw terminal bytes into [`Key`]s, one byte at a time.
///
/// input arrives in arbitrarily sized chunks. sequences that straddle a chunk boundary, like an
/// arrow key split after its `ESC [`, or a multi-byte character, are held until they complete.
///
/// NB: a bare escape key and the start of an escape sequence begin with the same byte. an `ESC`
/// that is still pending once the input has gone quiet is taken to be the escape key, see
/// [`KeyDecoder::flush()`]. a chunk that filled the whole read buffer is not quiet; pass it to
/// [`KeyDecoder::feed()`] so that a sequence cut at the buffer's edge stays pending.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: State,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Ground,
    /// an `ESC` was seen.
    Escape,
    /// inside a control sequence, `ESC [`.
    Csi,
    /// inside a single shift sequence, `ESC O`.
    Ss3,
    /// inside a multi-byte utf-8 character.
    Utf8 { buf: [u8; 4], len: usize, need: usize },
}

// === impl KeyDecoder ===

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// decodes one chunk of input, after which no more input is waiting.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<Key> {
        let mut keys = self.feed(chunk);
        keys.extend(self.flush());
        keys
    }

    /// decodes one chunk of input that may be followed immediately by more.
    ///
    /// unlike [`KeyDecoder::decode()`], a trailing `ESC` stays pending.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Key> {
        let mut keys = Vec::with_capacity(chunk.len());
        for byte in chunk {
            self.push(*byte, &mut keys);
        }
        keys
    }

    /// feeds one byte to the decoder, appending any keys it completes.
    pub fn push(&mut self, byte: u8, keys: &mut Vec<Key>) {
        match std::mem::take(&mut self.state) {
            State::Ground => self.ground(byte, keys),
            State::Escape => match byte {
                b'[' => self.state = State::Csi,
                b'O' => self.state = State::Ss3,
                ESC => {
                    keys.push(Key::Esc);
                    self.state = State::Escape;
                }
                _ => {
                    keys.push(Key::Esc);
                    self.ground(byte, keys);
                }
            },
            State::Csi => match byte {
                // parameter and intermediate bytes, e.g. the `1;5` of a modified arrow.
                0x20..=0x3f => self.state = State::Csi,
                // an interrupted sequence; start over.
                ESC => self.state = State::Escape,
                _ => keys.extend(arrow(byte)),
            },
            State::Ss3 => match byte {
                ESC => self.state = State::Escape,
                _ => keys.extend(arrow(byte)),
            },
            State::Utf8 {
                mut buf,
                mut len,
                need,
            } => {
                if !is_continuation(byte) {
                    // a truncated character; drop it and start over with this byte.
                    return self.ground(byte, keys);
                }
                buf[len] = byte;
                len += 1;
                if len < need {
                    self.state = State::Utf8 { buf, len, need };
                } else if let Some(c) = std::str::from_utf8(&buf[..len])
                    .ok()
                    .and_then(|s| s.chars().next())
                {
                    keys.push(Key::Char(c));
                }
            }
        }
    }

    /// called once the input has gone quiet.
    ///
    /// a lone pending `ESC` becomes [`Key::Esc`]. partial control sequences and characters stay
    /// pending, to be completed by the next chunk.
    pub fn flush(&mut self) -> Option<Key> {
        match self.state {
            State::Escape => {
                self.state = State::Ground;
                Some(Key::Esc)
            }
            _ => None,
        }
    }

    fn ground(&mut self, byte: u8, keys: &mut Vec<Key>) {
        match byte {
            ESC => self.state = State::Escape,
            ETX => keys.push(Key::Interrupt),
            b'\r' | b'\n' => keys.push(Key::Enter),
            0x20..=0x7e => keys.push(Key::Char(byte as char)),
            _ => {
                if let Some(need) = utf8_width(byte) {
                    let mut buf = [0; 4];
                    buf[0] = byte;
                    self.state = State::Utf8 { buf, len: 1, need };
                }
                // other control bytes and stray continuation bytes are ignored.
            }
        }
    }
}

/// the final byte of an arrow key sequence.
fn arrow(byte: u8) -> Option<Key> {
    match byte {
        b'A' => Some(Key::Up),
        b'B' => Some(Key::Down),
        b'C' => Some(Key::Right),
        b'D' => Some(Key::Left),
        _ => None,
    }
}

/// the encoded length of a utf-8 character, given its leading byte.
fn utf8_width(byte: u8) -> Option<usize> {
    match byte {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(chunk: &[u8]) -> Vec<Key> {
        KeyDecoder::new().decode(chunk)
    }

    #[test]
    fn plain_characters() {
        assert_eq!(decode(b"qQ"), [Key::Char('q'), Key::Char('Q')]);
    }

    #[test]
    fn csi_arrows() {
        assert_eq!(decode(b"\x1b[A"), [Key::Up]);
        assert_eq!(
            decode(b"\x1b[B\x1b[C\x1b[D"),
            [Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn ss3_arrows() {
        assert_eq!(decode(b"\x1bOA\x1bOB"), [Key::Up, Key::Down]);
    }

    #[test]
    fn modified_arrows() {
        assert_eq!(decode(b"\x1b[1;5C"), [Key::Right]);
    }

    #[test]
    fn unknown_sequences_are_dropped() {
        // F5, then a plain key.
        assert_eq!(decode(b"\x1b[15~x"), [Key::Char('x')]);
    }

    #[test]
    fn lone_escape_at_chunk_end() {
        assert_eq!(decode(b"\x1b"), [Key::Esc]);
        assert_eq!(decode(b"q\x1b"), [Key::Char('q'), Key::Esc]);
    }

    #[test]
    fn escape_followed_by_other_bytes() {
        assert_eq!(decode(b"\x1b\x1b"), [Key::Esc, Key::Esc]);
        assert_eq!(decode(b"\x1bx"), [Key::Esc, Key::Char('x')]);
    }

    #[test]
    fn sequence_split_across_chunks() {
        let mut decoder = KeyDecoder::new();
        assert!(decoder.decode(b"\x1b[").is_empty());
        assert_eq!(decoder.decode(b"A"), [Key::Up]);
    }

    #[test]
    fn escape_at_the_edge_of_a_full_chunk_stays_pending() {
        let mut decoder = KeyDecoder::new();
        assert_eq!(decoder.feed(b"\x1b[B\x1b"), [Key::Down]);
        assert_eq!(decoder.decode(b"[B"), [Key::Down]);
    }

    #[test]
    fn escape_restarts_an_interrupted_sequence() {
        assert_eq!(decode(b"\x1b[\x1b[A"), [Key::Up]);
        assert_eq!(decode(b"\x1b[1;\x1b[B"), [Key::Down]);
        assert_eq!(decode(b"\x1bO\x1bOC"), [Key::Right]);
    }

    #[test]
    fn multibyte_characters() {
        assert_eq!(decode("é".as_bytes()), [Key::Char('é')]);
        assert_eq!(decode("→ü".as_bytes()), [Key::Char('→'), Key::Char('ü')]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let bytes = "é".as_bytes();
        let mut decoder = KeyDecoder::new();
        assert!(decoder.decode(&bytes[..1]).is_empty());
        assert_eq!(decoder.decode(&bytes[1..]), [Key::Char('é')]);
    }

    #[test]
    fn truncated_character_is_dropped() {
        assert_eq!(decode(&[0xc3, b'q']), [Key::Char('q')]);
    }

    #[test]
    fn control_bytes() {
        assert_eq!(decode(b"\x03"), [Key::Interrupt]);
        assert_eq!(decode(b"\r\n"), [Key::Enter, Key::Enter]);
        assert!(decode(b"\x00\x07\x7f").is_empty());
    }
}
