//! Stream parser for newline-terminated gate link lines.
//!
//! The UART delivers bytes in arbitrary chunks. [`LineParser`] accumulates
//! them and yields complete lines, applying the framing rules of the link:
//!
//! - `\n` terminates a line
//! - a trailing `\r` and surrounding whitespace are trimmed
//! - empty lines are skipped
//! - lines longer than the maximum length are discarded whole
//! - invalid UTF-8 is decoded lossily
//!
//! # Usage
//!
//! ```
//! use autopark_protocol::LineParser;
//!
//! let mut parser = LineParser::new();
//! parser.feed(b"SLOT_OCC");
//! assert!(parser.next_line().is_none());
//!
//! parser.feed(b"UPIED\r\n\nSLOT_FREE\n");
//! let lines: Vec<_> = parser.drain_lines().collect();
//! assert_eq!(lines, ["SLOT_OCCUPIED", "SLOT_FREE"]);
//! ```

use bytes::{Buf, BytesMut};
use std::collections::VecDeque;

use autopark_core::constants::{LINE_TERMINATOR, MAX_LINE_LENGTH};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Parser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Accumulating bytes of the current line.
    Collecting,

    /// The current line already exceeded the maximum length. Bytes are
    /// dropped until the next terminator.
    Discarding,
}

/// Stateful line splitter.
///
/// ```text
/// ┌────────────┐  len > max, no '\n'   ┌────────────┐
/// │ Collecting │──────────────────────>│ Discarding │
/// └────────────┘                       └────────────┘
///       ^                                    │
///       └────────────── '\n' ────────────────┘
/// ```
#[derive(Debug)]
pub struct LineParser {
    buffer: BytesMut,
    state: ParserState,
    max_line_length: usize,
    lines: VecDeque<String>,
    discarded: u64,
}

impl LineParser {
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: ParserState::Collecting,
            max_line_length,
            lines: VecDeque::new(),
            discarded: 0,
        }
    }

    /// Feed raw bytes. Every line completed by these bytes is queued.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        loop {
            match self.buffer.iter().position(|&b| b == LINE_TERMINATOR) {
                Some(pos) => {
                    let raw = self.buffer.split_to(pos);
                    self.buffer.advance(1);
                    self.finish_line(&raw);
                }
                None => {
                    if payload_len(&self.buffer) > self.max_line_length {
                        self.buffer.clear();
                        self.state = ParserState::Discarding;
                    }
                    break;
                }
            }
        }
    }

    /// Flush a trailing unterminated line, as at end of stream.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let raw = self.buffer.split();
            self.finish_line(&raw);
        }
        self.state = ParserState::Collecting;
    }

    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Number of overlong lines dropped so far.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Drop buffered bytes and queued lines.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
        self.state = ParserState::Collecting;
    }

    pub fn drain_lines(&mut self) -> DrainLines<'_> {
        DrainLines { parser: self }
    }

    fn finish_line(&mut self, raw: &[u8]) {
        if self.state == ParserState::Discarding {
            self.state = ParserState::Collecting;
            self.discarded += 1;
            return;
        }
        if payload_len(raw) > self.max_line_length {
            self.discarded += 1;
            return;
        }

        let text = String::from_utf8_lossy(raw);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.lines.push_back(trimmed.to_string());
        }
    }
}

/// Length of a line without its CR, if it was sent CRLF-terminated.
fn payload_len(raw: &[u8]) -> usize {
    raw.strip_suffix(b"\r").unwrap_or(raw).len()
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`LineParser::drain_lines`].
pub struct DrainLines<'a> {
    parser: &'a mut LineParser,
}

impl Iterator for DrainLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_line()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.parser.lines_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainLines<'_> {}
