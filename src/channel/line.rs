//! Newline framing for the command protocol.
//!
//! Bytes go in one at a time; complete lines come out. A line ends at `\n`
//! and never contains it. Lines that overflow [`LINE_CAPACITY`] or are not
//! valid UTF-8 are still delivered once their `\n` arrives, but as an empty
//! line, so the dispatcher rejects them instead of acting on a fragment.
//!
//! Commands are classified trimmed, so padding never counts against the
//! capacity: leading whitespace is skipped, and whitespace arriving once the
//! line is full is dropped. Any other byte after that still overflows.

use heapless::{Deque, String, Vec};
use log::warn;

/// Longest accepted line, excluding the terminator.
pub const LINE_CAPACITY: usize = 64;

/// Completed lines held before the reader takes them.
pub const LINE_QUEUE_DEPTH: usize = 4;

/// One received line.
pub type Line = String<LINE_CAPACITY>;

pub struct LineBuffer {
    partial: Vec<u8, LINE_CAPACITY>,
    overflowed: bool,
    ready: Deque<Line, LINE_QUEUE_DEPTH>,
    dropped: u32,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            partial: Vec::new(),
            overflowed: false,
            ready: Deque::new(),
            dropped: 0,
        }
    }

    pub fn push_byte(&mut self, byte: u8) {
        if byte == b'\n' {
            self.finish_line();
            return;
        }
        if self.overflowed {
            return;
        }
        let padding = byte.is_ascii_whitespace();
        if padding && (self.partial.is_empty() || self.partial.is_full()) {
            return;
        }
        if self.partial.push(byte).is_err() {
            self.overflowed = true;
        }
    }

    pub fn push_bytes(&mut self, data: &[u8]) {
        for &b in data {
            self.push_byte(b);
        }
    }

    pub fn has_line(&self) -> bool {
        !self.ready.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ready.is_full()
    }

    pub fn pop_line(&mut self) -> Option<Line> {
        self.ready.pop_front()
    }

    /// Bytes received since the last `\n`.
    pub fn pending_bytes(&self) -> usize {
        self.partial.len()
    }

    /// Lines discarded because the ready queue was full.
    pub fn dropped_lines(&self) -> u32 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.partial.clear();
        self.overflowed = false;
        self.ready.clear();
    }

    fn finish_line(&mut self) {
        let mut line = Line::new();
        if self.overflowed {
            warn!("Line: exceeded {} bytes, discarded", LINE_CAPACITY);
        } else {
            match core::str::from_utf8(&self.partial) {
                // partial never holds more than LINE_CAPACITY bytes.
                Ok(text) => {
                    let _ = line.push_str(text);
                }
                Err(_) => warn!("Line: invalid UTF-8, discarded"),
            }
        }
        self.partial.clear();
        self.overflowed = false;

        if self.ready.push_back(line).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            warn!("Line: queue full, dropped a line");
        }
    }
}
