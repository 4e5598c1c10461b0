//! Incremental JSON object framer for fio's status stream.
//!
//! With `--status-interval` and `--output-format=json`, fio writes one
//! pretty-printed JSON object per interval to stdout, with no delimiter other
//! than the object's own braces and with log chatter interleaved between
//! objects. The framer tracks brace depth across fed input, skipping braces
//! that appear inside string literals, and hands out each top-level object as
//! soon as its closing brace arrives.
//!
//! Rules:
//! - Text outside an object (depth 0) is discarded, including a stray `}`.
//! - String state is only tracked inside an object, so a lone quote in log
//!   chatter cannot desynchronise the framer.
//! - A line boundary counts as a `\n`: feeding lines one by one gives the same
//!   frames as feeding them joined with `\n`.

use std::collections::VecDeque;

/// Default cap on a single object (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug)]
pub struct StatsFramer {
    buf: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
    oversized: bool,
    max_frame_bytes: usize,
    ready: VecDeque<String>,
    dropped: u64,
}

impl Default for StatsFramer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl StatsFramer {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: String::new(),
            depth: 0,
            in_string: false,
            escaped: false,
            oversized: false,
            max_frame_bytes: max_frame_bytes.max(2),
            ready: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Feed one line (without its terminator).
    ///
    /// Returns the oldest completed object, if any. When one line completes
    /// more than one object the rest are available from [`next_frame`].
    ///
    /// [`next_frame`]: StatsFramer::next_frame
    pub fn feed(&mut self, line: &str) -> Option<String> {
        self.push_str(line);
        self.push_str("\n");
        self.next_frame()
    }

    /// Feed an arbitrary chunk of the stream. Chunk boundaries do not matter.
    pub fn push_str(&mut self, chunk: &str) {
        for ch in chunk.chars() {
            self.push_char(ch);
        }
    }

    /// Pop the next completed object.
    pub fn next_frame(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    /// True while an object has been opened but not yet closed.
    pub fn in_frame(&self) -> bool {
        self.depth > 0
    }

    /// Number of objects discarded for exceeding the size cap.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    fn push_char(&mut self, ch: char) {
        if self.depth == 0 {
            if ch != '{' {
                return;
            }
            self.buf.clear();
            self.in_string = false;
            self.escaped = false;
            self.oversized = false;
            self.depth = 1;
            self.append(ch);
            return;
        }

        self.append(ch);

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return;
        }

        match ch {
            '"' => self.in_string = true,
            '{' => self.depth += 1,
            '}' => {
                self.depth -= 1;
                if self.depth == 0 {
                    self.complete();
                }
            }
            _ => {}
        }
    }

    fn append(&mut self, ch: char) {
        if self.oversized {
            return;
        }
        if self.buf.len() + ch.len_utf8() > self.max_frame_bytes {
            self.oversized = true;
            self.buf = String::new();
            return;
        }
        self.buf.push(ch);
    }

    fn complete(&mut self) {
        if self.oversized {
            self.dropped += 1;
            tracing::warn!(max = self.max_frame_bytes, "interval report exceeded size cap, dropped");
            self.oversized = false;
            return;
        }
        self.ready.push_back(std::mem::take(&mut self.buf));
    }
}
