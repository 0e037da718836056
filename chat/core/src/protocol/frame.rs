//! Frame Decoder
//!
//! Splits the server-sent event stream into blank-line delimited frames.
//!
//! # Wire Format
//!
//! ```text
//! data: {"response":"Hi"}\n
//! \n
//! data: {"response":" there"}\n
//! \n
//! ```
//!
//! Chunks arrive in arbitrary sizes. The decoder keeps the unterminated
//! remainder between calls and never emits a frame before its terminating
//! blank line has been seen.
//!
//! # Text Decoding
//!
//! Bytes are decoded as UTF-8 incrementally: a multi-byte character split
//! across two chunks is held back until its remaining bytes arrive. Invalid
//! sequences become U+FFFD, matching a streaming `TextDecoder`.

use thiserror::Error;

/// Maximum frame size (1 MB)
///
/// A server that never terminates a frame would otherwise grow the buffer
/// without bound.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Minimum buffer capacity for the decoder
const MIN_BUFFER_CAPACITY: usize = 4096;

/// Frame separator after line-ending normalisation
const FRAME_SEPARATOR: &str = "\n\n";

/// Errors raised while decoding the event stream
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A frame grew past the size limit before its blank line arrived
    #[error("Frame size {size} exceeds maximum {max}")]
    TooLarge {
        /// Bytes buffered for the frame
        size: usize,
        /// Configured limit
        max: usize,
    },
}

/// One complete frame of the event stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    /// Create a frame from raw text (without its terminating blank line)
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Raw frame text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Incremental decoder for server-sent event frames
#[derive(Debug)]
pub struct SseFrameDecoder {
    /// Decoded, line-ending normalised text
    buffer: String,
    /// Start of the text not yet emitted as a frame
    read_pos: usize,
    /// No separator starts between `read_pos` and this offset
    scan_pos: usize,
    /// Trailing bytes of an incomplete UTF-8 sequence
    pending: Vec<u8>,
    /// A chunk ended in `\r` that may pair with a `\n` from the next one
    held_cr: bool,
    /// Largest frame accepted
    max_frame_size: usize,
}

impl Default for SseFrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseFrameDecoder {
    /// Create a new decoder with default buffer capacity
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Create a decoder with a custom frame size limit
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: String::with_capacity(MIN_BUFFER_CAPACITY),
            read_pos: 0,
            scan_pos: 0,
            pending: Vec::new(),
            held_cr: false,
            max_frame_size,
        }
    }

    /// Feed a chunk of bytes and drain every frame it completes
    ///
    /// Frames are returned in arrival order. Anything after the last blank
    /// line stays buffered for the next call. Only text appended since the
    /// previous call is scanned for separators.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] once a frame exceeds the size limit.
    /// The decoder is reset in that case.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, FrameError> {
        let text = self.decode_utf8(chunk);
        self.append_normalized(text);

        let mut frames = Vec::new();
        loop {
            self.skip_leading_newlines();
            let from = self.scan_pos;
            let Some(offset) = self.buffer[from..].find(FRAME_SEPARATOR) else {
                // A separator may start with the final '\n'
                self.scan_pos = if self.buffer.ends_with('\n') {
                    (self.buffer.len() - 1).max(self.read_pos)
                } else {
                    self.buffer.len()
                };
                break;
            };

            let end = from + offset;
            self.check_size(end - self.read_pos)?;
            frames.push(Frame(self.buffer[self.read_pos..end].to_string()));
            self.read_pos = end + FRAME_SEPARATOR.len();
            self.scan_pos = self.read_pos;
        }

        self.check_size(self.buffered_len())?;
        self.compact();
        Ok(frames)
    }

    /// Flush whatever is left once the stream has closed
    ///
    /// Returns the trailing unterminated frame, if any. Incomplete UTF-8 bytes
    /// are decoded lossily at this point since no more input will arrive.
    pub fn finish(&mut self) -> Option<Frame> {
        if std::mem::take(&mut self.held_cr) {
            self.buffer.push('\r');
        }
        if !self.pending.is_empty() {
            let tail = String::from_utf8_lossy(&self.pending).into_owned();
            self.buffer.push_str(&tail);
        }
        self.skip_leading_newlines();

        let text = self.buffer[self.read_pos..]
            .trim_end_matches(['\n', '\r'])
            .to_string();
        self.reset();
        if text.is_empty() {
            None
        } else {
            Some(Frame(text))
        }
    }

    /// Number of buffered bytes not yet emitted as frames
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.read_pos + self.pending.len() + usize::from(self.held_cr)
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer[self.read_pos..].trim_matches(['\n', '\r']).is_empty()
            && self.pending.is_empty()
            && !self.held_cr
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.read_pos = 0;
        self.scan_pos = 0;
        self.pending.clear();
        self.held_cr = false;
    }

    fn check_size(&mut self, size: usize) -> Result<(), FrameError> {
        if size > self.max_frame_size {
            self.reset();
            return Err(FrameError::TooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }

    /// Decode as much of the pending bytes as possible
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut text = String::new();
        let mut consumed = 0;
        loop {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    text.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(error) => {
                    let valid_end = consumed + error.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&self.pending[consumed..valid_end]) {
                        text.push_str(valid);
                    }
                    match error.error_len() {
                        Some(invalid_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + invalid_len;
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
        text
    }

    /// Append new text with `\r\n` folded to `\n`
    fn append_normalized(&mut self, text: String) {
        let mut text = if std::mem::take(&mut self.held_cr) {
            format!("\r{text}")
        } else {
            text
        };
        if text.ends_with('\r') {
            text.pop();
            self.held_cr = true;
        }
        if text.contains("\r\n") {
            text = text.replace("\r\n", "\n");
        }
        self.buffer.push_str(&text);
    }

    fn skip_leading_newlines(&mut self) {
        let rest = &self.buffer[self.read_pos..];
        self.read_pos += rest.len() - rest.trim_start_matches('\n').len();
        self.scan_pos = self.scan_pos.max(self.read_pos);
    }

    /// Drop emitted text from the front of the buffer
    fn compact(&mut self) {
        if self.read_pos > 0 {
            self.buffer.drain(..self.read_pos);
            self.scan_pos -= self.read_pos;
            self.read_pos = 0;
        }
    }
}
