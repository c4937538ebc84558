//! Incremental command line parser.
//!
//! Bytes are fed one at a time. A `\n` or `\r` closes the current line;
//! the line is split into name, parameters and optional checksum, and
//! a valid frame is handed to the registered [`FrameHandler`] exactly
//! once. The handler's response is returned to the caller for writing.
//!
//! | Input | Effect |
//! |-------|--------|
//! | printable byte | appended, dropped silently once the buffer is full |
//! | `\b` | removes the last buffered byte |
//! | `\n` / `\r` on empty buffer | ignored |
//! | `\n` / `\r` otherwise | line parsed, buffer reset |
//!
//! A checksum section is verified against [`crc16`] of every byte
//! before the `;`. A missing, malformed or wrong checksum rejects the
//! line with `ERROR:CHECKSUM_MISMATCH` and the handler is not called.

use super::crc::crc16;
use super::frame::Frame;
use super::response::Response;
use maquette_common::consts::FRAME_BUFFER_CAPACITY;
use thiserror::Error;
use tracing::{debug, warn};

/// Receives every valid frame.
pub trait FrameHandler {
    /// Handle one frame and produce exactly one response.
    fn on_frame(&mut self, frame: &Frame) -> Response;
}

/// Reasons a complete line is rejected before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("checksum mismatch: computed {computed:04X}, received {received:?}")]
    ChecksumMismatch { computed: u16, received: Option<u32> },
}

impl FrameError {
    /// Protocol response for this rejection.
    pub fn response(&self) -> Response {
        match self {
            Self::ChecksumMismatch { .. } => Response::error("CHECKSUM_MISMATCH"),
        }
    }
}

/// Line-buffering parser with a fixed-capacity buffer.
#[derive(Debug, Default)]
pub struct CommandParser {
    buffer: heapless::Vec<u8, FRAME_BUFFER_CAPACITY>,
    frames_dispatched: u64,
    frames_rejected: u64,
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns the response when the byte completed a line.
    pub fn push_byte(&mut self, byte: u8, handler: &mut dyn FrameHandler) -> Option<Response> {
        match byte {
            b'\n' | b'\r' => {
                if self.buffer.is_empty() {
                    return None;
                }
                let response = match Self::parse_line(&self.buffer) {
                    Ok(frame) => {
                        debug!(name = %frame.name, params = ?frame.params, "frame");
                        self.frames_dispatched += 1;
                        handler.on_frame(&frame)
                    }
                    Err(e) => {
                        warn!(error = %e, "frame rejected");
                        self.frames_rejected += 1;
                        e.response()
                    }
                };
                self.buffer.clear();
                Some(response)
            }
            0x08 => {
                self.buffer.pop();
                None
            }
            _ => {
                // Full buffer: drop until the terminator arrives.
                let _ = self.buffer.push(byte);
                None
            }
        }
    }

    /// Feed a batch of bytes, collecting every response in order.
    pub fn push_bytes(&mut self, bytes: &[u8], handler: &mut dyn FrameHandler) -> Vec<Response> {
        bytes
            .iter()
            .filter_map(|&b| self.push_byte(b, handler))
            .collect()
    }

    /// Discard any partial line.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Bytes buffered for the current line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn frames_dispatched(&self) -> u64 {
        self.frames_dispatched
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Parse one complete line without its terminator.
    pub fn parse_line(line: &[u8]) -> Result<Frame, FrameError> {
        let (body, checksum) = match line.iter().position(|&b| b == b';') {
            Some(at) => (&line[..at], Some(&line[at + 1..])),
            None => (line, None),
        };

        if let Some(hex) = checksum {
            let computed = crc16(body);
            let received = parse_hex(hex);
            if received != Some(u32::from(computed)) {
                return Err(FrameError::ChecksumMismatch { computed, received });
            }
        }

        let text = String::from_utf8_lossy(body);
        let (name, params) = match text.split_once(':') {
            Some((name, rest)) if rest.trim().is_empty() => (name, Vec::new()),
            Some((name, rest)) => (name, rest.split(',').map(|p| p.trim().to_string()).collect()),
            None => (text.as_ref(), Vec::new()),
        };
        Ok(Frame::new(name.trim(), params, checksum.is_some()))
    }
}

/// Leading hexadecimal value, optional `0x` prefix, surrounding blanks ignored.
fn parse_hex(bytes: &[u8]) -> Option<u32> {
    let text = std::str::from_utf8(bytes).ok()?.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let end = text
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(text.len());
    if end == 0 || end > 8 {
        return None;
    }
    u32::from_str_radix(&text[..end], 16).ok()
}
