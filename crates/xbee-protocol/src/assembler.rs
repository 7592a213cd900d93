//! Incremental frame assembly
//!
//! The assembler consumes the raw inbound byte stream one byte at a time and
//! reconstructs validated frames. It never blocks and keeps its progress
//! across calls, so the stream may be delivered in arbitrarily small pieces.
//! Anything that fails to parse (stray bytes, bad length, bad checksum) is
//! discarded and the assembler resynchronizes on the next start delimiter.

use crate::buffer::{PayloadBuffer, MAX_PAYLOAD_SIZE};
use crate::frame::{Frame, START_DELIMITER};
use crate::transport::Transport;

/// A validated inbound frame
///
/// The payload is copied out of the assembler's fixed buffer, so the value
/// stays valid regardless of later assembler calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame_type: u8,
    pub frame_id: u8,
    pub payload: Vec<u8>,
}

/// Position within the frame currently being assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Discarding bytes until a start delimiter appears
    Idle,
    /// Next byte is the high half of the declared length
    LengthHigh,
    /// Next byte completes the declared length
    LengthLow,
    FrameType,
    FrameId,
    Payload,
    Checksum,
}

/// Resumable frame decoder, one instance per receiver session
pub struct FrameAssembler {
    state: State,
    /// Declared length: frame_type + frame_id + payload byte count
    length: u16,
    frame_type: u8,
    frame_id: u8,
    payload: PayloadBuffer,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAssembler {
    /// Create a new assembler
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            length: 0,
            frame_type: 0,
            frame_id: 0,
            payload: PayloadBuffer::new(),
        }
    }

    /// Consume one byte from the stream
    ///
    /// Returns a frame when this byte completes one that verifies; `None`
    /// otherwise. An invalid frame is dropped silently and the next start
    /// delimiter begins a new attempt.
    pub fn feed_byte(&mut self, byte: u8) -> Option<ReceivedFrame> {
        match self.state {
            State::Idle => {
                if byte == START_DELIMITER {
                    self.state = State::LengthHigh;
                } else {
                    tracing::trace!("Discarding byte {:#04X} while resynchronizing", byte);
                }
            }
            State::LengthHigh => {
                self.length = u16::from(byte) << 8;
                self.state = State::LengthLow;
            }
            State::LengthLow => {
                self.length |= u16::from(byte);
                // A frame carries at least the type and id bytes, and its
                // payload must fit the fixed buffer. Anything else is
                // rejected here, before a single payload byte is stored.
                if self.length < 2 || usize::from(self.length) - 2 > MAX_PAYLOAD_SIZE {
                    tracing::warn!(
                        "Rejecting frame with declared length {} (payload capacity {})",
                        self.length,
                        MAX_PAYLOAD_SIZE
                    );
                    self.clear();
                } else {
                    self.state = State::FrameType;
                }
            }
            State::FrameType => {
                self.frame_type = byte;
                self.state = State::FrameId;
            }
            State::FrameId => {
                self.frame_id = byte;
                self.state = if self.length == 2 {
                    State::Checksum
                } else {
                    State::Payload
                };
            }
            State::Payload => {
                if self.payload.push(byte).is_err() {
                    // Unreachable after the header length check
                    self.clear();
                    return None;
                }
                if self.payload.len() == usize::from(self.length) - 2 {
                    self.state = State::Checksum;
                }
            }
            State::Checksum => {
                let valid = Frame::verify_checksum(
                    self.frame_type,
                    self.frame_id,
                    self.payload.as_slice(),
                    byte,
                );
                let result = if valid {
                    Some(ReceivedFrame {
                        frame_type: self.frame_type,
                        frame_id: self.frame_id,
                        payload: self.payload.as_slice().to_vec(),
                    })
                } else {
                    tracing::warn!(
                        "Checksum mismatch on frame type={:#04X} id={:#04X}, discarding",
                        self.frame_type,
                        self.frame_id
                    );
                    None
                };
                self.clear();
                return result;
            }
        }
        None
    }

    /// Feed a chunk of bytes and collect every frame completed within it
    pub fn feed(&mut self, data: &[u8]) -> Vec<ReceivedFrame> {
        let mut frames = Vec::new();
        for &byte in data {
            if let Some(frame) = self.feed_byte(byte) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drain bytes buffered on the transport until a frame completes or
    /// nothing is left to read. Never blocks; partial progress is kept for
    /// the next call, and a call with nothing available is a no-op.
    #[allow(clippy::missing_errors_doc)]
    pub fn poll<T: Transport>(
        &mut self,
        transport: &mut T,
    ) -> std::io::Result<Option<ReceivedFrame>> {
        while let Some(byte) = transport.read_byte()? {
            if let Some(frame) = self.feed_byte(byte) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Reset to a fresh state, discarding any partial frame
    pub fn clear(&mut self) {
        self.state = State::Idle;
        self.length = 0;
        self.frame_type = 0;
        self.frame_id = 0;
        self.payload.clear();
    }
}
