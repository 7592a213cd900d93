//! Fixed-capacity payload storage for inbound frame assembly

use crate::types::ProtocolError;

/// Maximum payload bytes a received frame may carry
pub const MAX_PAYLOAD_SIZE: usize = 64;

/// Fixed-capacity byte buffer with an explicit logical length.
///
/// Holds one frame's payload without per-frame allocation. Every write is
/// range-checked; a full buffer refuses further bytes instead of growing.
/// Bytes past the logical length are never read.
#[derive(Debug)]
pub struct PayloadBuffer {
    data: [u8; MAX_PAYLOAD_SIZE],
    len: usize,
}

impl Default for PayloadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_PAYLOAD_SIZE],
            len: 0,
        }
    }

    /// Append one byte
    ///
    /// # Errors
    /// Returns [`ProtocolError::BufferOverflow`] when the buffer is full.
    pub fn push(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if self.len == MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::BufferOverflow(MAX_PAYLOAD_SIZE));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// The bytes written so far
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reset the logical length; stored bytes are left in place
    pub fn clear(&mut self) {
        self.len = 0;
    }
}
