//! XBee API frame structure and checksum handling

use crate::transport::Transport;

/// Start delimiter marking the beginning of every API frame
pub const START_DELIMITER: u8 = 0x7E;

/// XBee API frame
///
/// Wire format:
/// ```text
/// [Start delimiter: 0x7E]
/// [Length: 2 bytes BE] (frame_type + frame_id + payload, NOT including checksum)
/// [Frame Type: 1 byte]
/// [Frame ID: 1 byte]
/// [Payload: length - 2 bytes]
/// [Checksum: 1 byte]
/// ```
///
/// There is no byte-stuffing: `0x7E` may legally occur inside a payload, and
/// the receiver relies on the length field once inside a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u8,
    pub frame_id: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame
    #[must_use]
    pub fn new(frame_type: u8, frame_id: u8, payload: Vec<u8>) -> Self {
        Self {
            frame_type,
            frame_id,
            payload,
        }
    }

    /// Serialize frame to wire bytes
    #[must_use]
    #[allow(clippy::missing_panics_doc)] // Panic only on protocol-violating payload size
    pub fn serialize(&self) -> Vec<u8> {
        // length = frame_type(1) + frame_id(1) + payload
        // Note: length does NOT include the start delimiter or the checksum
        let length =
            u16::try_from(2 + self.payload.len()).expect("payload exceeds protocol maximum");

        let mut data = Vec::with_capacity(length as usize + 4);

        data.push(START_DELIMITER);
        data.extend_from_slice(&length.to_be_bytes());
        data.push(self.frame_type);
        data.push(self.frame_id);
        data.extend_from_slice(&self.payload);
        data.push(Self::checksum(self.frame_type, self.frame_id, &self.payload));

        data
    }

    /// Serialize and write the frame through the transport
    #[allow(clippy::missing_errors_doc)]
    pub fn write_to<T: Transport>(&self, transport: &mut T) -> std::io::Result<()> {
        tracing::debug!(
            "Sending frame: type={:#04X} id={:#04X} payload_len={}",
            self.frame_type,
            self.frame_id,
            self.payload.len()
        );
        transport.write_all(&self.serialize())?;
        transport.flush()
    }

    /// Calculate the 8-bit additive complement checksum over type, id and payload
    #[must_use]
    pub fn checksum(frame_type: u8, frame_id: u8, payload: &[u8]) -> u8 {
        let sum = payload
            .iter()
            .fold(frame_type.wrapping_add(frame_id), |acc, &b| {
                acc.wrapping_add(b)
            });
        0xFF - sum
    }

    /// Verify a received checksum: type, id, payload and checksum byte must
    /// sum to 0xFF
    #[must_use]
    pub fn verify_checksum(frame_type: u8, frame_id: u8, payload: &[u8], received: u8) -> bool {
        let sum = payload.iter().fold(
            frame_type.wrapping_add(frame_id).wrapping_add(received),
            |acc, &b| acc.wrapping_add(b),
        );
        sum == 0xFF
    }
}
