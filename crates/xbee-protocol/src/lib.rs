//! XBee API-mode serial protocol implementation
//!
//! This crate implements the length-prefixed, checksummed framing protocol
//! used to exchange binary payloads with an XBee radio modem over a UART,
//! plus the AT command-mode exchanges used to configure it.

pub mod assembler;
pub mod buffer;
pub mod commands;
pub mod frame;
pub mod modem;
pub mod transport;
pub mod types;

pub use assembler::{FrameAssembler, ReceivedFrame};
pub use buffer::{PayloadBuffer, MAX_PAYLOAD_SIZE};
pub use commands::CommandTiming;
pub use frame::{Frame, START_DELIMITER};
pub use modem::XbeeModem;
pub use transport::{LoopbackTransport, MonitoredTransport, SerialTransport, Transport};
pub use types::ProtocolError;
