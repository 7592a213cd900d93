//! Common types used throughout the protocol

use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("payload buffer full: capacity {0} bytes")]
    BufferOverflow(usize),

    #[error("serial port error: {0}")]
    SerialError(#[from] std::io::Error),

    #[error("modem rejected {command:?}: expected \"OK\", got {response:?}")]
    CommandRejected {
        command: &'static str,
        response: String,
    },
}
