//! AT command and command-mode protocol definitions

use std::time::Duration;

/// Frame type reserved for local AT command frames
pub const AT_COMMAND_FRAME_TYPE: u8 = 0x08;
/// Frame id used for local AT command frames
pub const AT_COMMAND_FRAME_ID: u8 = 0x01;

/// Two-character AT command mnemonics
pub mod at {
    /// API enable (framed operation)
    pub const API_ENABLE: &[u8; 2] = b"AP";
    /// Shutdown
    pub const SHUTDOWN: &[u8; 2] = b"SD";
}

/// Guard token that switches the modem into command mode
pub const GUARD_SEQUENCE: &str = "+++";
/// Acknowledgement the modem sends for an accepted command
pub const ACK: &str = "OK";
/// Enable API mode 1
pub const CMD_API_MODE: &str = "ATAP 1\r";
/// Orderly shutdown from command mode
pub const CMD_SHUTDOWN: &str = "ATSD 0\r";
/// Leave command mode
pub const CMD_EXIT: &str = "CN\r";

/// Delays and timeouts for command-mode exchanges
///
/// Defaults match the modem's guard timing. Tests substitute zero delays so
/// exchanges against an in-memory transport finish immediately.
#[derive(Debug, Clone)]
pub struct CommandTiming {
    /// Silence required after the guard sequence before the modem answers
    pub guard_settle: Duration,
    /// Settling delay after a configuration command
    pub command_settle: Duration,
    /// Read timeout for ordinary acknowledgement lines
    pub response_timeout: Duration,
    /// Extended read timeout while waiting for the shutdown acknowledgement
    pub shutdown_timeout: Duration,
}

impl Default for CommandTiming {
    fn default() -> Self {
        Self {
            guard_settle: Duration::from_millis(1500),
            command_settle: Duration::from_millis(2000),
            response_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl CommandTiming {
    /// Zero delays, for driving exchanges against an in-memory transport
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            guard_settle: Duration::ZERO,
            command_settle: Duration::ZERO,
            response_timeout: Duration::ZERO,
            shutdown_timeout: Duration::ZERO,
        }
    }
}
