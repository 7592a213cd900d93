//! Device handle combining framed I/O and command-mode configuration

use std::thread;

use crate::assembler::{FrameAssembler, ReceivedFrame};
use crate::commands::{
    at, CommandTiming, ACK, AT_COMMAND_FRAME_ID, AT_COMMAND_FRAME_TYPE, CMD_API_MODE, CMD_EXIT,
    CMD_SHUTDOWN, GUARD_SEQUENCE,
};
use crate::frame::Frame;
use crate::transport::Transport;
use crate::types::ProtocolError;

/// Handle to an XBee modem on a byte-stream transport.
///
/// Framed traffic ([`send_frame`](Self::send_frame), [`poll`](Self::poll))
/// and command-mode exchanges ([`configure`](Self::configure),
/// [`shutdown_command_mode`](Self::shutdown_command_mode)) share the
/// transport but are never interleaved: each command-mode method is a
/// self-contained blocking exchange that enters and leaves command mode
/// before returning.
pub struct XbeeModem<T: Transport> {
    transport: T,
    assembler: FrameAssembler,
    timing: CommandTiming,
}

impl<T: Transport> XbeeModem<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timing(transport, CommandTiming::default())
    }

    pub fn with_timing(transport: T, timing: CommandTiming) -> Self {
        Self {
            transport,
            assembler: FrameAssembler::new(),
            timing,
        }
    }

    /// Send one framed payload
    #[allow(clippy::missing_errors_doc)]
    pub fn send_frame(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        frame.write_to(&mut self.transport)?;
        Ok(())
    }

    /// Send a local AT command as an API frame: the 2-byte mnemonic and its
    /// parameter form one payload under the reserved type/id bytes.
    #[allow(clippy::missing_errors_doc)]
    pub fn send_at_command(&mut self, command: &[u8; 2], param: &[u8]) -> Result<(), ProtocolError> {
        let mut payload = Vec::with_capacity(2 + param.len());
        payload.extend_from_slice(command);
        payload.extend_from_slice(param);
        self.send_frame(&Frame::new(
            AT_COMMAND_FRAME_TYPE,
            AT_COMMAND_FRAME_ID,
            payload,
        ))
    }

    /// Request an orderly modem shutdown via the framed SD command
    #[allow(clippy::missing_errors_doc)]
    pub fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.send_at_command(at::SHUTDOWN, &[0x00])
    }

    /// Drain any buffered inbound bytes; returns a frame when one completes.
    /// Never blocks, and keeps partial progress for the next call.
    #[allow(clippy::missing_errors_doc)]
    pub fn poll(&mut self) -> Result<Option<ReceivedFrame>, ProtocolError> {
        Ok(self.assembler.poll(&mut self.transport)?)
    }

    /// Switch the modem into API mode 1 through a command-mode exchange
    ///
    /// # Errors
    /// [`ProtocolError::CommandRejected`] when the modem answers anything
    /// but `OK`.
    pub fn configure(&mut self) -> Result<(), ProtocolError> {
        self.enter_command_mode()?;
        self.transport.write_all(CMD_API_MODE.as_bytes())?;
        thread::sleep(self.timing.command_settle);
        self.expect_ok(CMD_API_MODE)?;
        self.transport.write_all(CMD_EXIT.as_bytes())?;
        tracing::info!("Modem configured for API mode");
        Ok(())
    }

    /// Shut the modem down from command mode.
    ///
    /// The shutdown acknowledgement can take tens of seconds, so the read
    /// timeout is raised for that one line and restored afterwards.
    #[allow(clippy::missing_errors_doc)]
    pub fn shutdown_command_mode(&mut self) -> Result<(), ProtocolError> {
        self.enter_command_mode()?;
        self.transport.write_all(CMD_SHUTDOWN.as_bytes())?;
        self.transport
            .set_read_timeout(self.timing.shutdown_timeout)?;
        let response = self.transport.read_line()?;
        self.transport
            .set_read_timeout(self.timing.response_timeout)?;
        if response != ACK {
            tracing::warn!("Shutdown not acknowledged: {:?}", response);
            return Err(ProtocolError::CommandRejected {
                command: CMD_SHUTDOWN,
                response,
            });
        }
        self.transport.write_all(CMD_EXIT.as_bytes())?;
        Ok(())
    }

    /// Take back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn enter_command_mode(&mut self) -> Result<(), ProtocolError> {
        self.transport.write_all(GUARD_SEQUENCE.as_bytes())?;
        thread::sleep(self.timing.guard_settle);
        self.expect_ok(GUARD_SEQUENCE)
    }

    fn expect_ok(&mut self, command: &'static str) -> Result<(), ProtocolError> {
        let response = self.transport.read_line()?;
        if response != ACK {
            tracing::warn!("Command {:?} rejected: {:?}", command, response);
            return Err(ProtocolError::CommandRejected { command, response });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;
    use std::time::Duration;

    fn modem_with_responses(responses: &[u8]) -> XbeeModem<LoopbackTransport> {
        let mut transport = LoopbackTransport::new();
        transport.push_incoming(responses);
        XbeeModem::with_timing(transport, CommandTiming::immediate())
    }

    #[test]
    fn test_configure_exchange() {
        let mut modem = modem_with_responses(b"OK\rOK\r");
        modem.configure().unwrap();

        let transport = modem.into_transport();
        assert_eq!(transport.written(), b"+++ATAP 1\rCN\r");
    }

    #[test]
    fn test_configure_rejected_on_guard_failure() {
        let mut modem = modem_with_responses(b"ERROR\r");
        let err = modem.configure().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CommandRejected {
                command: GUARD_SEQUENCE,
                ..
            }
        ));

        // Aborted before the configuration command went out
        let transport = modem.into_transport();
        assert_eq!(transport.written(), b"+++");
    }

    #[test]
    fn test_configure_rejected_on_command_failure() {
        let mut modem = modem_with_responses(b"OK\rERROR\r");
        let err = modem.configure().unwrap_err();
        assert!(matches!(err, ProtocolError::CommandRejected { .. }));
    }

    #[test]
    fn test_shutdown_command_mode_raises_and_restores_timeout() {
        let mut transport = LoopbackTransport::new();
        transport.push_incoming(b"OK\rOK\r");
        let timing = CommandTiming {
            guard_settle: Duration::ZERO,
            command_settle: Duration::ZERO,
            ..CommandTiming::default()
        };
        let mut modem = XbeeModem::with_timing(transport, timing);
        modem.shutdown_command_mode().unwrap();

        let transport = modem.into_transport();
        assert_eq!(transport.written(), b"+++ATSD 0\rCN\r");
        assert_eq!(
            transport.timeout_changes(),
            &[Duration::from_secs(30), Duration::from_secs(1)]
        );
    }

    #[test]
    fn test_shutdown_frame_bytes() {
        let mut modem = modem_with_responses(&[]);
        modem.shutdown().unwrap();

        let transport = modem.into_transport();
        assert_eq!(
            transport.written(),
            &[0x7E, 0x00, 0x05, 0x08, 0x01, 0x53, 0x44, 0x00, 0x5F]
        );
    }

    #[test]
    fn test_at_command_payload_concatenation() {
        let mut modem = modem_with_responses(&[]);
        modem.send_at_command(at::API_ENABLE, &[0x01]).unwrap();

        let transport = modem.into_transport();
        // AP mnemonic + parameter under the reserved type/id bytes
        assert_eq!(&transport.written()[3..8], &[0x08, 0x01, 0x41, 0x50, 0x01]);
    }

    #[test]
    fn test_send_then_poll_roundtrip() {
        let frame = Frame::new(0x90, 0x00, b"telemetry".to_vec());
        let mut transport = LoopbackTransport::new();
        transport.push_incoming(&frame.serialize());

        let mut modem = XbeeModem::with_timing(transport, CommandTiming::immediate());
        let received = modem.poll().unwrap().expect("frame should complete");
        assert_eq!(received.frame_type, 0x90);
        assert_eq!(received.payload, b"telemetry");
        assert!(modem.poll().unwrap().is_none());
    }
}
