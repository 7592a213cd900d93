//! Byte-stream transports for the protocol engine

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use serial2::SerialPort;

/// Default XBee UART baud rate
pub const BAUD_RATE: u32 = 9600;

/// Default read timeout for command-mode line reads
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Carriage return terminating command-mode response lines
const LINE_TERMINATOR: u8 = b'\r';

/// Byte-oriented transport the protocol engine runs over
pub trait Transport {
    /// Read the next buffered byte, or `None` when nothing is available.
    /// Never blocks.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write all bytes, blocking until the transport accepts them
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    fn flush(&mut self) -> io::Result<()>;

    /// Number of bytes currently buffered for reading
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Change the timeout used by blocking line reads
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Read an ASCII line up to (not including) a carriage return, blocking
    /// up to the current read timeout. A timeout yields whatever arrived.
    fn read_line(&mut self) -> io::Result<String>;
}

/// UART transport over a [`serial2::SerialPort`]
pub struct SerialTransport {
    port: SerialPort,
}

impl SerialTransport {
    /// Open a serial port at the given path and baud rate
    #[allow(clippy::missing_errors_doc)]
    pub fn open(path: &str, baud_rate: u32) -> io::Result<Self> {
        tracing::info!("Opening serial port {} at {} baud", path, baud_rate);
        let mut port = SerialPort::open(path, baud_rate)?;
        port.set_read_timeout(DEFAULT_READ_TIMEOUT)?;
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.bytes_available()? == 0 {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(None),
            Err(ref e) if e.raw_os_error() == Some(libc::EAGAIN) => Ok(None),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut count: libc::c_int = 0;
        // SAFETY: FIONREAD writes one c_int for a valid open descriptor
        let rc = unsafe { libc::ioctl(self.port.as_raw_fd(), libc::FIONREAD, &mut count) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(count as usize)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_read_timeout(timeout)
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) if byte[0] == LINE_TERMINATOR => break,
                Ok(_) => line.push(byte[0]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(ref e) if e.raw_os_error() == Some(libc::EAGAIN) => break,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Pass-through decorator mirroring every byte read from the inner transport
/// to an observer stream.
///
/// Lets a second port watch modem traffic while the protocol engine runs
/// undisturbed. Writes are forwarded without mirroring.
pub struct MonitoredTransport<T, W> {
    inner: T,
    listener: W,
}

impl<T: Transport, W: io::Write> MonitoredTransport<T, W> {
    pub fn new(inner: T, listener: W) -> Self {
        Self { inner, listener }
    }

    /// Give back the wrapped transport
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Transport, W: io::Write> Transport for MonitoredTransport<T, W> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.inner.read_byte()?;
        if let Some(b) = byte {
            // Mirroring is best effort; a slow listener must not stall the modem
            let _ = self.listener.write_all(&[b]);
        }
        Ok(byte)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        self.inner.bytes_available()
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.inner.set_read_timeout(timeout)
    }

    fn read_line(&mut self) -> io::Result<String> {
        let line = self.inner.read_line()?;
        let _ = self.listener.write_all(line.as_bytes());
        let _ = self.listener.write_all(&[LINE_TERMINATOR]);
        Ok(line)
    }
}

/// In-memory transport backed by byte queues, for tests and examples.
///
/// Bytes queued with [`push_incoming`](Self::push_incoming) come back out of
/// `read_byte` / `read_line`; everything the protocol writes is captured and
/// readable via [`written`](Self::written).
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    timeout_changes: Vec<Duration>,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be read by the protocol engine
    pub fn push_incoming(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Everything written so far
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.tx
    }

    /// Read-timeout values set over the transport's lifetime, oldest first
    #[must_use]
    pub fn timeout_changes(&self) -> &[Duration] {
        &self.timeout_changes
    }
}

impl Transport for LoopbackTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.rx.pop_front())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.rx.len())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout_changes.push(timeout);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<String> {
        let mut line = Vec::new();
        while let Some(byte) = self.rx.pop_front() {
            if byte == LINE_TERMINATOR {
                break;
            }
            line.push(byte);
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_read_line_stops_at_carriage_return() {
        let mut transport = LoopbackTransport::new();
        transport.push_incoming(b"OK\rERROR\r");
        assert_eq!(transport.read_line().unwrap(), "OK");
        assert_eq!(transport.read_line().unwrap(), "ERROR");
        assert_eq!(transport.read_line().unwrap(), "");
    }

    #[test]
    fn test_monitored_mirrors_reads_not_writes() {
        let mut inner = LoopbackTransport::new();
        inner.push_incoming(&[0x7E, 0x00]);
        let mut monitored = MonitoredTransport::new(inner, Vec::new());

        monitored.write_all(&[0xAA, 0xBB]).unwrap();
        assert_eq!(monitored.read_byte().unwrap(), Some(0x7E));
        assert_eq!(monitored.read_byte().unwrap(), Some(0x00));
        assert_eq!(monitored.read_byte().unwrap(), None);

        let inner = monitored.into_inner();
        assert_eq!(inner.written(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_monitored_listener_sees_read_bytes() {
        let mut inner = LoopbackTransport::new();
        inner.push_incoming(&[0x01, 0x02, 0x03]);
        let mut monitored = MonitoredTransport::new(inner, Vec::new());

        while monitored.read_byte().unwrap().is_some() {}
        let MonitoredTransport { listener, .. } = monitored;
        assert_eq!(listener, vec![0x01, 0x02, 0x03]);
    }
}
