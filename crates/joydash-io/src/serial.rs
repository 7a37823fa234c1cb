//! Serial-port link to the handheld controller.

use joydash_core::frame::MAX_LINE_LEN;
use joydash_core::{FrameLink, LinkError, LinkStats};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout: Duration,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Newline-framed link over any byte stream; in production a serial port.
pub struct SerialLink<P = Box<dyn SerialPort>> {
    port: P,
    name: String,
    recv_buf: Vec<u8>,
    stats: LinkStats,
}

impl SerialLink {
    /// Open and configure the port (8N1, no flow control).
    pub fn open(config: &SerialConfig) -> Result<Self, LinkError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| port_error(&config.port, e))?;

        info!(
            port = %config.port,
            baud_rate = config.baud_rate,
            read_timeout_ms = config.read_timeout.as_millis() as u64,
            "Serial port opened"
        );
        Ok(Self::from_stream(port, config.port.clone()))
    }
}

impl<P: Read + Write + Send> SerialLink<P> {
    pub fn from_stream(port: P, name: impl Into<String>) -> Self {
        Self {
            port,
            name: name.into(),
            recv_buf: Vec::with_capacity(MAX_LINE_LEN),
            stats: LinkStats::default(),
        }
    }

    /// Pop the next complete line out of the receive buffer.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.recv_buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.recv_buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        self.stats.lines_read += 1;
        Some(line)
    }
}

impl<P: Read + Write + Send> FrameLink for SerialLink<P> {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LinkError> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let mut temp = [0u8; 256];
        let n = match self.port.read(&mut temp) {
            Ok(0) => return Err(LinkError::Closed),
            Ok(n) => n,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Ok(None)
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => return Ok(None),
            Err(err) => return Err(LinkError::Io(err)),
        };
        self.stats.bytes_read += n as u64;
        self.recv_buf.extend_from_slice(&temp[..n]);

        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        if self.recv_buf.len() > MAX_LINE_LEN {
            warn!(
                port = %self.name,
                buffered = self.recv_buf.len(),
                "Discarding unterminated input"
            );
            self.recv_buf.clear();
            self.stats.lines_discarded += 1;
        }
        Ok(None)
    }

    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.port.write_all(line.as_bytes())?;
        self.port.flush()?;
        self.stats.bytes_written += line.len() as u64;
        self.stats.lines_written += 1;
        Ok(())
    }

    fn stats(&self) -> LinkStats {
        self.stats.clone()
    }
}

/// Names of serial ports visible to the OS.
pub fn available_ports() -> Result<Vec<String>, LinkError> {
    let ports = serialport::available_ports().map_err(|e| port_error("*", e))?;
    debug!(count = ports.len(), "Enumerated serial ports");
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

fn port_error(port: &str, err: serialport::Error) -> LinkError {
    LinkError::Port {
        port: port.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Port stand-in: each `read` hands out one queued chunk, then times out.
    #[derive(Default)]
    struct MockPort {
        chunks: VecDeque<io::Result<Vec<u8>>>,
        written: Vec<u8>,
    }

    impl MockPort {
        fn with_chunks(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
                written: Vec::new(),
            }
        }
    }

    impl Read for MockPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    impl Write for MockPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn reassembles_split_lines() {
        let port = MockPort::with_chunks(&[b"X1,", b"Y-2\r\nX3,Y4\n"]);
        let mut link = SerialLink::from_stream(port, "mock");

        assert_eq!(link.read_line().unwrap(), None);
        assert_eq!(link.read_line().unwrap(), Some(b"X1,Y-2".to_vec()));
        assert_eq!(link.read_line().unwrap(), Some(b"X3,Y4".to_vec()));
        assert_eq!(link.read_line().unwrap(), None);
        assert_eq!(link.stats().lines_read, 2);
        assert_eq!(link.stats().bytes_read, 14);
    }

    #[test]
    fn timeout_is_not_an_error() {
        let mut link = SerialLink::from_stream(MockPort::default(), "mock");
        assert_eq!(link.read_line().unwrap(), None);
    }

    #[test]
    fn eof_closes_link() {
        let port = MockPort::with_chunks(&[b""]);
        let mut link = SerialLink::from_stream(port, "mock");
        assert!(matches!(link.read_line(), Err(LinkError::Closed)));
    }

    #[test]
    fn hard_io_error_propagates() {
        let mut port = MockPort::default();
        port.chunks
            .push_back(Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged")));
        let mut link = SerialLink::from_stream(port, "mock");
        assert!(matches!(link.read_line(), Err(LinkError::Io(_))));
    }

    #[test]
    fn drops_runaway_input() {
        let noise = vec![b'#'; 200];
        let port = MockPort::with_chunks(&[noise.as_slice(), noise.as_slice(), b"X0,Y0\n"]);
        let mut link = SerialLink::from_stream(port, "mock");

        assert_eq!(link.read_line().unwrap(), None);
        assert_eq!(link.read_line().unwrap(), None);
        assert_eq!(link.stats().lines_discarded, 1);
        assert_eq!(link.read_line().unwrap(), Some(b"X0,Y0".to_vec()));
    }

    #[test]
    fn writes_whole_lines() {
        let mut link = SerialLink::from_stream(MockPort::default(), "mock");
        link.write_line("22,5,99\n").unwrap();

        assert_eq!(link.port.written, b"22,5,99\n");
        assert_eq!(link.stats().lines_written, 1);
        assert_eq!(link.stats().bytes_written, 8);
    }
}
