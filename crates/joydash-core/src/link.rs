use thiserror::Error;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct LinkStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub lines_read: u64,
    pub lines_written: u64,
    pub lines_discarded: u64,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serial port {port}: {message}")]
    Port { port: String, message: String },
    /// The peer went away or a finite link ran out of lines.
    #[error("link closed")]
    Closed,
}

/// Line-oriented, bidirectional transport between the handheld and the
/// vehicle model.
pub trait FrameLink: Send {
    /// Next complete line without its terminator, or `None` if nothing
    /// arrived within the link's read timeout.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, LinkError>;
    /// Send one line; `line` carries its own terminator.
    fn write_line(&mut self, line: &str) -> Result<(), LinkError>;
    fn stats(&self) -> LinkStats;
}
