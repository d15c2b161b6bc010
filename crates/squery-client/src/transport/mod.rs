//! Line transports.
//!
//! The client never opens or closes a transport itself; it only sends and
//! reads whole lines through this trait.

use std::io;

mod scripted;
mod tcp;

pub use scripted::ScriptedTransport;
pub use tcp::TcpTransport;

/// A bidirectional line channel to a query server.
pub trait Transport {
    /// Send one line. The transport appends the line terminator.
    fn send_line(&mut self, line: &str) -> io::Result<()>;

    /// Read the next non-empty line, without its terminator.
    ///
    /// A non-blocking transport returns `Ok(None)` when no complete line is
    /// available yet. End of stream is an error.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Whether [`Transport::read_line`] waits for data.
    fn is_blocking(&self) -> bool;

    /// Switch between blocking and non-blocking reads.
    fn set_blocking(&mut self, blocking: bool) -> io::Result<()>;
}
