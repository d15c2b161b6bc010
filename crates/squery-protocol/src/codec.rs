//! Line framing for byte streams.
//!
//! The query protocol terminates every line with `\n`; some servers send
//! `\n\r`, so stray carriage returns around a line are stripped. Empty lines
//! carry no information and are skipped. A line that is not valid UTF-8 is
//! dropped and reported as [`io::ErrorKind::InvalidData`].

use std::io;

use bytes::{Buf, BytesMut};

use crate::constants::SEPARATOR_LINE;

/// Initial capacity of the receive buffer.
pub const INITIAL_BUFFER_SIZE: usize = 4096;

/// A codec that splits a byte stream into protocol lines.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode one complete line from the buffer.
    ///
    /// Returns `None` if no complete non-empty line is buffered yet. The
    /// offending line is consumed before an encoding error is returned, so
    /// decoding can resume with the next one.
    pub fn decode_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let Some(end) = self.buffer.iter().position(|&b| b == SEPARATOR_LINE as u8) else {
                return Ok(None);
            };
            let line_data = self.buffer.split_to(end);
            self.buffer.advance(1);

            let line = std::str::from_utf8(&line_data)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let line = line.trim_matches('\r');
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Encode a line for transmission, appending the terminator.
    pub fn encode_line(line: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(SEPARATOR_LINE as u8);
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_line() {
        assert_eq!(LineCodec::encode_line("whoami"), b"whoami\n");
    }

    #[test]
    fn test_decode_lines() {
        let mut codec = LineCodec::new();
        codec.push(b"TS3\n\rWelcome\n\rerror id=0 msg=ok\n\r");

        assert_eq!(codec.decode_line().unwrap(), Some("TS3".to_string()));
        assert_eq!(codec.decode_line().unwrap(), Some("Welcome".to_string()));
        assert_eq!(codec.decode_line().unwrap(), Some("error id=0 msg=ok".to_string()));
        assert!(codec.decode_line().unwrap().is_none());
    }

    #[test]
    fn test_partial_line() {
        let mut codec = LineCodec::new();
        codec.push(b"error id=0");
        assert!(codec.decode_line().unwrap().is_none());
        assert_eq!(codec.buffered_len(), 10);

        codec.push(b" msg=ok\n");
        assert_eq!(codec.decode_line().unwrap(), Some("error id=0 msg=ok".to_string()));
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_skip_empty_lines() {
        let mut codec = LineCodec::new();
        codec.push(b"\n\r\n\rclid=1\n");
        assert_eq!(codec.decode_line().unwrap(), Some("clid=1".to_string()));
    }

    #[test]
    fn test_utf8_split_across_pushes() {
        let mut codec = LineCodec::new();
        let bytes = "name=Jürgen\n".as_bytes();
        codec.push(&bytes[..7]);
        assert!(codec.decode_line().unwrap().is_none());
        codec.push(&bytes[7..]);
        assert_eq!(codec.decode_line().unwrap(), Some("name=Jürgen".to_string()));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut codec = LineCodec::new();
        codec.push(b"client_nickname=ab\xffcd\nerror id=0 msg=ok\n");

        let err = codec.decode_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(codec.decode_line().unwrap(), Some("error id=0 msg=ok".to_string()));
    }
}
