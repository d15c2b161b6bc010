use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use squery_protocol::LineCodec;
use tracing::{debug, trace};

use super::Transport;
use crate::config::ClientConfig;

const READ_CHUNK_SIZE: usize = 4096;

/// A [`Transport`] over a plain TCP connection.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    codec: LineCodec,
    blocking: bool,
    peer: String,
}

impl TcpTransport {
    /// Open a connection as described by `config`.
    ///
    /// Every resolved address is tried in turn; the last failure is returned
    /// if none accepts.
    pub fn connect(config: &ClientConfig) -> io::Result<Self> {
        let peer = config.address();
        let mut last_err = None;

        for addr in (config.host.as_str(), config.port).to_socket_addrs()? {
            let attempt = match config.timeout() {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    debug!("TcpTransport[{}]: connected via {}", peer, addr);
                    return Self::from_stream(stream, config);
                }
                Err(e) => {
                    debug!("TcpTransport[{}]: {} refused: {}", peer, addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {}", peer),
            )
        }))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, config: &ClientConfig) -> io::Result<Self> {
        stream.set_read_timeout(config.timeout())?;
        stream.set_write_timeout(config.timeout())?;
        stream.set_nodelay(true)?;
        stream.set_nonblocking(!config.blocking)?;

        Ok(TcpTransport {
            stream,
            codec: LineCodec::new(),
            blocking: config.blocking,
            peer: config.address(),
        })
    }

    /// The `host:port` this transport was opened for.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Transport for TcpTransport {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        trace!("TcpTransport[{}]: > {}", self.peer, line);
        self.stream.write_all(&LineCodec::encode_line(line))?;
        self.stream.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(line) = self.codec.decode_line()? {
                trace!("TcpTransport[{}]: < {}", self.peer, line);
                return Ok(Some(line));
            }

            match self.stream.read(&mut buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("connection to {} closed by the server", self.peer),
                    ))
                }
                Ok(n) => self.codec.push(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock && !self.blocking => {
                    return Ok(None)
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn set_blocking(&mut self, blocking: bool) -> io::Result<()> {
        self.stream.set_nonblocking(!blocking)?;
        self.blocking = blocking;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn local_config(port: u16, blocking: bool) -> ClientConfig {
        ClientConfig {
            blocking,
            ..ClientConfig::new("127.0.0.1", port)
        }
    }

    #[test]
    fn test_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"TS3\n\rWelcome\n\r").unwrap();
            let mut buf = [0u8; 64];
            let n = sock.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"whoami\n");
            sock.write_all(b"virtualserver_id=0\n\rerror id=0 msg=ok\n\r").unwrap();
        });

        let mut transport = TcpTransport::connect(&local_config(port, true)).unwrap();
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("TS3"));
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("Welcome"));
        transport.send_line("whoami").unwrap();
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("virtualserver_id=0"));
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("error id=0 msg=ok"));

        server.join().unwrap();
        let err = transport.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_invalid_utf8_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.write_all(b"client_nickname=ab\xffcd\n\rerror id=0 msg=ok\n\r").unwrap();
        });

        let mut transport = TcpTransport::connect(&local_config(port, true)).unwrap();
        let err = transport.read_line().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("error id=0 msg=ok"));
        server.join().unwrap();
    }

    #[test]
    fn test_non_blocking_read_reports_nothing_yet() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpTransport::connect(&local_config(port, false)).unwrap();
        let (_sock, _) = listener.accept().unwrap();

        assert!(!transport.is_blocking());
        assert_eq!(transport.read_line().unwrap(), None);

        transport.set_blocking(true).unwrap();
        assert!(transport.is_blocking());
        assert_eq!(transport.peer(), format!("127.0.0.1:{}", port));
    }
}
