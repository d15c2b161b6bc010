use std::collections::VecDeque;
use std::io;

use super::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Line(String),
    Idle,
}

/// A [`Transport`] that replays canned server lines and records every line
/// sent to it.
///
/// Reading past the end of the script is an `UnexpectedEof` error, so a test
/// that expects more input than it scripted fails instead of hanging.
///
/// ```rust
/// use squery_client::{ScriptedTransport, Transport};
///
/// let mut transport = ScriptedTransport::new().with_lines(["TS3", "error id=0 msg=ok"]);
/// transport.send_line("version").unwrap();
/// assert_eq!(transport.read_line().unwrap().as_deref(), Some("TS3"));
/// assert_eq!(transport.sent(), ["version"]);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    sent: Vec<String>,
    reads: usize,
    blocking: bool,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// An empty, blocking transport.
    pub fn new() -> Self {
        ScriptedTransport {
            script: VecDeque::new(),
            sent: Vec::new(),
            reads: 0,
            blocking: true,
        }
    }

    /// An empty, non-blocking transport.
    pub fn non_blocking() -> Self {
        ScriptedTransport {
            blocking: false,
            ..Self::new()
        }
    }

    /// Append lines to the script.
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script
            .extend(lines.into_iter().map(|l| Step::Line(l.into())));
        self
    }

    /// Append one line to the script.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.script.push_back(Step::Line(line.into()));
    }

    /// Append a read that finds nothing. Only meaningful when non-blocking;
    /// a blocking transport skips it.
    pub fn push_idle(&mut self) {
        self.script.push_back(Step::Idle);
    }

    /// Lines sent so far, in order.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Number of `read_line` calls so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of scripted steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Transport for ScriptedTransport {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        self.sent.push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.reads += 1;
        loop {
            match self.script.pop_front() {
                Some(Step::Line(line)) => return Ok(Some(line)),
                Some(Step::Idle) if self.blocking => continue,
                Some(Step::Idle) => return Ok(None),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "script exhausted",
                    ))
                }
            }
        }
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn set_blocking(&mut self, blocking: bool) -> io::Result<()> {
        self.blocking = blocking;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_and_record() {
        let mut transport = ScriptedTransport::new().with_lines(["a", "b"]);
        transport.send_line("x").unwrap();
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("a"));
        assert_eq!(transport.read_line().unwrap().as_deref(), Some("b"));
        assert_eq!(
            transport.read_line().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
        assert_eq!(transport.reads(), 3);
        assert_eq!(transport.sent(), ["x"]);
    }

    #[test]
    fn test_idle_steps() {
        let mut transport = ScriptedTransport::non_blocking();
        transport.push_idle();
        transport.push_line("notifycliententerview clid=1");
        assert_eq!(transport.read_line().unwrap(), None);
        assert!(transport.read_line().unwrap().is_some());

        let mut blocking = ScriptedTransport::new();
        blocking.push_idle();
        blocking.push_line("x");
        assert_eq!(blocking.read_line().unwrap().as_deref(), Some("x"));
        assert_eq!(blocking.remaining(), 0);
    }
}
