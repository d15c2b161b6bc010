//! The request/response synchronizer.
//!
//! [`QueryClient`] owns one [`Transport`] and runs one command at a time: it
//! sends the encoded line, drains the transport up to the status line, and
//! hands the buffered lines to the response decoder. Notifications that
//! arrive in between are extracted from the buffer and delivered to the
//! client's observers before the reply is returned.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use squery_metrics::{metric_defs, ConnectionLabels};
use squery_protocol::constants::{ERROR_SENTINEL, EVENT_PREFIX, SEPARATOR_CELL};
use squery_protocol::{prepare, Command, Dialect, Event, Param, Reply};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::{QueryError, QueryResult};
use crate::profiler::Profiler;
use crate::signals::{ConnectionInfo, Observer, SignalHub};
use crate::transport::{TcpTransport, Transport};

/// A synchronous query client bound to one transport.
#[derive(Debug)]
pub struct QueryClient<T: Transport> {
    pub(crate) transport: T,
    pub(crate) config: ClientConfig,
    dialect: Dialect,
    pub(crate) conn: ConnectionInfo,
    labels: ConnectionLabels,
    pub(crate) signals: SignalHub,
    profiler: Profiler,
    query_count: u64,
    last_issued_at: Option<DateTime<Utc>>,
}

impl QueryClient<TcpTransport> {
    /// Open a TCP connection as described by `config` and perform the
    /// handshake.
    pub fn connect_tcp(config: ClientConfig) -> QueryResult<Self> {
        config
            .validate()
            .map_err(|e| QueryError::Configuration(e.to_string()))?;
        let transport = TcpTransport::connect(&config)?;
        Self::connect(transport, config)
    }
}

impl<T: Transport> QueryClient<T> {
    /// Wrap a transport without any I/O.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        QueryClient {
            dialect: config.dialect(),
            conn: ConnectionInfo::new(config.host.clone(), config.port),
            labels: config.labels(),
            transport,
            config,
            signals: SignalHub::new(),
            profiler: Profiler::new(),
            query_count: 0,
            last_issued_at: None,
        }
    }

    /// Wrap a transport and perform the handshake.
    pub fn connect(transport: T, config: ClientConfig) -> QueryResult<Self> {
        config
            .validate()
            .map_err(|e| QueryError::Configuration(e.to_string()))?;
        let mut client = Self::new(transport, config);
        crate::adapter::Adapter::handshake(&mut client)?;
        Ok(client)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Send a raw command line and read its complete reply.
    ///
    /// With `throws` set, a non-zero status becomes
    /// [`QueryError::Protocol`], its message replaced by the configured
    /// custom message for the code if there is one; otherwise the failed
    /// reply is returned for the caller to inspect. Observers see every
    /// status line through `on_error`, successful ones included.
    pub fn request(&mut self, command: &str, throws: bool) -> QueryResult<Reply> {
        let verb = command.split(SEPARATOR_CELL).next().unwrap_or_default();

        if command.contains('\r') || command.contains('\n') {
            return Err(QueryError::Framing {
                command: verb.to_string(),
            });
        }
        let labels = self.command_labels(verb);
        if self.is_blocked(verb) {
            debug!("QueryClient[{}]: refusing blocked command '{}'", self.conn, verb);
            metrics::counter!(metric_defs::QUERY_BLOCKED.name, &labels).increment(1);
            return Err(QueryError::BlockedCommand {
                verb: verb.to_string(),
            });
        }

        self.signals.on_command_started(command);
        self.profiler.start();

        trace!("QueryClient[{}]: sending '{}'", self.conn, command);
        if let Err(e) = self.transport.send_line(command) {
            self.profiler.stop();
            return Err(e.into());
        }
        self.last_issued_at = Some(Utc::now());
        self.query_count += 1;
        metrics::counter!(metric_defs::QUERY_COMMANDS.name, &labels).increment(1);

        let lines = self.read_response();
        let elapsed = self.profiler.stop().unwrap_or_default();
        metrics::gauge!(metric_defs::QUERY_PROFILER_MEMORY.name, &self.labels.to_labels())
            .set(self.profiler.mem_usage().physical_mem as f64);
        let lines = lines?;
        metrics::histogram!(metric_defs::QUERY_COMMAND_TIME.name, &labels)
            .record(elapsed.as_micros() as f64);

        let reply = Reply::parse_with(&self.dialect, lines, command, throws)?;

        if !reply.error().is_ok() {
            debug!(
                "QueryClient[{}]: '{}' failed with id {}: {}",
                self.conn,
                verb,
                reply.error().id(),
                reply.error().msg()
            );
            metrics::counter!(metric_defs::QUERY_ERRORS.name, &labels).increment(1);
        }
        self.signals.on_error(&reply);
        for event in reply.events() {
            self.dispatch_event(event);
        }

        if throws && !reply.error().is_ok() {
            let name = match reply.error().failed_permid() {
                Some(permid) if permid != 0 => self.permission_name(permid),
                _ => None,
            };
            return Err(self.config.messages.apply(reply.to_error(|_| name)).into());
        }

        self.signals.on_command_finished(command, &reply);
        Ok(reply)
    }

    /// Encode `verb` with `params` and send it, raising on a failed status.
    pub fn execute(&mut self, verb: &str, params: &[Param]) -> QueryResult<Reply> {
        let command = prepare(verb, params);
        self.request(&command, true)
    }

    /// Send a built command, raising on a failed status.
    pub fn execute_command(&mut self, command: &Command) -> QueryResult<Reply> {
        self.request(&command.encode(), true)
    }

    /// Block until the next notification arrives and return it.
    ///
    /// Only available on a non-blocking transport, since a blocking one
    /// would never report idleness. Lines that are not notifications are
    /// discarded. Observers are told each time the wait-timeout interval
    /// passes without input.
    pub fn wait(&mut self) -> QueryResult<Event> {
        if self.transport.is_blocking() {
            return Err(QueryError::Configuration(
                "only available in non-blocking mode".to_string(),
            ));
        }

        let wait_timeout = self.config.wait_timeout();
        let mut idle_since = Instant::now();
        loop {
            match self.transport.read_line()? {
                Some(line) => {
                    self.count_line();
                    let head = line.split(SEPARATOR_CELL).next().unwrap_or_default();
                    if head.starts_with(EVENT_PREFIX) {
                        let event = Event::parse(&line)?;
                        self.dispatch_event(&event);
                        return Ok(event);
                    }
                    trace!("QueryClient[{}]: discarding '{}' while waiting", self.conn, line);
                    idle_since = Instant::now();
                }
                None => {
                    let idle = idle_since.elapsed();
                    if !wait_timeout.is_zero() && idle >= wait_timeout {
                        self.signals.on_wait_timeout(idle, &self.conn);
                        idle_since = Instant::now();
                    }
                    thread::sleep(self.config.idle_poll());
                }
            }
        }
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Number of commands sent so far.
    pub fn query_count(&self) -> u64 {
        self.query_count
    }

    /// When the last command was sent.
    pub fn last_issued_at(&self) -> Option<DateTime<Utc>> {
        self.last_issued_at
    }

    /// Total time spent waiting for replies.
    pub fn query_runtime(&self) -> Duration {
        self.profiler.runtime()
    }

    /// The runtime profiler.
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Check whether `verb` is refused locally.
    pub fn is_blocked(&self, verb: &str) -> bool {
        self.config.blocked_commands.iter().any(|b| b == verb)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The response dialect.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// The connection this client talks to.
    pub fn connection(&self) -> &ConnectionInfo {
        &self.conn
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.signals.subscribe(observer);
    }

    /// The observer hub, for per-type event subscriptions.
    pub fn signals_mut(&mut self) -> &mut SignalHub {
        &mut self.signals
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Read lines up to and including the status line.
    fn read_response(&mut self) -> QueryResult<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let Some(line) = self.read_line_polling()? else {
                continue;
            };
            let is_status = line.split(SEPARATOR_CELL).next() == Some(ERROR_SENTINEL);
            lines.push(line);
            if is_status {
                return Ok(lines);
            }
        }
    }

    /// Read one line, sleeping for the idle-poll interval when a
    /// non-blocking transport has nothing yet.
    pub(crate) fn read_line_polling(&mut self) -> QueryResult<Option<String>> {
        match self.transport.read_line()? {
            Some(line) => {
                self.count_line();
                Ok(Some(line))
            }
            None => {
                thread::sleep(self.config.idle_poll());
                Ok(None)
            }
        }
    }

    fn count_line(&self) {
        metrics::counter!(metric_defs::QUERY_LINES_READ.name, &self.labels.to_labels())
            .increment(1);
    }

    fn dispatch_event(&mut self, event: &Event) {
        trace!("QueryClient[{}]: event '{}'", self.conn, event.kind());
        let labels = self.labels.with(&[("kind", event.kind().to_string())]);
        metrics::counter!(metric_defs::QUERY_EVENTS.name, &labels).increment(1);
        self.signals.emit_event(event, &self.conn);
    }

    fn command_labels(&self, verb: &str) -> Vec<(&'static str, String)> {
        self.labels.with(&[("verb", verb.to_string())])
    }

    /// Resolve a permission id to its symbolic name with a non-throwing
    /// `permget`. Any failure yields `None`.
    fn permission_name(&mut self, permid: i64) -> Option<String> {
        let command = Command::new("permget").arg("permid", permid).encode();
        match self.request(&command, false) {
            Ok(reply) if reply.error().is_ok() => reply
                .indexed_by("permsid")
                .ok()?
                .first_key()
                .map(ToString::to_string),
            Ok(reply) => {
                debug!(
                    "QueryClient[{}]: permission {} not resolved: {}",
                    self.conn,
                    permid,
                    reply.error().msg()
                );
                None
            }
            Err(e) => {
                warn!("QueryClient[{}]: permission lookup failed: {}", self.conn, e);
                None
            }
        }
    }
}
