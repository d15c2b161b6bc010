//! Observer notifications.
//!
//! The client reports its lifecycle, every command and every decoded
//! notification to the observers registered on its [`SignalHub`]. All
//! callbacks run synchronously on the caller's thread, in registration
//! order.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use squery_protocol::{Event, Reply};

/// Identifies the connection a notification came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Server host name or address.
    pub host: String,
    /// Query port.
    pub port: u16,
}

impl ConnectionInfo {
    /// Describe a connection.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ConnectionInfo {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Receives client notifications. Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait Observer {
    /// The handshake succeeded.
    fn on_connected(&mut self, conn: &ConnectionInfo) {}

    /// The client was torn down.
    fn on_disconnected(&mut self, conn: &ConnectionInfo) {}

    /// A command is about to be sent.
    fn on_command_started(&mut self, command: &str) {}

    /// A command completed without raising.
    fn on_command_finished(&mut self, command: &str, reply: &Reply) {}

    /// A notification was decoded.
    fn on_event(&mut self, event: &Event, conn: &ConnectionInfo) {}

    /// A notification was decoded; `kind` is its type, e.g. `textmessage`.
    fn on_typed_event(&mut self, kind: &str, event: &Event, conn: &ConnectionInfo) {}

    /// A status line was read. Fires for every reply, `id=0` included;
    /// check `reply.error().is_ok()` to tell failures apart.
    fn on_error(&mut self, reply: &Reply) {}

    /// `wait` has been idle for `idle`.
    fn on_wait_timeout(&mut self, idle: Duration, conn: &ConnectionInfo) {}
}

type EventHandler = Box<dyn FnMut(&Event, &ConnectionInfo)>;

/// Fan-out of notifications to registered observers and per-type event
/// handlers.
#[derive(Default)]
pub struct SignalHub {
    observers: Vec<Box<dyn Observer>>,
    handlers: HashMap<String, Vec<EventHandler>>,
}

impl fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHub")
            .field("observers", &self.observers.len())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SignalHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Register a handler for one event type, e.g. `textmessage`.
    pub fn subscribe_event<F>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: FnMut(&Event, &ConnectionInfo) + 'static,
    {
        self.handlers
            .entry(kind.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Drop every observer and handler.
    pub fn clear(&mut self) {
        self.observers.clear();
        self.handlers.clear();
    }

    /// Number of observers plus per-type handlers.
    pub fn subscriber_count(&self) -> usize {
        self.observers.len() + self.handlers.values().map(Vec::len).sum::<usize>()
    }

    /// Deliver a decoded notification: the generic signal first, then the
    /// typed one, then the per-type handlers.
    pub fn emit_event(&mut self, event: &Event, conn: &ConnectionInfo) {
        for observer in &mut self.observers {
            observer.on_event(event, conn);
        }
        for observer in &mut self.observers {
            observer.on_typed_event(event.kind(), event, conn);
        }
        if let Some(handlers) = self.handlers.get_mut(event.kind()) {
            for handler in handlers {
                handler(event, conn);
            }
        }
    }
}

impl Observer for SignalHub {
    fn on_connected(&mut self, conn: &ConnectionInfo) {
        for observer in &mut self.observers {
            observer.on_connected(conn);
        }
    }

    fn on_disconnected(&mut self, conn: &ConnectionInfo) {
        for observer in &mut self.observers {
            observer.on_disconnected(conn);
        }
    }

    fn on_command_started(&mut self, command: &str) {
        for observer in &mut self.observers {
            observer.on_command_started(command);
        }
    }

    fn on_command_finished(&mut self, command: &str, reply: &Reply) {
        for observer in &mut self.observers {
            observer.on_command_finished(command, reply);
        }
    }

    fn on_event(&mut self, event: &Event, conn: &ConnectionInfo) {
        self.emit_event(event, conn);
    }

    fn on_error(&mut self, reply: &Reply) {
        for observer in &mut self.observers {
            observer.on_error(reply);
        }
    }

    fn on_wait_timeout(&mut self, idle: Duration, conn: &ConnectionInfo) {
        for observer in &mut self.observers {
            observer.on_wait_timeout(idle, conn);
        }
    }
}
