//! Connection lifecycle.

use tracing::{debug, info};

use crate::client::QueryClient;
use crate::error::{QueryError, QueryResult};
use crate::signals::Observer;
use crate::transport::Transport;

/// Capability of a protocol adapter: open and close the session on top of a
/// transport it owns.
pub trait Adapter {
    /// The transport the adapter speaks through.
    type Transport: Transport;

    /// Verify the server's greeting.
    fn handshake(&mut self) -> QueryResult<()>;

    /// End the session. Failures are logged and otherwise ignored.
    fn teardown(&mut self);

    /// The underlying transport.
    fn transport(&self) -> &Self::Transport;

    /// The underlying transport, mutably.
    fn transport_mut(&mut self) -> &mut Self::Transport;
}

impl<T: Transport> Adapter for QueryClient<T> {
    type Transport = T;

    fn handshake(&mut self) -> QueryResult<()> {
        let greeting = loop {
            if let Some(line) = self.read_line_polling()? {
                break line;
            }
        };

        let known = self
            .config
            .protocol_idents
            .iter()
            .any(|ident| !ident.is_empty() && greeting.starts_with(ident.as_str()));
        if !known {
            return Err(QueryError::Handshake(greeting));
        }

        info!("QueryClient[{}]: connected ({})", self.conn, greeting);
        self.signals.on_connected(&self.conn);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Err(e) = self.request("quit", false) {
            debug!("QueryClient[{}]: quit failed: {}", self.conn, e);
        }
        info!("QueryClient[{}]: disconnected", self.conn);
        self.signals.on_disconnected(&self.conn);
    }

    fn transport(&self) -> &T {
        &self.transport
    }

    fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
