//! Synchronous query client.
//!
//! Drives the line protocol from [`squery_protocol`] over a [`Transport`]:
//! one command in flight at a time, responses drained up to their status
//! line, notifications delivered to [`Observer`]s as they are found.
//!
//! ```rust
//! use squery_client::{ClientConfig, QueryClient, ScriptedTransport};
//!
//! let transport = ScriptedTransport::new().with_lines([
//!     "TS3",
//!     "Welcome to the query interface",
//!     "clid=1 client_nickname=serveradmin",
//!     "error id=0 msg=ok",
//! ]);
//! let mut client = QueryClient::connect(transport, ClientConfig::default())?;
//! let reply = client.request("clientlist", true)?;
//! assert_eq!(reply.records()[0].text("client_nickname")?, "serveradmin");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod adapter;
mod cache;
mod client;
mod config;
mod error;
pub mod permissions;
mod profiler;
mod signals;
mod transport;

pub use adapter::Adapter;
pub use cache::HostCache;
pub use client::QueryClient;
pub use config::{ClientConfig, DEFAULT_PORT};
pub use error::{ConfigError, QueryError, QueryResult};
pub use permissions::{permission_grant_id, PermissionCatalog, PermissionCategory};
pub use profiler::{MemoryUsage, Profiler};
pub use signals::{ConnectionInfo, Observer, SignalHub};
pub use transport::{ScriptedTransport, TcpTransport, Transport};
