//! Server Query Protocol
//!
//! This crate provides types and utilities for speaking the line-based text
//! query protocol that voice-communication servers expose for administration.
//! It is pure: no sockets, no clocks, no global state.
//!
//! # Protocol Overview
//!
//! - **Commands** (client → server): one line, `verb ident=value ... | ...`
//! - **Responses** (server → client): zero or more data lines, terminated by a
//!   status line `error id=<int> msg=<text>`
//! - **Notifications** (server → client): lines starting with `notify`, which
//!   may arrive interleaved with a response
//!
//! Cells are separated by a space, rows by `|`, idents from values by `=`.
//! Reserved characters inside values are backslash-escaped (see [`escape`]).
//!
//! # Example
//!
//! ```rust
//! use squery_protocol::{Command, Reply};
//!
//! let line = Command::new("clientkick").arg("reasonid", 5).list("clid", [1, 2, 3]).encode();
//! assert_eq!(line, "clientkick reasonid=5 clid=1|clid=2|clid=3");
//!
//! let reply = Reply::decode(
//!     vec!["clid=1 client_nickname=Alice".into(), "error id=0 msg=ok".into()],
//!     "clientlist",
//!     true,
//! )?;
//! assert_eq!(reply.records()[0].text("client_nickname")?, "Alice");
//! # Ok::<(), squery_protocol::ProtocolError>(())
//! ```

mod codec;
mod command;
pub mod constants;
mod error;
pub mod escape;
mod event;
mod messages;
mod record;
mod reply;

pub use codec::*;
pub use command::*;
pub use error::*;
pub use escape::{escape, unescape, EscapeTable};
pub use event::*;
pub use messages::MessageTable;
pub use record::*;
pub use reply::*;
