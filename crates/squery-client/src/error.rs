//! Client error types.

use std::io;

use squery_protocol::constants::ERROR_CODE_COMMAND_NOT_FOUND;
use squery_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by the query client.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The command text contained a raw line break.
    #[error("illegal characters in command '{command}'")]
    Framing {
        /// The offending command, up to its first cell separator.
        command: String,
    },

    /// The command verb is on the local blocklist.
    #[error("command not found: {verb}")]
    BlockedCommand {
        /// The refused verb.
        verb: String,
    },

    /// The server reported an error, or a response could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Reading from or writing to the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The operation is not available with the current client setup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The server did not greet with a known protocol identifier.
    #[error("invalid reply from the server ({0})")]
    Handshake(String),
}

impl QueryError {
    /// Numeric code of this error, matching the server's codes where one
    /// exists and `0` otherwise.
    pub fn code(&self) -> i64 {
        match self {
            QueryError::BlockedCommand { .. } => ERROR_CODE_COMMAND_NOT_FOUND,
            QueryError::Protocol(e) => e.code(),
            _ => 0,
        }
    }

    /// The underlying protocol error, if any.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            QueryError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for client operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors loading a [`crate::ClientConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The YAML document could not be parsed.
    #[error("YAML parsing error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
