//! Protocol error types.

use thiserror::Error;

use crate::constants::{ERROR_CODE_INVALID_PARAMETER, ERROR_ID_OK};

/// Errors that can occur when encoding or decoding query protocol lines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The server answered with a non-zero status id.
    #[error("{message} (code 0x{code:X})")]
    Server {
        /// Status message, including the resolved diagnostic suffix. A
        /// registered custom message replaces it.
        message: String,
        /// Status message as the server sent it, unescaped.
        raw_message: String,
        /// Remote status id.
        code: i64,
        /// Return code echoed by the server, if any.
        return_code: Option<String>,
        /// The command line that produced the error.
        command: String,
    },

    /// An unsolicited notification line could not be decoded.
    #[error("invalid notification event: {0}")]
    NotificationFormat(String),

    /// A record lacked the ident it was looked up by.
    #[error("invalid parameter: record has no '{ident}'")]
    Lookup {
        /// The missing ident.
        ident: String,
    },

    /// A field held a value of another kind than requested.
    #[error("field '{ident}' is not {expected}")]
    FieldType {
        /// The ident that was read.
        ident: String,
        /// Human-readable name of the expected kind.
        expected: &'static str,
    },

    /// A response buffer did not end with a status line.
    #[error("response has no status line")]
    MissingStatusLine,

    /// A custom message table was edited inconsistently.
    #[error("{0}")]
    MessageTable(String),
}

impl ProtocolError {
    /// Numeric code associated with this error, matching the server's codes
    /// where one exists.
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::Server { code, .. } => *code,
            ProtocolError::Lookup { .. } => ERROR_CODE_INVALID_PARAMETER,
            _ => ERROR_ID_OK,
        }
    }

    /// Return code attached to a server error, if any.
    pub fn return_code(&self) -> Option<&str> {
        match self {
            ProtocolError::Server { return_code, .. } => return_code.as_deref(),
            _ => None,
        }
    }

    /// Status message as the server sent it, before any custom message was
    /// applied.
    pub fn raw_message(&self) -> Option<&str> {
        match self {
            ProtocolError::Server { raw_message, .. } => Some(raw_message),
            _ => None,
        }
    }

    /// Whether this error was reported by the remote server.
    pub fn is_server(&self) -> bool {
        matches!(self, ProtocolError::Server { .. })
    }
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
