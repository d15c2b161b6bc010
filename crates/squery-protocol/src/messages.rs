//! Custom error messages.
//!
//! A [`MessageTable`] maps server error codes to message templates. When a
//! server error carries a registered code its message is replaced by the
//! template, with `%code` and `%mesg` standing for the original code and
//! message:
//!
//! ```rust
//! use squery_protocol::MessageTable;
//!
//! let table = MessageTable::new().register(1281, "no such channel (%mesg, %code)")?;
//! assert_eq!(
//!     table.render(1281, "invalid channelID").as_deref(),
//!     Some("no such channel (invalid channelID, 1281)")
//! );
//! # Ok::<(), squery_protocol::ProtocolError>(())
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

const CODE_PLACEHOLDER: &str = "%code";
const MESSAGE_PLACEHOLDER: &str = "%mesg";

/// Immutable code → template table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTable {
    templates: BTreeMap<i64, String>,
}

impl MessageTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template for `code`. Registering a code twice is an error.
    pub fn register(
        mut self,
        code: i64,
        template: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        if self.templates.contains_key(&code) {
            return Err(ProtocolError::MessageTable(format!(
                "custom message for code 0x{:X} is already registered",
                code
            )));
        }
        self.templates.insert(code, template.into());
        Ok(self)
    }

    /// Remove the template for `code`. Removing an unknown code is an error.
    pub fn unregister(mut self, code: i64) -> Result<Self, ProtocolError> {
        if self.templates.remove(&code).is_none() {
            return Err(ProtocolError::MessageTable(format!(
                "custom message for code 0x{:X} is not registered",
                code
            )));
        }
        Ok(self)
    }

    /// The template registered for `code`.
    pub fn template(&self, code: i64) -> Option<&str> {
        self.templates.get(&code).map(String::as_str)
    }

    /// Render the template for `code`, if one is registered.
    pub fn render(&self, code: i64, message: &str) -> Option<String> {
        let template = self.template(code)?;
        Some(
            template
                .replace(CODE_PLACEHOLDER, &code.to_string())
                .replace(MESSAGE_PLACEHOLDER, message),
        )
    }

    /// Rewrite the message of a server error with a registered code. The
    /// server's own text stays available as `raw_message`. Other errors pass
    /// through unchanged.
    pub fn apply(&self, err: ProtocolError) -> ProtocolError {
        match err {
            ProtocolError::Server {
                message,
                raw_message,
                code,
                return_code,
                command,
            } => match self.render(code, &raw_message) {
                Some(custom) => ProtocolError::Server {
                    message: custom,
                    raw_message,
                    code,
                    return_code,
                    command,
                },
                None => ProtocolError::Server {
                    message,
                    raw_message,
                    code,
                    return_code,
                    command,
                },
            },
            other => other,
        }
    }

    /// Number of registered codes.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if no code is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(message: &str, code: i64) -> ProtocolError {
        ProtocolError::Server {
            message: message.to_string(),
            raw_message: message.to_string(),
            code,
            return_code: None,
            command: "channelinfo cid=9".to_string(),
        }
    }

    #[test]
    fn test_register_and_render() {
        let table = MessageTable::new()
            .register(1281, "channel lookup failed: %mesg (code %code)")
            .unwrap();
        assert_eq!(
            table.render(1281, "invalid channelID").as_deref(),
            Some("channel lookup failed: invalid channelID (code 1281)")
        );
        assert_eq!(table.render(768, "invalid channelID"), None);
    }

    #[test]
    fn test_duplicate_and_unknown_codes() {
        let table = MessageTable::new().register(512, "x").unwrap();
        let err = table.clone().register(512, "y").unwrap_err();
        assert_eq!(
            err.to_string(),
            "custom message for code 0x200 is already registered"
        );

        let table = table.unregister(512).unwrap();
        assert!(table.is_empty());
        assert!(table.unregister(512).is_err());
    }

    #[test]
    fn test_apply_keeps_raw_message() {
        let table = MessageTable::new().register(1281, "no such channel").unwrap();
        match table.apply(server_error("invalid channelID", 1281)) {
            ProtocolError::Server { message, raw_message, code, .. } => {
                assert_eq!(message, "no such channel");
                assert_eq!(raw_message, "invalid channelID");
                assert_eq!(code, 1281);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let untouched = server_error("database empty result set", 1281 + 1);
        assert_eq!(table.apply(untouched.clone()), untouched);
        assert_eq!(
            table.apply(ProtocolError::MissingStatusLine),
            ProtocolError::MissingStatusLine
        );
    }
}
