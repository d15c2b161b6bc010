//! Client configuration.
//!
//! Loaded from YAML; every field has a default, so an empty document is a
//! valid configuration for a local server:
//!
//! ```yaml
//! host: voice.example.org
//! port: 10011
//! timeout_secs: 10
//! blocking: true
//! blocked_commands: [help]
//! nickname: squery
//! messages:
//!   1281: "channel is gone (%mesg)"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use squery_metrics::ConnectionLabels;
use squery_protocol::constants::{DEFAULT_GREETING_PREFIXES, DEFAULT_PROTOCOL_IDENTS};
use squery_protocol::{Dialect, MessageTable};

use crate::error::ConfigError;

/// Default query port.
pub const DEFAULT_PORT: u16 = 10011;

/// Connection and protocol settings for a [`crate::QueryClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or address.
    pub host: String,
    /// Query port.
    pub port: u16,
    /// Connect and read timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,
    /// Whether reads block until a line arrives.
    pub blocking: bool,
    /// Verbs refused locally with a "command not found" error.
    pub blocked_commands: Vec<String>,
    /// Accepted prefixes of the server's first line.
    pub protocol_idents: Vec<String>,
    /// Prefixes of banner lines dropped from responses.
    pub greeting_prefixes: Vec<String>,
    /// Sleep between polls of a non-blocking transport with nothing to read.
    pub idle_poll_ms: u64,
    /// Idle interval after which `wait` reports a timeout to observers.
    pub wait_timeout_secs: u64,
    /// Nickname to apply after connecting, if any.
    pub nickname: Option<String>,
    /// Custom messages for server error codes, `%code` and `%mesg` expanded.
    pub messages: MessageTable,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout_secs: 10,
            blocking: true,
            blocked_commands: vec!["help".to_string()],
            protocol_idents: DEFAULT_PROTOCOL_IDENTS.iter().map(|s| s.to_string()).collect(),
            greeting_prefixes: DEFAULT_GREETING_PREFIXES.iter().map(|s| s.to_string()).collect(),
            idle_poll_ms: 50,
            wait_timeout_secs: 10,
            nickname: None,
            messages: MessageTable::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `host:port` with every other field at its
    /// default.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // serde_yaml rejects an empty document as a struct
        let config: ClientConfig = if text.trim().is_empty() {
            ClientConfig::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }
        if self.protocol_idents.iter().all(|p| p.is_empty()) {
            return Err(ConfigError::Invalid(
                "at least one protocol identifier is required".to_string(),
            ));
        }
        if self.idle_poll_ms == 0 {
            return Err(ConfigError::Invalid("idle_poll_ms must be positive".to_string()));
        }
        if self.blocked_commands.iter().any(|v| v.contains(char::is_whitespace)) {
            return Err(ConfigError::Invalid(
                "blocked commands must be single verbs".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` for socket addressing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Connect and read timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Sleep between polls of an idle non-blocking transport.
    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Idle interval reported by `wait`.
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    /// Response dialect built from the greeting prefixes.
    pub fn dialect(&self) -> Dialect {
        Dialect::with_greeting_prefixes(self.greeting_prefixes.iter().cloned())
    }

    /// Metric labels for this connection.
    pub fn labels(&self) -> ConnectionLabels {
        ConnectionLabels::new(self.host.clone(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.port, 10011);
        assert!(config.blocking);
        assert_eq!(config.blocked_commands, ["help"]);
        assert_eq!(config.protocol_idents, ["TS3", "TeaSpeak"]);
        assert_eq!(config.greeting_prefixes, ["Welcome"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let config = ClientConfig::from_yaml(
            "host: voice.example.org\nblocking: false\nblocked_commands: [help, serverstop]\n",
        )
        .unwrap();
        assert_eq!(config.host, "voice.example.org");
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.blocking);
        assert_eq!(config.blocked_commands, ["help", "serverstop"]);
        assert_eq!(config.address(), "voice.example.org:10011");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ClientConfig::from_yaml("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ClientConfig::from_yaml("port: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_yaml("host: ''"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_yaml("protocol_idents: []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_yaml("blocked_commands: ['server stop']"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ClientConfig::from_yaml("port: [1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_durations() {
        let mut config = ClientConfig::new("localhost", 10011);
        assert_eq!(config.timeout(), Some(Duration::from_secs(10)));
        config.timeout_secs = 0;
        assert_eq!(config.timeout(), None);
        assert_eq!(config.idle_poll(), Duration::from_millis(50));
    }

    #[test]
    fn test_dialect_from_prefixes() {
        let config = ClientConfig::from_yaml("greeting_prefixes: [Hello]").unwrap();
        let dialect = config.dialect();
        assert!(dialect.is_greeting("Hello there"));
        assert!(!dialect.is_greeting("Welcome"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: 10.0.0.5\nport: 10022\nnickname: bot").unwrap();
        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.address(), "10.0.0.5:10022");
        assert_eq!(config.nickname.as_deref(), Some("bot"));
        assert_eq!(config.labels().port, 10022);
    }

    #[test]
    fn test_messages_from_yaml() {
        let config =
            ClientConfig::from_yaml("messages:\n  1281: \"channel is gone (%mesg)\"\n").unwrap();
        assert_eq!(config.messages.len(), 1);
        assert_eq!(
            config.messages.render(1281, "invalid channelID").as_deref(),
            Some("channel is gone (invalid channelID)")
        );
        assert!(ClientConfig::default().messages.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ClientConfig::load("/nonexistent/squery.yaml"),
            Err(ConfigError::Io(_))
        ));
    }
}
