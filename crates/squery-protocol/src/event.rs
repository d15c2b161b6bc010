//! Unsolicited notification events.
//!
//! The server pushes notification lines for events the client registered
//! for. They start with `notify` immediately followed by the event type:
//!
//! ```text
//! notifytextmessage targetmode=1 msg=Hi\sthere invokerid=7 invokername=Alice
//! ```

use crate::constants::{EVENT_PREFIX, SEPARATOR_CELL, SYNTHETIC_OK};
use crate::error::{ProtocolError, ProtocolResult};
use crate::record::{FieldValue, Record};
use crate::reply::{Dialect, Reply};

/// A decoded notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    kind: String,
    records: Vec<Record>,
    message: String,
}

impl Event {
    /// Decode one notification line.
    ///
    /// The payload is parsed through the ordinary reply path with a
    /// synthetic success trailer appended.
    pub fn parse(line: &str) -> ProtocolResult<Event> {
        if !line.starts_with(EVENT_PREFIX) {
            return Err(ProtocolError::NotificationFormat(format!(
                "line does not start with '{}': {}",
                EVENT_PREFIX, line
            )));
        }

        let (token, data) = line.split_once(SEPARATOR_CELL).unwrap_or((line, ""));
        if data.is_empty() {
            return Err(ProtocolError::NotificationFormat(format!(
                "notification has no data: {}",
                line
            )));
        }

        let reply = Reply::parse_with(
            &Dialect::bare(),
            vec![data.to_string(), SYNTHETIC_OK.to_string()],
            token,
            false,
        )?;

        log::trace!("decoded notification {}", token);

        Ok(Event {
            kind: token[EVENT_PREFIX.len()..].to_string(),
            records: reply.records(),
            message: data.to_string(),
        })
    }

    /// Event type with the `notify` prefix stripped, e.g. `textmessage`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The event's record. For the rare multi-row notification this is the
    /// first row; see [`Event::records`].
    pub fn data(&self) -> &Record {
        static EMPTY: Record = Record::empty();
        self.records.first().unwrap_or(&EMPTY)
    }

    /// Every row of the notification payload.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The original, unparsed payload.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Look up a field of the event's record.
    pub fn get(&self, ident: &str) -> Option<&FieldValue> {
        self.data().get(ident)
    }

    /// Read a field of the event's record, failing if it is missing.
    pub fn field(&self, ident: &str) -> ProtocolResult<&FieldValue> {
        self.get(ident).ok_or_else(|| ProtocolError::Lookup {
            ident: ident.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_message() {
        let event = Event::parse(
            "notifytextmessage targetmode=1 msg=Hi\\sthere invokerid=7 invokername=Alice",
        )
        .unwrap();
        assert_eq!(event.kind(), "textmessage");
        assert_eq!(event.data().text("msg").unwrap(), "Hi there");
        assert_eq!(event.data().int("invokerid").unwrap(), 7);
        assert_eq!(event.message(), "targetmode=1 msg=Hi\\sthere invokerid=7 invokername=Alice");
    }

    #[test]
    fn test_missing_prefix() {
        let err = Event::parse("clid=1").unwrap_err();
        assert!(matches!(err, ProtocolError::NotificationFormat(_)));
    }

    #[test]
    fn test_missing_data() {
        assert!(matches!(
            Event::parse("notifyclientleftview").unwrap_err(),
            ProtocolError::NotificationFormat(_)
        ));
        assert!(matches!(
            Event::parse("notifyclientleftview ").unwrap_err(),
            ProtocolError::NotificationFormat(_)
        ));
    }

    #[test]
    fn test_payload_looking_like_banner_kept() {
        let event = Event::parse("notifyserveredited Welcome=1 reasonid=10").unwrap();
        assert_eq!(event.data().int("Welcome").unwrap(), 1);
        assert_eq!(event.data().int("reasonid").unwrap(), 10);
    }

    #[test]
    fn test_field_lookup() {
        let event = Event::parse("notifyclientmoved ctid=3 reasonid=0 clid=9").unwrap();
        assert_eq!(event.field("ctid").unwrap(), &FieldValue::Int(3));
        assert!(matches!(event.field("nope"), Err(ProtocolError::Lookup { .. })));
    }

    #[test]
    fn test_multi_row_payload() {
        let event = Event::parse("notifyclientmoved clid=1 ctid=2|clid=3 ctid=2").unwrap();
        assert_eq!(event.records().len(), 2);
        assert_eq!(event.data().int("clid").unwrap(), 1);
    }
}
