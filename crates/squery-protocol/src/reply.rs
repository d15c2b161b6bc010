//! Response decoding.
//!
//! A response is every line the server sends for one command, up to and
//! including the terminal status line:
//!
//! ```text
//! Welcome to the server query interface.     <- banner, discarded
//! notifytextmessage targetmode=3 msg=hi      <- notification, extracted
//! clid=1 client_nickname=a|clid=2 client_nickname=b
//! error id=0 msg=ok                          <- status line
//! ```
//!
//! [`Reply::parse`] splits these into an [`ErrorRecord`], the body and the
//! embedded [`Event`]s. [`Reply::check`] turns a failed status into a
//! [`ProtocolError::Server`] when the caller asked for that.

use serde::Serialize;

use crate::constants::{
    DEFAULT_GREETING_PREFIXES, ERROR_ID_OK, ERROR_SENTINEL, EVENT_PREFIX, SEPARATOR_CELL,
    SEPARATOR_LIST,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::escape::unescape;
use crate::event::Event;
use crate::record::{FieldValue, IndexedRecords, Record};

// ============================================================================
// Dialect
// ============================================================================

/// Server-flavour specific line prefixes.
///
/// Immutable once built; pass it to [`Reply::parse_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    greeting_prefixes: Vec<String>,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::standard()
    }
}

impl Dialect {
    /// The dialect understood by stock servers.
    pub fn standard() -> Self {
        Dialect {
            greeting_prefixes: DEFAULT_GREETING_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }

    /// A dialect that recognises no banner lines at all.
    pub fn bare() -> Self {
        Dialect {
            greeting_prefixes: Vec::new(),
        }
    }

    /// A dialect with the given banner prefixes.
    pub fn with_greeting_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Dialect {
            greeting_prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if `line` is an informational banner line.
    pub fn is_greeting(&self, line: &str) -> bool {
        self.greeting_prefixes.iter().any(|p| line.starts_with(p.as_str()))
    }
}

// ============================================================================
// Error Record
// ============================================================================

/// The terminal status line of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    fields: Record,
}

impl ErrorRecord {
    /// Parse a status line such as `error id=0 msg=ok`.
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let rest = match line.split_once(SEPARATOR_CELL) {
            Some((head, rest)) if head == ERROR_SENTINEL => rest,
            None if line == ERROR_SENTINEL => "",
            _ => return Err(ProtocolError::MissingStatusLine),
        };
        Ok(ErrorRecord {
            fields: Record::parse(rest),
        })
    }

    /// A successful status.
    pub fn ok() -> Self {
        let mut fields = Record::new();
        fields.insert("id", FieldValue::Int(ERROR_ID_OK));
        fields.insert("msg", FieldValue::Text("ok".to_string()));
        ErrorRecord { fields }
    }

    /// Status id; `0` means success.
    pub fn id(&self) -> i64 {
        self.fields.int_opt("id").unwrap_or(ERROR_ID_OK)
    }

    /// Status message, unescaped.
    pub fn msg(&self) -> String {
        self.fields.text_opt("msg").unwrap_or_default()
    }

    /// Return code echoed back by the server.
    pub fn return_code(&self) -> Option<String> {
        self.fields.text_opt("return_code")
    }

    /// Id of the permission whose check failed.
    pub fn failed_permid(&self) -> Option<i64> {
        self.fields.int_opt("failed_permid")
    }

    /// Additional diagnostic text.
    pub fn extra_msg(&self) -> Option<String> {
        self.fields.text_opt("extra_msg")
    }

    /// Check if the status signals success.
    pub fn is_ok(&self) -> bool {
        self.id() == ERROR_ID_OK
    }

    /// Look up any status field.
    pub fn property(&self, ident: &str) -> Option<&FieldValue> {
        self.fields.get(ident)
    }

    /// All status fields.
    pub fn fields(&self) -> &Record {
        &self.fields
    }

    /// Diagnostic suffix appended to the status message.
    ///
    /// With a failed permission id, `lookup` is asked for the permission's
    /// symbolic name; if it has none the id is rendered together with the
    /// command verb and its hex form.
    pub fn suffix<F>(&self, verb: &str, lookup: F) -> String
    where
        F: FnOnce(i64) -> Option<String>,
    {
        if let Some(permid) = self.failed_permid().filter(|&p| p != 0) {
            return match lookup(permid) {
                Some(name) => format!(" (failed on {})", name),
                None => format!(" (failed on {} {}/0x{:X})", verb, permid, permid),
            };
        }
        match self.extra_msg() {
            Some(details) if !details.trim().is_empty() => format!(" ({})", details.trim()),
            _ => String::new(),
        }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Either the only record of a one-row response or every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SingleOrList {
    /// The response had exactly one row.
    Single(Record),
    /// The response had zero or several rows.
    List(Vec<Record>),
}

impl SingleOrList {
    /// Flatten into a list of records.
    pub fn into_vec(self) -> Vec<Record> {
        match self {
            SingleOrList::Single(r) => vec![r],
            SingleOrList::List(rs) => rs,
        }
    }

    /// The single record, if this is one.
    pub fn as_single(&self) -> Option<&Record> {
        match self {
            SingleOrList::Single(r) => Some(r),
            SingleOrList::List(_) => None,
        }
    }
}

/// A fully read response to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    command: String,
    error: ErrorRecord,
    body: String,
    events: Vec<Event>,
    throws: bool,
}

impl Reply {
    /// Parse a response buffer with the standard dialect.
    ///
    /// The last line must be the status line. The status is not checked;
    /// see [`Reply::check`] and [`Reply::decode`].
    pub fn parse(lines: Vec<String>, command: &str, throws: bool) -> ProtocolResult<Reply> {
        Reply::parse_with(&Dialect::standard(), lines, command, throws)
    }

    /// Parse a response buffer with an explicit dialect.
    pub fn parse_with(
        dialect: &Dialect,
        mut lines: Vec<String>,
        command: &str,
        throws: bool,
    ) -> ProtocolResult<Reply> {
        let status = lines.pop().ok_or(ProtocolError::MissingStatusLine)?;
        let error = ErrorRecord::parse(&status)?;

        let mut body_lines = Vec::with_capacity(lines.len());
        let mut events = Vec::new();
        for line in lines {
            if dialect.is_greeting(&line) {
                log::trace!("dropping banner line: {}", line);
            } else if line.starts_with(EVENT_PREFIX) {
                events.push(Event::parse(&line)?);
            } else {
                body_lines.push(line);
            }
        }

        Ok(Reply {
            command: command.to_string(),
            error,
            body: body_lines.join(&SEPARATOR_LIST.to_string()),
            events,
            throws,
        })
    }

    /// Parse a response buffer and fail if the server reported an error and
    /// `throws` is set. No permission name lookup is attempted.
    pub fn decode(lines: Vec<String>, command: &str, throws: bool) -> ProtocolResult<Reply> {
        let reply = Reply::parse(lines, command, throws)?;
        reply.check(|_| None)?;
        Ok(reply)
    }

    /// Turn a failed status into an error when this reply was built to throw.
    ///
    /// `lookup` resolves a failed permission id to its symbolic name. It is
    /// only called when the status names one.
    pub fn check<F>(&self, lookup: F) -> ProtocolResult<()>
    where
        F: FnOnce(i64) -> Option<String>,
    {
        if self.error.is_ok() || !self.throws {
            return Ok(());
        }
        Err(self.to_error(lookup))
    }

    /// Build the server error for this reply regardless of the throw flag.
    pub fn to_error<F>(&self, lookup: F) -> ProtocolError
    where
        F: FnOnce(i64) -> Option<String>,
    {
        let suffix = self.error.suffix(self.verb(), lookup);
        ProtocolError::Server {
            message: format!("{}{}", self.error.msg(), suffix),
            raw_message: self.error.msg(),
            code: self.error.id(),
            return_code: self.error.return_code(),
            command: self.command.clone(),
        }
    }

    /// The status record.
    pub fn error(&self) -> &ErrorRecord {
        &self.error
    }

    /// Notifications that arrived while this response was being read.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The command line this reply answers.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The command verb.
    pub fn verb(&self) -> &str {
        self.command
            .split(SEPARATOR_CELL)
            .next()
            .unwrap_or_default()
    }

    /// Whether this reply was built to raise on a failed status.
    pub fn throws(&self) -> bool {
        self.throws
    }

    /// The escaped body, rows joined by the list separator.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// The body with escapes resolved.
    pub fn body_text(&self) -> String {
        unescape(&self.body)
    }

    /// Check if the body has no rows.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Rows, still escaped.
    pub fn raw_rows(&self) -> Vec<&str> {
        if self.body.is_empty() {
            return Vec::new();
        }
        self.body.split(SEPARATOR_LIST).collect()
    }

    /// Rows with escapes resolved.
    pub fn rows(&self) -> Vec<String> {
        self.raw_rows().into_iter().map(unescape).collect()
    }

    /// Rows split into cells, escapes resolved per cell.
    pub fn table(&self) -> Vec<Vec<String>> {
        self.raw_rows()
            .into_iter()
            .map(|row| row.split(SEPARATOR_CELL).map(unescape).collect())
            .collect()
    }

    /// One record per row.
    pub fn records(&self) -> Vec<Record> {
        self.raw_rows().into_iter().map(Record::parse).collect()
    }

    /// Records keyed by the value each holds for `ident`.
    ///
    /// Fails if any record lacks `ident` or holds it as a bare flag.
    pub fn indexed_by(&self, ident: &str) -> ProtocolResult<IndexedRecords> {
        let mut indexed = IndexedRecords::default();
        for record in self.records() {
            let key = match record.get(ident) {
                Some(v) if !v.is_absent() => v.clone(),
                _ => {
                    return Err(ProtocolError::Lookup {
                        ident: ident.to_string(),
                    })
                }
            };
            indexed.insert(key, record);
        }
        Ok(indexed)
    }

    /// The only record of a one-row response, or every record otherwise.
    pub fn single_or_list(&self) -> SingleOrList {
        let mut records = self.records();
        if records.len() == 1 {
            SingleOrList::Single(records.remove(0))
        } else {
            SingleOrList::List(records)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ERROR_CODE_INVALID_PARAMETER;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ok_reply_is_empty() {
        let reply = Reply::decode(lines(&["error id=0 msg=ok"]), "whoami", true).unwrap();
        assert!(reply.is_empty());
        assert!(reply.error().is_ok());
        assert_eq!(reply.error().msg(), "ok");
        assert!(reply.records().is_empty());
        assert_eq!(reply.single_or_list(), SingleOrList::List(Vec::new()));
    }

    #[test]
    fn test_error_raised_with_unescaped_message() {
        let err = Reply::decode(
            lines(&["error id=1281 msg=invalid\\schannelID"]),
            "channelinfo cid=9",
            true,
        )
        .unwrap_err();
        match err {
            ProtocolError::Server { message, raw_message, code, return_code, command } => {
                assert_eq!(message, "invalid channelID");
                assert_eq!(raw_message, "invalid channelID");
                assert_eq!(code, 1281);
                assert_eq!(return_code, None);
                assert_eq!(command, "channelinfo cid=9");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_not_raised_without_throw() {
        let reply = Reply::decode(lines(&["error id=768 msg=invalid\\schannelID"]), "x", false).unwrap();
        assert_eq!(reply.error().id(), 768);
        assert_eq!(reply.error().msg(), "invalid channelID");
        assert!(!reply.throws());
    }

    #[test]
    fn test_return_code_kept() {
        let err = Reply::decode(
            lines(&["error id=512 msg=invalid\\sclientID return_code=abc"]),
            "clientinfo clid=1",
            true,
        )
        .unwrap_err();
        assert_eq!(err.code(), 512);
        assert_eq!(err.return_code(), Some("abc"));
    }

    #[test]
    fn test_extra_msg_suffix() {
        let err = Reply::decode(
            lines(&["error id=1538 msg=invalid\\sparameter extra_msg=\\sbad\\svalue\\s"]),
            "serveredit",
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::Server { ref message, .. } if message == "invalid parameter (bad value)"));
    }

    #[test]
    fn test_failed_permid_suffix_resolved() {
        let reply = Reply::parse(
            lines(&["error id=2568 msg=insufficient\\sclient\\spermissions failed_permid=4"]),
            "serverstop sid=1",
            true,
        )
        .unwrap();
        let err = reply
            .check(|permid| {
                assert_eq!(permid, 4);
                Some("b_virtualserver_stop".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Server { ref message, .. }
            if message == "insufficient client permissions (failed on b_virtualserver_stop)"));
    }

    #[test]
    fn test_failed_permid_hex_fallback() {
        let err = Reply::decode(
            lines(&["error id=2568 msg=insufficient\\sclient\\spermissions failed_permid=171"]),
            "serverstop sid=1",
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::Server { ref message, .. }
            if message == "insufficient client permissions (failed on serverstop 171/0xAB)"));
    }

    #[test]
    fn test_banner_and_events_removed() {
        let reply = Reply::parse(
            lines(&[
                "Welcome to the query interface",
                "notifytextmessage targetmode=3 msg=hello invokerid=2",
                "virtualserver_id=1 virtualserver_name=Main",
                "error id=0 msg=ok",
            ]),
            "serverinfo",
            true,
        )
        .unwrap();
        assert_eq!(reply.events().len(), 1);
        assert_eq!(reply.events()[0].kind(), "textmessage");
        assert_eq!(reply.raw_rows(), ["virtualserver_id=1 virtualserver_name=Main"]);
    }

    #[test]
    fn test_notification_only_buffer() {
        let reply = Reply::decode(
            lines(&["notifyclientleftview cfid=1 ctid=0 clid=5", "error id=0 msg=ok"]),
            "serverinfo",
            true,
        )
        .unwrap();
        assert!(reply.is_empty());
        assert_eq!(reply.events().len(), 1);
    }

    #[test]
    fn test_custom_dialect() {
        let dialect = Dialect::with_greeting_prefixes(["Hello"]);
        let reply = Reply::parse_with(
            &dialect,
            lines(&["Hello there", "Welcome=1", "error id=0 msg=ok"]),
            "x",
            true,
        )
        .unwrap();
        assert_eq!(reply.raw_rows(), ["Welcome=1"]);
    }

    #[test]
    fn test_single_or_list() {
        let one = Reply::decode(lines(&["clid=1 nick=a", "error id=0 msg=ok"]), "x", true).unwrap();
        let single = one.single_or_list();
        assert_eq!(single.as_single().unwrap().int("clid").unwrap(), 1);

        let two = Reply::decode(lines(&["clid=1|clid=2", "error id=0 msg=ok"]), "x", true).unwrap();
        match two.single_or_list() {
            SingleOrList::List(rs) => {
                assert_eq!(rs.len(), 2);
                assert_eq!(rs[1].int("clid").unwrap(), 2);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_multiline_body_joined() {
        let reply = Reply::decode(lines(&["a=1", "a=2", "error id=0 msg=ok"]), "x", true).unwrap();
        assert_eq!(reply.body(), "a=1|a=2");
        assert_eq!(reply.records().len(), 2);
    }

    #[test]
    fn test_rows_and_table() {
        let reply = Reply::decode(
            lines(&["name=a\\sb flag|name=c\\pd", "error id=0 msg=ok"]),
            "x",
            true,
        )
        .unwrap();
        assert_eq!(reply.rows(), ["name=a b flag", "name=c|d"]);
        assert_eq!(reply.table()[0], ["name=a b", "flag"]);
        assert_eq!(reply.body_text(), "name=a b flag|name=c|d");
    }

    #[test]
    fn test_indexed_by() {
        let reply = Reply::decode(
            lines(&["permid=4 permsid=b_stop|permid=5 permsid=b_start", "error id=0 msg=ok"]),
            "permget",
            true,
        )
        .unwrap();
        let idx = reply.indexed_by("permsid").unwrap();
        assert_eq!(idx.first_key().and_then(FieldValue::as_str), Some("b_stop"));
        assert_eq!(idx.get_text("b_start").unwrap().int("permid").unwrap(), 5);

        let err = reply.indexed_by("nope").unwrap_err();
        assert_eq!(err.code(), ERROR_CODE_INVALID_PARAMETER);
    }

    #[test]
    fn test_missing_status_line() {
        assert_eq!(
            Reply::parse(Vec::new(), "x", true).unwrap_err(),
            ProtocolError::MissingStatusLine
        );
        assert_eq!(
            Reply::parse(lines(&["clid=1"]), "x", true).unwrap_err(),
            ProtocolError::MissingStatusLine
        );
    }

    #[test]
    fn test_verb() {
        let reply = Reply::decode(lines(&["error id=0 msg=ok"]), "clientkick reasonid=5", true).unwrap();
        assert_eq!(reply.verb(), "clientkick");
    }
}
