//! Parsed response records.
//!
//! A record is one row of a response: an ordered mapping from ident to a
//! [`FieldValue`]. Rows have no fixed schema; every row carries its own set of
//! idents.

use serde::{Serialize, Serializer};

use crate::constants::{SEPARATOR_CELL, SEPARATOR_PAIR};
use crate::error::{ProtocolError, ProtocolResult};
use crate::escape::unescape;

/// The value of one field in a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// The value was lexically an integer.
    Int(i64),
    /// Any other value, unescaped.
    Text(String),
    /// The cell was a bare flag with no `=value` part.
    Absent,
}

impl FieldValue {
    /// Coerce a raw (still escaped) wire value.
    pub fn from_wire(raw: &str) -> Self {
        match parse_int(raw) {
            Some(v) => FieldValue::Int(v),
            None => FieldValue::Text(unescape(raw)),
        }
    }

    /// Get the integer if this is an integer field.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text if this is a text field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if this field is a bare flag.
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Absent => Ok(()),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Int(v) => serializer.serialize_i64(*v),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Absent => serializer.serialize_none(),
        }
    }
}

/// Whether `raw` is lexically a decimal integer: an optional minus sign
/// followed by ASCII digits only, within `i64` range.
pub(crate) fn parse_int(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// One parsed row of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Record::empty()
    }

    /// An empty record, usable in constant contexts.
    pub const fn empty() -> Self {
        Record { fields: Vec::new() }
    }

    /// Parse one row of cells, e.g. `clid=1 client_nickname=Bob\sB -away`.
    ///
    /// A cell without a pair separator becomes an [`FieldValue::Absent`]
    /// field; it is never read as a number even when it looks like one.
    pub fn parse(row: &str) -> Self {
        let mut record = Record::new();
        for cell in row.split(SEPARATOR_CELL) {
            if cell.is_empty() {
                continue;
            }
            match cell.split_once(SEPARATOR_PAIR) {
                Some((ident, value)) => record.insert(ident, FieldValue::from_wire(value)),
                None => record.insert(cell, FieldValue::Absent),
            }
        }
        record
    }

    /// Insert a field. An existing ident keeps its position and takes the
    /// new value.
    pub fn insert(&mut self, ident: impl Into<String>, value: FieldValue) {
        let ident = ident.into();
        match self.fields.iter_mut().find(|(k, _)| *k == ident) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((ident, value)),
        }
    }

    /// Look up a field.
    pub fn get(&self, ident: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(k, _)| k == ident)
            .map(|(_, v)| v)
    }

    /// Check whether the record has `ident`, with or without a value.
    pub fn contains(&self, ident: &str) -> bool {
        self.get(ident).is_some()
    }

    /// Read an integer field.
    pub fn int(&self, ident: &str) -> ProtocolResult<i64> {
        match self.get(ident) {
            Some(FieldValue::Int(v)) => Ok(*v),
            Some(_) => Err(ProtocolError::FieldType {
                ident: ident.to_string(),
                expected: "an integer",
            }),
            None => Err(ProtocolError::Lookup {
                ident: ident.to_string(),
            }),
        }
    }

    /// Read a field as text. Integer fields are rendered in decimal, since a
    /// numeric-looking name is still a name.
    pub fn text(&self, ident: &str) -> ProtocolResult<String> {
        match self.get(ident) {
            Some(FieldValue::Text(s)) => Ok(s.clone()),
            Some(FieldValue::Int(v)) => Ok(v.to_string()),
            Some(FieldValue::Absent) => Err(ProtocolError::FieldType {
                ident: ident.to_string(),
                expected: "a value",
            }),
            None => Err(ProtocolError::Lookup {
                ident: ident.to_string(),
            }),
        }
    }

    /// Read an optional integer field.
    pub fn int_opt(&self, ident: &str) -> Option<i64> {
        self.get(ident).and_then(FieldValue::as_int)
    }

    /// Read an optional field as text.
    pub fn text_opt(&self, ident: &str) -> Option<String> {
        self.text(ident).ok()
    }

    /// Iterate over `(ident, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Idents in wire order.
    pub fn idents(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Records re-keyed by the value of one of their fields, in first-seen order.
///
/// A later record with the same key replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedRecords {
    entries: Vec<(FieldValue, Record)>,
}

impl IndexedRecords {
    pub(crate) fn insert(&mut self, key: FieldValue, record: Record) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = record,
            None => self.entries.push((key, record)),
        }
    }

    /// Look up a record by key.
    pub fn get(&self, key: &FieldValue) -> Option<&Record> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// Look up a record by an integer key.
    pub fn get_int(&self, key: i64) -> Option<&Record> {
        self.get(&FieldValue::Int(key))
    }

    /// Look up a record by a text key.
    pub fn get_text(&self, key: &str) -> Option<&Record> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, r)| r)
    }

    /// The first key, if any.
    pub fn first_key(&self) -> Option<&FieldValue> {
        self.entries.first().map(|(k, _)| k)
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &FieldValue> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterate over `(key, record)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldValue, &Record)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_row() {
        let rec = Record::parse("clid=5 cid=1 client_nickname=Bob\\sthe\\sAdmin client_type=0");
        assert_eq!(rec.len(), 4);
        assert_eq!(rec.int("clid").unwrap(), 5);
        assert_eq!(rec.text("client_nickname").unwrap(), "Bob the Admin");
        assert_eq!(rec.idents().collect::<Vec<_>>(), ["clid", "cid", "client_nickname", "client_type"]);
    }

    #[test]
    fn test_bare_flag_is_absent() {
        let rec = Record::parse("clid=1 -away 42");
        assert_eq!(rec.get("-away"), Some(&FieldValue::Absent));
        // A bare numeric cell stays a flag.
        assert_eq!(rec.get("42"), Some(&FieldValue::Absent));
        assert!(rec.contains("42"));
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(FieldValue::from_wire("-12"), FieldValue::Int(-12));
        assert_eq!(FieldValue::from_wire("007"), FieldValue::Int(7));
        assert_eq!(FieldValue::from_wire("1.5"), FieldValue::Text("1.5".to_string()));
        assert_eq!(FieldValue::from_wire("0x10"), FieldValue::Text("0x10".to_string()));
        assert_eq!(FieldValue::from_wire(""), FieldValue::Text(String::new()));
        assert_eq!(FieldValue::from_wire("-"), FieldValue::Text("-".to_string()));
        // Out of range stays text rather than wrapping.
        assert_eq!(
            FieldValue::from_wire("99999999999999999999"),
            FieldValue::Text("99999999999999999999".to_string())
        );
    }

    #[test]
    fn test_value_with_equals() {
        let rec = Record::parse("token=abc=def");
        assert_eq!(rec.text("token").unwrap(), "abc=def");
    }

    #[test]
    fn test_typed_accessors() {
        let rec = Record::parse("id=3 name=foo flag");
        assert!(matches!(rec.int("name"), Err(ProtocolError::FieldType { .. })));
        assert!(matches!(rec.int("missing"), Err(ProtocolError::Lookup { .. })));
        assert!(matches!(rec.text("flag"), Err(ProtocolError::FieldType { .. })));
        assert_eq!(rec.text("id").unwrap(), "3");
        assert_eq!(rec.int_opt("name"), None);
        assert_eq!(rec.text_opt("missing"), None);
    }

    #[test]
    fn test_duplicate_ident_keeps_position() {
        let rec = Record::parse("a=1 b=2 a=3");
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.int("a").unwrap(), 3);
        assert_eq!(rec.idents().next(), Some("a"));
    }

    #[test]
    fn test_indexed_records() {
        let mut idx = IndexedRecords::default();
        idx.insert(FieldValue::Int(1), Record::parse("cid=1 name=a"));
        idx.insert(FieldValue::Text("x".to_string()), Record::parse("name=x"));
        idx.insert(FieldValue::Int(1), Record::parse("cid=1 name=b"));
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get_int(1).unwrap().text("name").unwrap(), "b");
        assert!(idx.get_text("x").is_some());
        assert_eq!(idx.first_key(), Some(&FieldValue::Int(1)));
    }
}
