//! Commands that can be sent to the server.
//!
//! A [`Command`] is a verb plus an ordered list of parameters. Scalar
//! parameters become `ident=value` cells, flag parameters become bare cells,
//! and sequence parameters are transposed into `|`-separated cell-groups for
//! bulk operations:
//!
//! ```text
//! clientkick reasonid=5 clid=1|clid=2|clid=3
//! ```

use std::fmt;

use crate::constants::{SEPARATOR_CELL, SEPARATOR_LIST, SEPARATOR_PAIR};
use crate::escape::escape;

/// Numeric identifier of a remote entity (server, channel, client, group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller-side object that stands in for a remote entity.
///
/// Entity references are resolved to their numeric id when a command is
/// encoded.
pub trait Entity {
    /// The remote identifier of this entity.
    fn entity_id(&self) -> EntityId;
}

impl Entity for EntityId {
    fn entity_id(&self) -> EntityId {
        *self
    }
}

// ============================================================================
// Parameter Values
// ============================================================================

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Dropped from the encoded command.
    Null,
    /// Encoded as `1` or `0`.
    Bool(bool),
    /// Encoded in decimal.
    Int(i64),
    /// Encoded escaped.
    Text(String),
    /// Encoded as the entity's numeric id.
    Entity(EntityId),
}

impl ParamValue {
    /// Wire form of this value, escaped. `None` for [`ParamValue::Null`].
    pub fn to_wire(&self) -> Option<String> {
        match self {
            ParamValue::Null => None,
            ParamValue::Bool(true) => Some("1".to_string()),
            ParamValue::Bool(false) => Some("0".to_string()),
            ParamValue::Int(v) => Some(v.to_string()),
            ParamValue::Text(s) => Some(escape(s)),
            ParamValue::Entity(id) => Some(id.to_string()),
        }
    }

    /// Reference an entity by its id.
    pub fn entity<E: Entity + ?Sized>(entity: &E) -> Self {
        ParamValue::Entity(entity.entity_id())
    }

    /// Check if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u16> for ParamValue {
    fn from(v: u16) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u8> for ParamValue {
    fn from(v: u8) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<&String> for ParamValue {
    fn from(v: &String) -> Self {
        ParamValue::Text(v.clone())
    }
}

impl From<EntityId> for ParamValue {
    fn from(v: EntityId) -> Self {
        ParamValue::Entity(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => ParamValue::Null,
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// How a parameter is keyed on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKey {
    /// Encoded as `ident=value`. The ident is lower-cased.
    Named(String),
    /// Encoded as the bare value, e.g. `-new` or `-uid`.
    Flag,
}

/// A parameter's value: a single scalar or a sequence for bulk commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamInput {
    /// A single value in the flat argument section.
    Scalar(ParamValue),
    /// One value per cell-group.
    List(Vec<ParamValue>),
}

/// One keyed parameter of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// The key.
    pub key: ParamKey,
    /// The value.
    pub input: ParamInput,
}

impl Param {
    /// A named scalar parameter.
    pub fn scalar(ident: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Param {
            key: ParamKey::Named(ident.into()),
            input: ParamInput::Scalar(value.into()),
        }
    }

    /// A named sequence parameter.
    pub fn list<I, V>(ident: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Param {
            key: ParamKey::Named(ident.into()),
            input: ParamInput::List(values.into_iter().map(Into::into).collect()),
        }
    }

    /// A bare flag.
    pub fn flag(value: impl Into<ParamValue>) -> Self {
        Param {
            key: ParamKey::Flag,
            input: ParamInput::Scalar(value.into()),
        }
    }

    fn cell(&self, value: &ParamValue) -> Option<String> {
        let wire = value.to_wire()?;
        match &self.key {
            ParamKey::Named(ident) => Some(format!(
                "{}{}{}",
                ident.to_lowercase(),
                SEPARATOR_PAIR,
                wire
            )),
            ParamKey::Flag => Some(wire),
        }
    }
}

// ============================================================================
// Command
// ============================================================================

/// A command verb with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    params: Vec<Param>,
}

impl Command {
    /// Create a command with no parameters.
    pub fn new(verb: impl Into<String>) -> Self {
        Command {
            verb: verb.into(),
            params: Vec::new(),
        }
    }

    /// Append a named scalar parameter.
    pub fn arg(mut self, ident: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push(Param::scalar(ident, value));
        self
    }

    /// Append a named sequence parameter.
    pub fn list<I, V>(mut self, ident: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.params.push(Param::list(ident, values));
        self
    }

    /// Append a bare flag such as `-new`.
    pub fn flag(mut self, value: impl Into<ParamValue>) -> Self {
        self.params.push(Param::flag(value));
        self
    }

    /// Append an already-built parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// The command verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The parameters in insertion order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Encode the command as one wire line, without the line terminator.
    pub fn encode(&self) -> String {
        prepare(&self.verb, &self.params)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Build a wire line from a verb and its parameters.
///
/// Null values are dropped. Sequence parameters are transposed so that
/// cell-group `i` holds element `i` of every sequence; a group left empty by
/// nulls is omitted.
pub fn prepare(verb: &str, params: &[Param]) -> String {
    let mut args: Vec<String> = Vec::new();
    let mut groups: Vec<Vec<String>> = Vec::new();

    for param in params {
        match &param.input {
            ParamInput::Scalar(value) => {
                if let Some(cell) = param.cell(value) {
                    args.push(cell);
                }
            }
            ParamInput::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    let Some(cell) = param.cell(value) else {
                        continue;
                    };
                    if groups.len() <= i {
                        groups.resize_with(i + 1, Vec::new);
                    }
                    groups[i].push(cell);
                }
            }
        }
    }

    let mut line = verb.to_string();
    if !args.is_empty() {
        line.push(SEPARATOR_CELL);
        line.push_str(&args.join(&SEPARATOR_CELL.to_string()));
    }

    let groups: Vec<String> = groups
        .into_iter()
        .filter(|g| !g.is_empty())
        .map(|g| g.join(&SEPARATOR_CELL.to_string()))
        .collect();
    if !groups.is_empty() {
        line.push(SEPARATOR_CELL);
        line.push_str(&groups.join(&SEPARATOR_LIST.to_string()));
    }

    line.trim().to_string()
}
