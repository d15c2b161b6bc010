//! Protocol constants
//!
//! Separators, sentinel tokens and the default dialect prefixes used by the
//! query protocol.

// ============================================================================
// Separators
// ============================================================================

/// Terminates every line on the wire.
pub const SEPARATOR_LINE: char = '\n';
/// Separates rows of a response and cell-groups of a bulk command.
pub const SEPARATOR_LIST: char = '|';
/// Separates cells within a row.
pub const SEPARATOR_CELL: char = ' ';
/// Separates an ident from its value inside a cell.
pub const SEPARATOR_PAIR: char = '=';

// ============================================================================
// Sentinel Tokens
// ============================================================================

/// First cell of the terminal status line of every response.
pub const ERROR_SENTINEL: &str = "error";
/// Prefix of every unsolicited notification line.
pub const EVENT_PREFIX: &str = "notify";
/// Trailer appended when a notification payload is parsed as a one-row reply.
pub const SYNTHETIC_OK: &str = "error id=0 msg=ok";

// ============================================================================
// Error Codes
// ============================================================================

/// Remote status id for success.
pub const ERROR_ID_OK: i64 = 0x00;
/// Code used for verbs disabled on the client side.
pub const ERROR_CODE_COMMAND_NOT_FOUND: i64 = 0x100;
/// Code used when a requested ident is missing from a record.
pub const ERROR_CODE_INVALID_PARAMETER: i64 = 0x602;
/// Code used when a permission name or id cannot be resolved.
pub const ERROR_CODE_INVALID_PERMISSION: i64 = 0xA02;

// ============================================================================
// Dialect Defaults
// ============================================================================

/// Identifiers a server may greet with on the first line after connecting.
pub const DEFAULT_PROTOCOL_IDENTS: &[&str] = &["TS3", "TeaSpeak"];
/// Prefixes of informational banner lines sent after connecting.
pub const DEFAULT_GREETING_PREFIXES: &[&str] = &["Welcome"];
