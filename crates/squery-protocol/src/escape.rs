//! Escaping of protocol-reserved characters.
//!
//! Every value placed on the wire is escaped so that it never contains a cell,
//! list or line separator. The table is fixed and ordered: backslash comes
//! first so that sequences produced by earlier substitutions are never escaped
//! a second time.

/// Ordered mapping of raw characters to their two-character escape sequence.
const STANDARD_PATTERNS: &[(char, char)] = &[
    ('\\', '\\'),
    ('/', '/'),
    (' ', 's'),
    ('|', 'p'),
    (';', ';'),
    ('\u{07}', 'a'),
    ('\u{08}', 'b'),
    ('\u{0C}', 'f'),
    ('\n', 'n'),
    ('\r', 'r'),
    ('\t', 't'),
    ('\u{0B}', 'v'),
];

/// An immutable escape table.
///
/// Built once and passed around by reference; the standard table is available
/// as a `'static` value through [`EscapeTable::standard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeTable {
    patterns: &'static [(char, char)],
}

static STANDARD: EscapeTable = EscapeTable {
    patterns: STANDARD_PATTERNS,
};

impl Default for EscapeTable {
    fn default() -> Self {
        *Self::standard()
    }
}

impl EscapeTable {
    /// The table used by the query protocol.
    pub fn standard() -> &'static EscapeTable {
        &STANDARD
    }

    /// Iterate over `(raw, escaped)` pairs in table order.
    pub fn patterns(&self) -> impl Iterator<Item = (char, String)> + '_ {
        self.patterns
            .iter()
            .map(|&(raw, code)| (raw, format!("\\{}", code)))
    }

    fn code_for(&self, raw: char) -> Option<char> {
        self.patterns
            .iter()
            .find(|(r, _)| *r == raw)
            .map(|(_, code)| *code)
    }

    fn raw_for(&self, code: char) -> Option<char> {
        self.patterns
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(raw, _)| *raw)
    }

    /// Escape every reserved character in `text`.
    pub fn escape(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 8);
        for ch in text.chars() {
            match self.code_for(ch) {
                Some(code) => {
                    out.push('\\');
                    out.push(code);
                }
                None => out.push(ch),
            }
        }
        out
    }

    /// Reverse [`escape`](Self::escape).
    ///
    /// Unknown sequences and a trailing lone backslash are kept verbatim.
    pub fn unescape(&self, text: &str) -> String {
        if !text.contains('\\') {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some(code) => match self.raw_for(code) {
                    Some(raw) => out.push(raw),
                    None => {
                        out.push('\\');
                        out.push(code);
                    }
                },
                None => out.push('\\'),
            }
        }
        out
    }
}

/// Escape `text` with the standard table.
pub fn escape(text: &str) -> String {
    EscapeTable::standard().escape(text)
}

/// Unescape `text` with the standard table.
pub fn unescape(text: &str) -> String {
    EscapeTable::standard().unescape(text)
}
