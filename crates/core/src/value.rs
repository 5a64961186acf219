use std::fmt::Write as _;

/// Dynamic SQLite value: façade rows, `choices` literals, and bound
/// parameters all use this representation.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// One result row from the connection façade.
pub type Row = Vec<SqlValue>;

impl SqlValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the value as a SQL literal: single quotes around text with
    /// internal quotes doubled, `X'..'` hex notation for blobs.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(value) => value.to_string(),
            // Debug formatting keeps the decimal point on integral values,
            // so the literal stays a REAL when it is parsed back.
            Self::Real(value) => format!("{value:?}"),
            Self::Text(value) => quote_text(value),
            Self::Blob(bytes) => {
                let mut literal = String::with_capacity(bytes.len() * 2 + 3);
                literal.push_str("X'");
                for byte in bytes {
                    write!(literal, "{byte:02X}").expect("writing to String should not fail");
                }
                literal.push('\'');
                literal
            }
        }
    }
}

/// Double-quotes an identifier, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quotes a text literal, doubling embedded quotes.
#[must_use]
pub fn quote_text(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// ASCII identifier whitelist applied by the Column/Table builders.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// Canonicalizes a SQL type annotation: uppercased, whitespace runs
/// collapsed, and spaces dropped next to parentheses and commas so that
/// `decimal(10, 2)` and `DECIMAL(10,2)` compare equal.
#[must_use]
pub fn canonical_sql_type(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();

    let mut canonical = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ' '
            && let Some(&next) = chars.peek()
            && matches!(next, '(' | ')' | ',')
        {
            continue;
        }
        canonical.push(ch);
        if matches!(ch, '(' | ',') && chars.peek() == Some(&' ') {
            chars.next();
        }
    }

    canonical
}
