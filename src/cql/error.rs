//! Error types for compiling, rendering and evaluating queries.

use std::fmt;

/// Source name used in the raw `source:line:column: message` form.
const SOURCE: &str = "cql";

/// A query that failed to lex or parse.
///
/// `column` is 1-based and counts characters of the trimmed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    raw: String,
    pub query: String,
    pub column: Option<usize>,
    pub message: String,
}

impl ParseError {
    /// Build an error from a structured parser failure.
    pub fn new(query: impl Into<String>, column: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            raw: format!("{SOURCE}:1:{column}: {message}"),
            query: query.into(),
            column: Some(column),
            message,
        }
    }

    /// Wrap a failure that only exists as text.
    ///
    /// The column and message are extracted when the text has exactly four
    /// colon separated segments (`source:line:column:message`). Otherwise
    /// the column stays unknown and the message empty.
    pub fn from_raw(query: impl Into<String>, raw: impl fmt::Display) -> Self {
        let raw = raw.to_string();
        let mut column = None;
        let mut message = String::new();

        let parts: Vec<&str> = raw.split(':').collect();
        if let [_, _, col, msg] = parts.as_slice() {
            column = col.trim().parse::<usize>().ok();
            message = msg.trim().to_string();
        }

        Self {
            raw,
            query: query.into(),
            column,
            message,
        }
    }

    /// The column as a signed index, `-1` when unknown.
    pub fn column_index(&self) -> i64 {
        self.column.map_or(-1, |c| c as i64)
    }

    /// Two-line diagnostic pointing a caret at the offending column.
    pub fn pretty(&self) -> String {
        match self.column {
            None => format!("internal error: {}", self.raw),
            Some(column) => {
                let indent = " ".repeat(column.saturating_sub(1));
                format!("{}\n{}^- error: {}\n", self.query, indent, self.message)
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::error::Error for ParseError {}

/// A literal whose quoting could not be stripped, or a statement that
/// could not be serialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("expected closing quote \"{quote}\" in {literal}")]
    ExpectedClosingQuote { quote: char, literal: String },

    #[error("expected closing character \"{delimiter}\" in {literal}")]
    ExpectedClosingCharacter { delimiter: char, literal: String },

    #[error("failed to serialize statement: {0}")]
    Serialize(String),
}

/// Failures while evaluating a rendered statement.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    #[error("{0} not implemented")]
    NotImplemented(String),

    #[error("{key} is of type {actual}, expected string")]
    ExpectedString { key: String, actual: &'static str },

    #[error("regexp compile error: {pattern}: {source}")]
    RegexCompile {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("statement has not been rendered")]
    Unrendered,
}

/// Any failure from [`match_query`](super::match_query).
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
