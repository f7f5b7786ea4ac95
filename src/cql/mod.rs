//! Context Query Language: boolean filters over key-value documents.
//!
//! Syntax:
//!   .key == 'text'               - exact string match
//!   .key != "text"               - negated match
//!   .key == m/pattern/           - regexp search (also !…!, @…@, ~…~)
//!   .key == .other               - compare with another key's value
//!   .key == 10, 1.5, true, nil   - typed literals
//!   (expr) AND (expr)            - both hold
//!   (expr) OR (expr)             - either holds
//!
//! Keys are dotted paths. Keywords are case-insensitive. Only two
//! expressions combine per level; group longer chains with parentheses.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
pub mod regex_cache;
mod render;

pub use ast::*;
pub use error::{Error, EvalError, ParseError, RenderError};
pub use eval::evaluate;
pub use lexer::{LexError, Lexeme, Token, tokenize};
pub use parser::{GRAMMAR, MAX_DEPTH, parse};
pub use render::{collect_context_keys, unquote_regexp, unquote_string};

use crate::context::Lookup;

/// Parse a query and attach the keys it references.
pub fn compile(query: &str) -> Result<Statement, ParseError> {
    let mut statement = parse(query)?;
    statement.context_keys = collect_context_keys(&statement.expression);
    tracing::debug!(query = %statement, keys = ?statement.context_keys, "compiled query");
    Ok(statement)
}

/// Compile, render and evaluate `query` against `data` in one call.
pub fn match_query<L: Lookup + ?Sized>(data: &L, query: &str) -> Result<bool, Error> {
    let statement = compile(query)?.render()?;
    Ok(evaluate(&statement, data)?)
}

/// The grammar accepted by [`compile`].
pub fn grammar() -> &'static str {
    GRAMMAR
}
