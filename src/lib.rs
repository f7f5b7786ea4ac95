//! Context Query Language (CQL).
//!
//! Compile a textual boolean filter into an AST and evaluate it against any
//! key-value source implementing [`Lookup`].
//!
//! ```
//! use context_ql::{Context, match_query};
//!
//! let mut page = Context::new();
//! page.set("title", "Hello World").set("draft", false);
//!
//! assert!(match_query(&page, "(.title == m/^Hello/) AND (.draft == false)").unwrap());
//! ```

pub mod config;
pub mod context;
pub mod cql;
pub mod utils;

pub use context::{Context, Contexts, Lookup, values_equal};
pub use cql::{
    Error, EvalError, ParseError, RenderError, Statement, compile, evaluate, grammar, match_query,
};
