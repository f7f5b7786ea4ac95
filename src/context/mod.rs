//! Key-value documents that queries are evaluated against.
//!
//! The evaluator only needs [`Lookup`]; [`Context`] is a small JSON-backed
//! implementation with dotted-path access.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

use crate::cql::{self, Error};

/// Read access to a data source.
pub trait Lookup {
    /// Value stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<&Value>;

    /// Deep, type-aware equality. Missing values compare like `null`.
    fn compare(&self, a: Option<&Value>, b: Option<&Value>) -> bool {
        values_equal(a, b)
    }
}

/// Deep equality across JSON values.
///
/// Numbers compare by value regardless of integer or float representation,
/// and a missing value equals `null`.
pub fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|(x, y)| values_equal(Some(x), Some(y)))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(Some(x), Some(y))))
        }
        (x, y) => x == y,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (x.is_f64(), y.is_f64()) {
        (false, false) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_u64() == y.as_u64(),
        },
        (true, true) => x.as_f64() == y.as_f64(),
        (true, false) => float_equals_int(x.as_f64(), y),
        (false, true) => float_equals_int(y.as_f64(), x),
    }
}

/// Exact comparison; a float only equals an integer it represents exactly.
fn float_equals_int(f: Option<f64>, n: &Number) -> bool {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

    let Some(f) = f else {
        return false;
    };
    if f.fract() != 0.0 {
        return false;
    }
    if let Some(i) = n.as_i64() {
        (-TWO_POW_63..TWO_POW_63).contains(&f) && f as i64 == i
    } else if let Some(u) = n.as_u64() {
        (0.0..2.0 * TWO_POW_63).contains(&f) && f as u64 == u
    } else {
        false
    }
}

/// Name of a value's kind, as used in evaluation errors.
pub fn kind_name(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "nil",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(n)) if n.is_f64() => "float",
        Some(Value::Number(_)) => "int",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "list",
        Some(Value::Object(_)) => "map",
    }
}

/// Walk a dotted path (`page.tags.0`) through nested objects and arrays.
fn get_path<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = root.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A JSON object document.
///
/// Lookups try the exact key first, then treat the key as a dotted path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Store a value under an exact key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).or_else(|| get_path(&self.0, key))
    }

    /// Keys present and not null.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Check whether this document matches a query.
    pub fn match_ql(&self, query: &str) -> Result<bool, Error> {
        cql::match_query(self, query)
    }
}

impl Lookup for Context {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Lookup for HashMap<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

impl Lookup for Map<String, Value> {
    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key).or_else(|| get_path(self, key))
    }
}

/// An ordered collection of documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contexts(pub Vec<Context>);

impl Contexts {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.0.iter()
    }

    /// Documents matching `query`, in their original order.
    ///
    /// The query is compiled once and evaluated in parallel. Documents that
    /// fail to evaluate are treated as non-matching.
    pub fn find_ql(&self, query: &str) -> Result<Vec<&Context>, Error> {
        let statement = cql::compile(query)?.render()?;

        let found = self
            .0
            .par_iter()
            .filter(|ctx| match cql::evaluate(&statement, *ctx) {
                Ok(matched) => matched,
                Err(e) => {
                    tracing::debug!(error = %e, "document skipped");
                    false
                }
            })
            .collect();
        Ok(found)
    }

    /// First non-null value stored under `key`.
    pub fn first_value(&self, key: &str) -> Option<&Value> {
        self.iter().find_map(|ctx| ctx.get(key).filter(|v| !v.is_null()))
    }

    /// All non-null values stored under `key`.
    pub fn values(&self, key: &str) -> Vec<&Value> {
        self.iter()
            .filter_map(|ctx| ctx.get(key).filter(|v| !v.is_null()))
            .collect()
    }
}

impl From<Vec<Context>> for Contexts {
    fn from(contexts: Vec<Context>) -> Self {
        Self(contexts)
    }
}
