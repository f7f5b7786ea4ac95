//! Normalization pass: unquote literals and collect referenced keys.

use serde::Serialize;
use std::collections::HashSet;

use super::ast::{Condition, Expression, Operation, Statement, Value};
use super::error::RenderError;
use super::lexer::{QUOTES, REGEXP_DELIMITERS};
use crate::utils::natural_cmp;

/// Strip one matching pair of `'` or `"` from a string literal.
///
/// Text that does not start with a quote is returned as is.
pub fn unquote_string(literal: &str) -> Result<String, RenderError> {
    strip_pair(literal, &QUOTES).map_err(|quote| RenderError::ExpectedClosingQuote {
        quote,
        literal: literal.to_string(),
    })
}

/// Strip one matching pair of `/`, `!`, `@` or `~` from a regexp literal.
pub fn unquote_regexp(literal: &str) -> Result<String, RenderError> {
    strip_pair(literal, &REGEXP_DELIMITERS).map_err(|delimiter| {
        RenderError::ExpectedClosingCharacter {
            delimiter,
            literal: literal.to_string(),
        }
    })
}

fn strip_pair(literal: &str, delimiters: &[char]) -> Result<String, char> {
    let Some(open) = literal.chars().next().filter(|c| delimiters.contains(c)) else {
        return Ok(literal.to_string());
    };
    literal
        .strip_prefix(open)
        .and_then(|rest| rest.strip_suffix(open))
        .map(str::to_string)
        .ok_or(open)
}

/// Every key an expression reads, deduplicated and naturally sorted.
pub fn collect_context_keys(expression: &Expression) -> Vec<String> {
    fn walk<'a>(expr: &'a Expression, keys: &mut HashSet<&'a str>) {
        match expr {
            Expression::Operation(op) => {
                keys.insert(&op.left);
                if let Value::ContextKey(other) = &op.right {
                    keys.insert(other);
                }
            }
            Expression::Condition(cond) => {
                walk(&cond.left, keys);
                walk(&cond.right, keys);
            }
        }
    }

    let mut unique = HashSet::new();
    walk(expression, &mut unique);

    let mut keys: Vec<String> = unique.into_iter().map(str::to_string).collect();
    keys.sort_by(|a, b| natural_cmp(a, b));
    keys
}

fn render_value(value: &Value) -> Result<Value, RenderError> {
    Ok(match value {
        Value::String(raw) => Value::String(unquote_string(raw)?),
        Value::Regexp(raw) => Value::Regexp(unquote_regexp(raw)?),
        other => other.clone(),
    })
}

fn render_expression(expr: &Expression) -> Result<Expression, RenderError> {
    Ok(match expr {
        Expression::Operation(op) => Expression::Operation(Operation {
            left: op.left.clone(),
            operator: op.operator,
            right: render_value(&op.right)?,
        }),
        Expression::Condition(cond) => Expression::Condition(Box::new(Condition {
            kind: cond.kind,
            left: render_expression(&cond.left)?,
            right: render_expression(&cond.right)?,
        })),
    })
}

impl Statement {
    /// Produce the normalized, immutable copy used for evaluation.
    ///
    /// Rendering a rendered statement returns a plain copy.
    pub fn render(&self) -> Result<Statement, RenderError> {
        if self.rendered {
            return Ok(self.clone());
        }

        let expression = render_expression(&self.expression)?;
        let context_keys = collect_context_keys(&expression);
        tracing::trace!(keys = ?context_keys, "rendered statement");

        Ok(Statement {
            expression,
            context_keys,
            rendered: true,
        })
    }

    /// The rendered statement as pretty-printed JSON.
    pub fn stringify(&self) -> Result<String, RenderError> {
        to_pretty_json(&self.render()?)
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, RenderError> {
    serde_json::to_string_pretty(value).map_err(|e| RenderError::Serialize(e.to_string()))
}
