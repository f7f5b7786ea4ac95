//! AST types for CQL.

use serde::Serialize;
use std::fmt;

/// Root of a compiled query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub(crate) expression: Expression,

    /// Every key referenced in the tree, deduplicated and naturally sorted.
    /// Empty until the statement is compiled or rendered.
    #[serde(rename = "context-keys", skip_serializing_if = "Vec::is_empty")]
    pub(crate) context_keys: Vec<String>,

    #[serde(skip)]
    pub(crate) rendered: bool,
}

impl Statement {
    /// Wrap an expression in a fresh, unrendered statement.
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            context_keys: Vec::new(),
            rendered: false,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Every key referenced in the tree, deduplicated and naturally sorted.
    pub fn context_keys(&self) -> &[String] {
        &self.context_keys
    }

    /// True only for the output of [`Statement::render`].
    pub fn is_rendered(&self) -> bool {
        self.rendered
    }
}

/// An AST node: either a combinator or a leaf predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Condition(Box<Condition>),
    Operation(Operation),
}

/// `left AND right` or `left OR right`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionType {
    And,
    Or,
}

impl ConditionType {
    /// Match an uppercase keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "AND" => Some(ConditionType::And),
            "OR" => Some(ConditionType::Or),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionType::And => write!(f, "AND"),
            ConditionType::Or => write!(f, "OR"),
        }
    }
}

/// Leaf predicate: `.key OP value`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub left: String,
    #[serde(rename = "type")]
    pub operator: Operator,
    pub right: Value,
}

/// Operation operator. Only `==` and `!=` are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "=~")]
    Match,
    #[serde(rename = "!~")]
    NotMatch,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "=="),
            Operator::Ne => write!(f, "!="),
            Operator::Match => write!(f, "=~"),
            Operator::NotMatch => write!(f, "!~"),
        }
    }
}

/// Right-hand side of an operation.
///
/// `String` and `Regexp` hold the raw literal, quotes and delimiters
/// included, until the statement is rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Value {
    /// Reference to another key, compared by value
    ContextKey(String),
    Regexp(String),
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::ContextKey(key) => write!(f, ".{key}"),
            Value::Regexp(pattern) => write!(f, "m{pattern}"),
            Value::String(text) => write!(f, "{text}"),
            Value::Int(n) => write!(f, "{n}"),
            // keep the decimal point so the text lexes back as a float
            Value::Float(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{n:.1}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => write!(f, "nil"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Operation(op) => {
                write!(f, "(.{} {} {})", op.left, op.operator, op.right)
            }
            Expression::Condition(cond) => {
                write!(f, "({} {} {})", cond.left, cond.kind, cond.right)
            }
        }
    }
}

/// Canonical query text. Rendered statements print nothing.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rendered {
            return Ok(());
        }
        write!(f, "{}", self.expression)
    }
}
