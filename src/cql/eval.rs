//! Evaluator for rendered CQL statements.

use serde_json::Value as Json;

use super::ast::{Condition, ConditionType, Expression, Operation, Operator, Statement, Value};
use super::error::EvalError;
use super::regex_cache;
use crate::context::{Lookup, kind_name};

/// Evaluate a rendered statement against a data source.
pub fn evaluate<L: Lookup + ?Sized>(statement: &Statement, data: &L) -> Result<bool, EvalError> {
    if !statement.is_rendered() {
        return Err(EvalError::Unrendered);
    }
    evaluate_expression(&statement.expression, data)
}

fn evaluate_expression<L: Lookup + ?Sized>(
    expr: &Expression,
    data: &L,
) -> Result<bool, EvalError> {
    match expr {
        Expression::Condition(cond) => evaluate_condition(cond, data),
        Expression::Operation(op) => evaluate_operation(op, data),
    }
}

/// Both sides are always evaluated so an error on either side surfaces.
fn evaluate_condition<L: Lookup + ?Sized>(
    cond: &Condition,
    data: &L,
) -> Result<bool, EvalError> {
    let left = evaluate_expression(&cond.left, data)?;
    let right = evaluate_expression(&cond.right, data)?;
    Ok(match cond.kind {
        ConditionType::And => left && right,
        ConditionType::Or => left || right,
    })
}

fn evaluate_operation<L: Lookup + ?Sized>(op: &Operation, data: &L) -> Result<bool, EvalError> {
    match op.operator {
        Operator::Eq => equals(&op.left, &op.right, data),
        Operator::Ne => equals(&op.left, &op.right, data).map(|matched| !matched),
        other => Err(EvalError::NotImplemented(other.to_string())),
    }
}

/// Require the stored value to be a string.
fn stored_string<'a, L: Lookup + ?Sized>(key: &str, data: &'a L) -> Result<&'a str, EvalError> {
    let stored = data.lookup(key);
    match stored {
        Some(Json::String(s)) => Ok(s),
        other => Err(EvalError::ExpectedString {
            key: key.to_string(),
            actual: kind_name(other),
        }),
    }
}

fn equals<L: Lookup + ?Sized>(key: &str, value: &Value, data: &L) -> Result<bool, EvalError> {
    match value {
        Value::ContextKey(other) => Ok(data.compare(data.lookup(key), data.lookup(other))),

        Value::Regexp(pattern) => {
            let text = stored_string(key, data)?;
            let rx = regex_cache::shared().compile(pattern).map_err(|source| {
                EvalError::RegexCompile {
                    pattern: pattern.clone(),
                    source,
                }
            })?;
            Ok(rx.is_match(text))
        }

        Value::String(expected) => Ok(stored_string(key, data)? == expected.as_str()),

        Value::Int(n) => Ok(data.compare(data.lookup(key), Some(&Json::from(*n)))),
        Value::Float(n) => Ok(data.compare(data.lookup(key), Some(&Json::from(*n)))),
        Value::Bool(b) => Ok(data.compare(data.lookup(key), Some(&Json::Bool(*b)))),
        Value::Nil => Ok(data.compare(data.lookup(key), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cql::compile;
    use serde_json::json;
    use std::collections::HashMap;

    fn data(pairs: &[(&str, Json)]) -> HashMap<String, Json> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn eval(query: &str, data: &HashMap<String, Json>) -> Result<bool, EvalError> {
        let stmt = compile(query).unwrap().render().unwrap();
        evaluate(&stmt, data)
    }

    #[test]
    fn test_string_equality() {
        let d = data(&[("x", json!("v")), ("n", json!(3))]);
        assert!(eval(".x == 'v'", &d).unwrap());
        assert!(!eval(".x == 'w'", &d).unwrap());
        assert!(!eval(".x != 'v'", &d).unwrap());
        assert!(eval(".x != \"w\"", &d).unwrap());
    }

    #[test]
    fn test_string_type_errors() {
        let d = data(&[("n", json!(3))]);
        let err = eval(".n == 'v'", &d).unwrap_err();
        assert_eq!(err.to_string(), "n is of type int, expected string");
        // != does not turn an error into a match
        assert!(eval(".n != 'v'", &d).is_err());
        let err = eval(".missing == 'v'", &d).unwrap_err();
        assert_eq!(err.to_string(), "missing is of type nil, expected string");
    }

    #[test]
    fn test_regexp() {
        let d = data(&[("x", json!("abc")), ("y", json!("zabc")), ("n", json!(1))]);
        assert!(eval(".x == m/^a.*/", &d).unwrap());
        assert!(!eval(".y == m/^a.*/", &d).unwrap());
        assert!(eval(".y == m/b/", &d).unwrap());
        assert!(eval(".y != m!^a!", &d).unwrap());
        assert!(matches!(
            eval(".n == m/1/", &d),
            Err(EvalError::ExpectedString { .. })
        ));
        assert!(matches!(
            eval(".x == m/(/", &d),
            Err(EvalError::RegexCompile { .. })
        ));
    }

    #[test]
    fn test_context_key_comparison() {
        let d = data(&[
            ("a", json!(1)),
            ("b", json!(1.0)),
            ("c", json!("1")),
            ("l", json!([1, 2])),
            ("m", json!([1, 2])),
        ]);
        assert!(eval(".a == .b", &d).unwrap());
        assert!(!eval(".a == .c", &d).unwrap());
        assert!(eval(".l == .m", &d).unwrap());
        assert!(eval(".a != .c", &d).unwrap());
        // two missing keys are both nil
        assert!(eval(".nope == .gone", &d).unwrap());
        assert!(!eval(".a == .gone", &d).unwrap());
    }

    #[test]
    fn test_scalar_literals() {
        let d = data(&[
            ("i", json!(2)),
            ("f", json!(2.5)),
            ("t", json!(true)),
            ("z", Json::Null),
        ]);
        assert!(eval(".i == 2", &d).unwrap());
        assert!(eval(".i == 2.0", &d).unwrap());
        assert!(eval(".f == 2.5", &d).unwrap());
        assert!(eval(".t == true", &d).unwrap());
        assert!(eval(".t != false", &d).unwrap());
        assert!(eval(".z == nil", &d).unwrap());
        assert!(eval(".missing == nil", &d).unwrap());
        assert!(!eval(".i == nil", &d).unwrap());
        assert!(eval(".i == 'x'", &d).is_err());
    }

    #[test]
    fn test_conditions() {
        let d = data(&[("a", json!("1")), ("b", json!("2"))]);
        assert!(eval("(.a == '1') AND (.b == '2')", &d).unwrap());
        assert!(!eval("(.a == '1') AND (.b == '3')", &d).unwrap());
        assert!(eval("(.a == '9') OR (.b == '2')", &d).unwrap());
        assert!(!eval("(.a == '9') OR (.b == '9')", &d).unwrap());
    }

    #[test]
    fn test_conditions_evaluate_both_sides() {
        let d = data(&[("a", json!("1")), ("n", json!(5))]);
        // left already decides the outcome, right still errors
        assert!(eval("(.a == '2') AND (.n == 'x')", &d).is_err());
        assert!(eval("(.a == '1') OR (.n == 'x')", &d).is_err());
        // left error wins
        let err = eval("(.n == m/x/) OR (.a =~ /x/)", &d).unwrap_err();
        assert!(matches!(err, EvalError::ExpectedString { .. }));
    }

    #[test]
    fn test_not_implemented() {
        let d = data(&[("a", json!("x"))]);
        let err = eval(".a =~ /x/", &d).unwrap_err();
        assert_eq!(err.to_string(), "=~ not implemented");
        let err = eval(".a !~ /x/", &d).unwrap_err();
        assert_eq!(err.to_string(), "!~ not implemented");
    }

    #[test]
    fn test_unrendered_statement_is_rejected() {
        let d = data(&[("a", json!("x"))]);
        let stmt = compile(".a == 'x'").unwrap();
        assert!(matches!(evaluate(&stmt, &d), Err(EvalError::Unrendered)));
    }
}
