//! Parser for CQL.
//!
//! Conditions combine exactly two terms; a longer chain must be grouped
//! with parentheses so the tree always mirrors the query as written.

use super::ast::{Condition, ConditionType, Expression, Operation, Operator, Statement, Value};
use super::error::ParseError;
use super::lexer::{Lexeme, Token, tokenize};

/// Grammar accepted by [`parse`], in rough EBNF.
pub const GRAMMAR: &str = r#"Statement  = Expression EOF .
Expression = Term [ ( "AND" | "OR" ) Term ] .
Term       = "(" Expression ")" | Operation .
Operation  = "." <ident> ( "==" | "!=" | "=~" | "!~" ) Value .
Value      = "." <ident>
           | [ "m" ] <regexp>
           | <string>
           | <int>
           | <float>
           | "true" | "false"
           | "nil" .
"#;

/// Deepest parenthesis nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 128;

/// Parser state.
struct Parser<'a> {
    query: &'a str,
    tokens: Vec<Lexeme>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(query: &'a str, tokens: Vec<Lexeme>) -> Self {
        Parser {
            query,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> &Lexeme {
        // tokenize always ends the stream with Eof
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek_token(&self) -> &Token {
        &self.peek().token
    }

    fn advance(&mut self) -> Lexeme {
        let lexeme = self.peek().clone();
        self.pos += 1;
        lexeme
    }

    fn error(&self, column: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(self.query, column, message)
    }

    fn unexpected(&self, lexeme: &Lexeme, expected: &str) -> ParseError {
        match lexeme.token {
            Token::Eof => self.error(
                lexeme.column,
                format!("unexpected end of query (expected {expected})"),
            ),
            ref token => self.error(
                lexeme.column,
                format!("unexpected token \"{token}\" (expected {expected})"),
            ),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        let lexeme = self.advance();
        if lexeme.token == expected {
            Ok(())
        } else {
            Err(self.unexpected(&lexeme, &format!("\"{expected}\"")))
        }
    }

    /// Parse a whole statement: Expression EOF
    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let expression = self.parse_expression()?;
        let next = self.advance();
        if next.token != Token::Eof {
            return Err(self.unexpected(&next, "end of query"));
        }
        Ok(Statement::new(expression))
    }

    fn peek_condition_type(&self) -> Option<ConditionType> {
        match self.peek_token() {
            Token::Keyword(k) => ConditionType::from_keyword(k),
            _ => None,
        }
    }

    /// Parse Term [ (AND|OR) Term ]
    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_term()?;

        let Some(kind) = self.peek_condition_type() else {
            return Ok(left);
        };
        self.advance(); // consume AND/OR
        let right = self.parse_term()?;

        if self.peek_condition_type().is_some() {
            return Err(self.error(
                self.peek().column,
                "parentheses required to combine more than two expressions",
            ));
        }

        Ok(Expression::Condition(Box::new(Condition { kind, left, right })))
    }

    /// Parse "(" Expression ")" | Operation
    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        match self.peek_token() {
            Token::LParen => {
                let open = self.advance();
                if self.depth == MAX_DEPTH {
                    return Err(self.error(open.column, "expressions nested too deeply"));
                }
                self.depth += 1;
                let inner = self.parse_expression()?;
                self.depth -= 1;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Dot => self.parse_operation().map(Expression::Operation),
            _ => Err(self.unexpected(self.peek(), "\"(\" or \".\"")),
        }
    }

    /// Parse "." Ident OP Value
    fn parse_operation(&mut self) -> Result<Operation, ParseError> {
        self.expect(Token::Dot)?;
        let left = self.parse_key()?;

        let lexeme = self.advance();
        let operator = match lexeme.token {
            Token::Eq => Operator::Eq,
            Token::Ne => Operator::Ne,
            Token::Match => Operator::Match,
            Token::NotMatch => Operator::NotMatch,
            _ => return Err(self.unexpected(&lexeme, "operator")),
        };

        let right = self.parse_value()?;
        Ok(Operation {
            left,
            operator,
            right,
        })
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        let lexeme = self.advance();
        match lexeme.token {
            Token::Ident(key) => Ok(key),
            _ => Err(self.unexpected(&lexeme, "key name")),
        }
    }

    /// Parse a single value.
    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let lexeme = self.advance();
        match lexeme.token {
            Token::Dot => self.parse_key().map(Value::ContextKey),
            Token::Ident(ref word) if word == "m" => match self.advance() {
                Lexeme {
                    token: Token::Regexp(pattern),
                    ..
                } => Ok(Value::Regexp(pattern)),
                other => Err(self.unexpected(&other, "regular expression")),
            },
            Token::Ident(ref word) if word == "nil" => Ok(Value::Nil),
            Token::Regexp(pattern) => Ok(Value::Regexp(pattern)),
            Token::Str(text) => Ok(Value::String(text)),
            Token::Int(n) => Ok(Value::Int(n)),
            Token::Float(n) => Ok(Value::Float(n)),
            Token::Keyword(ref k) if k == "TRUE" => Ok(Value::Bool(true)),
            Token::Keyword(ref k) if k == "FALSE" => Ok(Value::Bool(false)),
            _ => Err(self.unexpected(&lexeme, "value")),
        }
    }
}

/// Parse query text into an unrendered statement.
///
/// The query is trimmed first; columns refer to the trimmed text. Context
/// keys are not collected here, see [`compile`](super::compile).
pub fn parse(query: &str) -> Result<Statement, ParseError> {
    let query = query.trim();
    let tokens =
        tokenize(query).map_err(|e| ParseError::new(query, e.column, e.message))?;
    Parser::new(query, tokens).parse_statement()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(stmt: &Statement) -> &Operation {
        match &stmt.expression {
            Expression::Operation(op) => op,
            other => panic!("expected operation, got {other:?}"),
        }
    }

    #[test]
    fn test_simple_operation() {
        let stmt = parse(".title == 'Hello'").unwrap();
        assert_eq!(
            operation(&stmt),
            &Operation {
                left: "title".into(),
                operator: Operator::Eq,
                right: Value::String("'Hello'".into()),
            }
        );
        assert!(stmt.context_keys.is_empty());
        assert!(!stmt.is_rendered());
    }

    #[test]
    fn test_values() {
        let cases = [
            (".a == .b.c", Value::ContextKey("b.c".into())),
            (".a == m/x/", Value::Regexp("/x/".into())),
            (".a == !x!", Value::Regexp("!x!".into())),
            (".a == \"x\"", Value::String("\"x\"".into())),
            (".a == 10", Value::Int(10)),
            (".a == 1.5", Value::Float(1.5)),
            (".a == TRUE", Value::Bool(true)),
            (".a == false", Value::Bool(false)),
            (".a == nil", Value::Nil),
        ];
        for (query, expected) in cases {
            let stmt = parse(query).unwrap();
            assert_eq!(operation(&stmt).right, expected, "query: {query}");
        }
    }

    #[test]
    fn test_unsupported_operator_parses() {
        let stmt = parse(".a =~ /x/").unwrap();
        assert_eq!(operation(&stmt).operator, Operator::Match);
    }

    #[test]
    fn test_condition_keeps_grouping() {
        let stmt = parse("(.a == 1) and ((.b == 2) OR (.c == 3))").unwrap();
        let Expression::Condition(cond) = &stmt.expression else {
            panic!("expected condition");
        };
        assert_eq!(cond.kind, ConditionType::And);
        assert!(matches!(cond.left, Expression::Operation(_)));
        let Expression::Condition(inner) = &cond.right else {
            panic!("expected nested condition");
        };
        assert_eq!(inner.kind, ConditionType::Or);
    }

    #[test]
    fn test_unparenthesized_pair() {
        let stmt = parse(".a == 1 OR .b == 2").unwrap();
        assert_eq!(stmt.to_string(), "((.a == 1) OR (.b == 2))");
    }

    #[test]
    fn test_chain_requires_parentheses() {
        let err = parse(".a == 1 AND .b == 2 OR .c == 3").unwrap_err();
        assert_eq!(err.column, Some(21));
        assert!(err.message.contains("parentheses"));
        assert!(parse("(.a == 1 AND .b == 2) OR .c == 3").is_ok());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let stmt = parse("   .a == 1 \n").unwrap();
        assert_eq!(stmt.to_string(), "(.a == 1)");
    }

    #[test]
    fn test_round_trip() {
        let query = "((.a == 'x') OR ((.b != .c) AND (.d == m~^/p~)))";
        let stmt = parse(query).unwrap();
        assert_eq!(stmt.to_string(), query);
        assert_eq!(parse(&stmt.to_string()).unwrap(), stmt);
    }

    fn nested(depth: usize) -> String {
        format!("{}.a == 'x'{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        assert!(parse(&nested(MAX_DEPTH)).is_ok());

        let err = parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.column, Some(MAX_DEPTH + 1));
        assert_eq!(err.message, "expressions nested too deeply");

        // fails fast instead of recursing through the whole query
        let err = parse(&nested(10_000)).unwrap_err();
        assert_eq!(err.column, Some(MAX_DEPTH + 1));
    }

    #[test]
    fn test_errors_carry_columns() {
        let cases = [
            ("", 1, "unexpected end of query"),
            (".a ==", 6, "unexpected end of query (expected value)"),
            (".a 'x'", 4, "unexpected token \"'x'\" (expected operator)"),
            ("a == 'x'", 1, "unexpected token \"a\" (expected \"(\" or \".\")"),
            ("(.a == 'x'", 11, "unexpected end of query (expected \")\")"),
            (".a == 'x')", 10, "unexpected token \")\" (expected end of query)"),
            (".a == m'x'", 8, "unexpected token \"'x'\" (expected regular expression)"),
            (".a == 'x", 7, "unterminated string literal"),
        ];
        for (query, column, message) in cases {
            let err = parse(query).unwrap_err();
            assert_eq!(err.column, Some(column), "query: {query:?}");
            assert!(
                err.message.starts_with(message),
                "query: {query:?}, message: {}",
                err.message
            );
            assert_eq!(err.query, query.trim());
        }
    }
}
