//! Lexer/tokenizer for CQL.

use std::fmt;

use winnow::ascii::multispace0;
use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{any, take_till, take_while};

/// Keywords are matched case-insensitively and stored uppercase.
pub const KEYWORDS: [&str; 8] = ["TRUE", "FALSE", "NULL", "IS", "NOT", "AND", "OR", "IN"];

/// Characters that may open and close a regular expression literal.
pub const REGEXP_DELIMITERS: [char; 4] = ['/', '!', '@', '~'];

/// Characters that may open and close a string literal.
pub const QUOTES: [char; 2] = ['\'', '"'];

/// Token types for CQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(String), // uppercase
    Ident(String),   // dotted key path or bare word
    Int(i64),
    Float(f64),
    Str(String),    // raw, quotes included
    Regexp(String), // raw, delimiters included

    // Operators
    Eq,       // ==
    Ne,       // !=
    Match,    // =~
    NotMatch, // !~

    // Punctuation
    Dot,    // .
    Comma,  // ,
    LParen, // (
    RParen, // )

    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "{k}"),
            Token::Ident(s) | Token::Str(s) | Token::Regexp(s) => write!(f, "{s}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(n) => write!(f, "{n}"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Match => write!(f, "=~"),
            Token::NotMatch => write!(f, "!~"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "<EOF>"),
        }
    }
}

/// A token and the 1-based column it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub column: usize,
}

/// Where and why tokenizing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub column: usize,
    pub message: String,
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, ErrMode<ContextError>>;

fn backtrack<T>() -> PResult<T> {
    Err(ErrMode::Backtrack(ContextError::default()))
}

/// Lex a quoted string, keeping the quotes.
fn lex_string(input: &mut &str) -> PResult<Token> {
    let start = *input;
    let mut quote = any.verify(|c: &char| QUOTES.contains(c)).parse_next(input)?;
    let body = take_till(0.., quote).parse_next(input)?;
    quote.parse_next(input)?;
    Ok(Token::Str(start[..body.len() + 2].to_string()))
}

/// Lex a delimited regular expression, keeping the delimiters.
fn lex_regexp(input: &mut &str) -> PResult<Token> {
    let start = *input;
    let mut delim = any
        .verify(|c: &char| REGEXP_DELIMITERS.contains(c))
        .parse_next(input)?;
    let body = take_till(1.., delim).parse_next(input)?;
    delim.parse_next(input)?;
    Ok(Token::Regexp(start[..body.len() + 2].to_string()))
}

/// Lex an integer or float. A number may not run into a letter.
fn lex_number(input: &mut &str) -> PResult<Token> {
    let whole = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let fraction = if input.starts_with('.') && input[1..].starts_with(|c: char| c.is_ascii_digit())
    {
        '.'.parse_next(input)?;
        Some(take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?)
    } else {
        None
    };

    if input.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return backtrack();
    }

    let token = match fraction {
        Some(frac) => format!("{whole}.{frac}").parse().map(Token::Float).ok(),
        None => whole.parse().map(Token::Int).ok(),
    };
    match token {
        Some(t) => Ok(t),
        None => backtrack(),
    }
}

/// Lex a keyword or dotted identifier. Trailing dots are left in the input.
fn lex_word(input: &mut &str) -> PResult<Token> {
    if !input.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return backtrack();
    }
    let start = *input;
    let word = take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '.')
        .parse_next(input)?
        .trim_end_matches('.');
    *input = &start[word.len()..];

    let upper = word.to_ascii_uppercase();
    if KEYWORDS.contains(&upper.as_str()) {
        Ok(Token::Keyword(upper))
    } else {
        Ok(Token::Ident(word.to_string()))
    }
}

/// Lex a single token.
fn lex_token(input: &mut &str) -> PResult<Token> {
    multispace0.parse_next(input)?;

    if input.is_empty() {
        return Ok(Token::Eof);
    }

    alt((
        // Two-char operators before regexp delimiters so `!=` stays an operator
        "==".value(Token::Eq),
        "=~".value(Token::Match),
        "!=".value(Token::Ne),
        "!~".value(Token::NotMatch),
        lex_regexp,
        lex_string,
        lex_number,
        lex_word,
        ".".value(Token::Dot),
        ",".value(Token::Comma),
        "(".value(Token::LParen),
        ")".value(Token::RParen),
    ))
    .parse_next(input)
}

/// Explain why no token matched at the start of `rest`.
fn describe_failure(rest: &str) -> String {
    match rest.chars().next() {
        Some(c) if QUOTES.contains(&c) => "unterminated string literal".to_string(),
        Some(c) if REGEXP_DELIMITERS.contains(&c) => {
            "unterminated regular expression".to_string()
        }
        Some(c) if c.is_ascii_digit() => "invalid number".to_string(),
        Some(c) => format!("unexpected character '{c}'"),
        None => "unexpected end of query".to_string(),
    }
}

/// Tokenize the entire input. The last lexeme is always [`Token::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Lexeme>, LexError> {
    let column_at = |rest: &str| input[..input.len() - rest.len()].chars().count() + 1;

    let mut remaining = input;
    let mut lexemes = Vec::new();

    loop {
        let before = remaining.trim_start_matches([' ', '\t', '\r', '\n']);
        match lex_token(&mut remaining) {
            Ok(Token::Eof) => break,
            Ok(token) => lexemes.push(Lexeme {
                token,
                column: column_at(before),
            }),
            Err(_) => {
                return Err(LexError {
                    column: column_at(before),
                    message: describe_failure(before),
                });
            }
        }
    }

    lexemes.push(Lexeme {
        token: Token::Eof,
        column: column_at(remaining),
    });
    Ok(lexemes)
}
