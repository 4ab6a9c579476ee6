//! Lexer/tokenizer for expression text.

use winnow::ascii::{digit0, digit1, multispace0};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

/// Token types for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Identifiers and literals
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Comparison
    EqEq, // ==
    Ne,   // !=
    Lt,   // <
    Le,   // <=
    Gt,   // >
    Ge,   // >=

    // Arithmetic
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /

    // Boolean operators
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    LBrace,   // {
    RBrace,   // }
    Comma,    // ,

    // End of input
    Eof,
}

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn backtrack<T>() -> PResult<T> {
    Err(winnow::error::ErrMode::Backtrack(
        winnow::error::ContextError::default(),
    ))
}

/// Lex an identifier. Dots are allowed after the first character so flat
/// keys like `user.age` read as one name.
fn lex_ident(input: &mut &str) -> PResult<Token> {
    let name = (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_' || c == '.'),
    )
        .take()
        .parse_next(input)?;
    Ok(Token::Ident(name.to_string()))
}

/// Lex a number. Integers that do not fit in i64 become floats.
fn lex_number(input: &mut &str) -> PResult<Token> {
    let text = (
        digit1,
        opt(preceded('.', digit0)),
        opt((one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)),
    )
        .take()
        .parse_next(input)?;

    if !text.contains(['.', 'e', 'E']) {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Token::Int(i));
        }
    }
    match text.parse::<f64>() {
        Ok(f) => Ok(Token::Float(f)),
        Err(_) => backtrack(),
    }
}

/// Lex a single- or double-quoted string with backslash escapes.
fn lex_string(input: &mut &str) -> PResult<Token> {
    let quote = one_of(['"', '\'']).parse_next(input)?;
    let mut out = String::new();

    loop {
        match any.parse_next(input)? {
            c if c == quote => break,
            '\\' => match any.parse_next(input)? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                other => out.push(other),
            },
            c => out.push(c),
        }
    }

    Ok(Token::Str(out))
}

fn lex_operator(input: &mut &str) -> PResult<Token> {
    alt((
        // Multi-char operators first
        "==".value(Token::EqEq),
        "!=".value(Token::Ne),
        "<=".value(Token::Le),
        ">=".value(Token::Ge),
        "&&".value(Token::AndAnd),
        "||".value(Token::OrOr),
        // Single-char operators
        "<".value(Token::Lt),
        ">".value(Token::Gt),
        "+".value(Token::Plus),
        "-".value(Token::Minus),
        "*".value(Token::Star),
        "/".value(Token::Slash),
        "!".value(Token::Bang),
    ))
    .parse_next(input)
}

fn lex_punct(input: &mut &str) -> PResult<Token> {
    alt((
        "(".value(Token::LParen),
        ")".value(Token::RParen),
        "[".value(Token::LBracket),
        "]".value(Token::RBracket),
        "{".value(Token::LBrace),
        "}".value(Token::RBrace),
        ",".value(Token::Comma),
    ))
    .parse_next(input)
}

/// Lex a single token.
fn lex_token(input: &mut &str) -> PResult<Token> {
    multispace0.parse_next(input)?;

    if input.is_empty() {
        return Ok(Token::Eof);
    }

    alt((lex_operator, lex_punct, lex_number, lex_string, lex_ident)).parse_next(input)
}

/// Tokenize the entire input.
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    loop {
        let start = remaining;
        match lex_token(&mut remaining) {
            Ok(Token::Eof) => break,
            Ok(tok) => tokens.push(tok),
            Err(_) => {
                let rest = start.trim_start();
                let offset = input.len() - rest.len();
                return Err(format!("Lexer error at offset {}: '{}'", offset, rest));
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}
