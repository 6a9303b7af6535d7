//! Tokenizer for the expression language
//!
//! Built on logos. Lexing stops at the first byte no token matches; the
//! offending offset is reported in the error.

use crate::error::{ExprError, Result};
use logos::{Lexer, Logos};

/// A lexical token
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),
    // `1.foo` is member access on an int, not a float
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r#""([^"\\]|\\[^\n])*""#, unquote)]
    #[regex(r"'([^'\\]|\\[^\n])*'", unquote)]
    Str(String),
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
}

/// Strip the quotes from a string literal and resolve its escapes
///
/// `\n`, `\t` and `\r` are control characters; any other escaped
/// character stands for itself.
fn unquote(lex: &mut Lexer<Token>) -> String {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            text.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => text.push('\n'),
            Some('t') => text.push('\t'),
            Some('r') => text.push('\r'),
            Some(other) => text.push(other),
            None => {}
        }
    }
    text
}

/// Split expression source into tokens
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| token.map_err(|()| lex_error(source, span.start, span.end)))
        .collect()
}

fn lex_error(source: &str, start: usize, end: usize) -> ExprError {
    match source[start..].chars().next() {
        Some('\'' | '"') => ExprError::UnterminatedString(start),
        Some(ch) if ch.is_ascii_digit() => {
            ExprError::Syntax(format!("invalid number literal '{}'", &source[start..end]))
        }
        Some(ch) => ExprError::UnexpectedChar { ch, offset: start },
        None => ExprError::Syntax("unexpected end of input".to_string()),
    }
}
