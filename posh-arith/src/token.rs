//! Tokenization of arithmetic expressions.

use std::ops::Range;
use thiserror::Error;

/// Atomic lexical element of an arithmetic expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token<'a> {
    /// A decimal integer literal, e.g. `123`.
    Number(&'a str),
    /// A variable name.
    Identifier(&'a str),
    Plus,
    Minus,
    Asterisk,
    Slash,
    OpenParen,
    CloseParen,
}

/// Cause of a tokenization error.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum TokenError {
    #[error("invalid character in arithmetic expression")]
    InvalidCharacter,
}

/// A token paired with the byte range it occupies in the source expression.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub location: Range<usize>,
}

/// Splits `source` into a vector of tokens, skipping ASCII whitespace.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, (TokenError, usize)> {
    let bytes = source.as_bytes();
    let mut i = 0;
    let mut tokens = Vec::new();
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let token = match c {
            b'+' => {
                i += 1;
                Token::Plus
            }
            b'-' => {
                i += 1;
                Token::Minus
            }
            b'*' => {
                i += 1;
                Token::Asterisk
            }
            b'/' => {
                i += 1;
                Token::Slash
            }
            b'(' => {
                i += 1;
                Token::OpenParen
            }
            b')' => {
                i += 1;
                Token::CloseParen
            }
            b'0'..=b'9' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                Token::Number(&source[start..i])
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                Token::Identifier(&source[start..i])
            }
            _ => return Err((TokenError::InvalidCharacter, start)),
        };
        tokens.push(Spanned {
            token,
            location: start..i,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_mixed_expression() {
        let tokens = tokenize("a * (b + 1)").unwrap();
        let kinds: Vec<_> = tokens.into_iter().map(|s| s.token).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Identifier("a"),
                Token::Asterisk,
                Token::OpenParen,
                Token::Identifier("b"),
                Token::Plus,
                Token::Number("1"),
                Token::CloseParen,
            ]
        );
    }
}
