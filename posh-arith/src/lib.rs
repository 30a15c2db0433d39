//! POSIX shell arithmetic expansion.
//!
//! This crate implements the `$((...))` grammar restricted to the four basic
//! operators and parentheses, matching the shell core's arithmetic scope: no
//! comparisons, assignments, bitwise operators, or the ternary operator.
//!
//! Evaluation is two-phase: [`parse`] turns a source string into an [`Expr`]
//! tree, and [`Expr::eval`] walks the tree resolving variable atoms through a
//! caller-supplied [`Env`]. Splitting these phases lets `posh-syntax` parse an
//! arithmetic word part once at parse time and re-evaluate it on every command
//! execution without re-tokenizing.

mod ast;
mod env;
mod token;

pub use ast::{BinaryOp, Expr, Number, UnaryOp};
pub use env::Env;

use std::fmt;
use std::iter::Peekable;
use std::ops::Range;
use std::vec::IntoIter;
use thiserror::Error;
use token::{Spanned, Token, tokenize};

/// Result of evaluating an expression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => i.fmt(f),
            Value::Float(x) => x.fmt(f),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(i) => Value::Int(i),
            Number::Float(x) => Value::Float(x),
        }
    }
}

/// Cause of an arithmetic error, parameterized by the caller's variable
/// lookup error type.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ErrorCause<E> {
    #[error("invalid character in arithmetic expression")]
    InvalidCharacter,
    #[error("unexpected end of arithmetic expression")]
    UnexpectedEof,
    #[error("unexpected token in arithmetic expression")]
    UnexpectedToken,
    #[error("invalid numeric constant")]
    InvalidNumber,
    #[error("division by zero")]
    DivisionByZero,
    #[error(transparent)]
    VariableLookup(E),
}

/// An error together with the byte range in the source expression it refers
/// to, where known.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{cause}")]
pub struct Error<E> {
    pub cause: ErrorCause<E>,
    pub location: Range<usize>,
}

/// Parses `source` into an [`Expr`] without evaluating it.
pub fn parse<E>(source: &str) -> Result<Expr, Error<E>> {
    let tokens = tokenize(source).map_err(|(_, at)| Error {
        cause: ErrorCause::InvalidCharacter,
        location: at..at,
    })?;
    let mut parser = Parser {
        tokens: tokens.into_iter().peekable(),
        len: source.len(),
    };
    let expr = parser.expr()?;
    if let Some(extra) = parser.tokens.peek() {
        return Err(Error {
            location: extra.location.clone(),
            cause: ErrorCause::UnexpectedToken,
        });
    }
    Ok(expr)
}

/// Parses and immediately evaluates `source` against `env`. A convenience
/// wrapper over [`parse`] followed by [`Expr::eval`].
pub fn eval<Ev: Env>(source: &str, env: &Ev) -> Result<Value, Error<Ev::Error>> {
    parse(source)?.eval(env)
}

impl Expr {
    /// Evaluates the expression, resolving variable references via `env`.
    ///
    /// An unset variable evaluates to `0`, matching the shell's convention
    /// that unset parameters are empty (and an empty string parses as `0` in
    /// arithmetic context).
    pub fn eval<Ev: Env>(&self, env: &Ev) -> Result<Value, Error<Ev::Error>> {
        match self {
            Expr::Number(n) => Ok((*n).into()),
            Expr::Variable { name, location } => {
                let text = env
                    .get_variable(name)
                    .map_err(|e| Error {
                        cause: ErrorCause::VariableLookup(e),
                        location: location.clone(),
                    })?
                    .unwrap_or("0");
                parse_number(text, location).map(Value::from)
            }
            Expr::Unary { op, operand } => {
                let v = operand.eval(env)?;
                Ok(match op {
                    UnaryOp::Negate => negate(v),
                })
            }
            Expr::Binary {
                op,
                lhs,
                rhs,
                location,
            } => {
                let l = lhs.eval(env)?;
                let r = rhs.eval(env)?;
                apply(*op, l, r, location)
            }
        }
    }
}

fn negate(v: Value) -> Value {
    match v {
        Value::Int(i) => Value::Int(-i),
        Value::Float(x) => Value::Float(-x),
    }
}

fn apply<E>(op: BinaryOp, l: Value, r: Value, location: &Range<usize>) -> Result<Value, Error<E>> {
    use BinaryOp::*;
    match (op, l, r) {
        (Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
        (Subtract, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(b))),
        (Multiply, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(b))),
        (Divide, Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(Error {
                    cause: ErrorCause::DivisionByZero,
                    location: location.clone(),
                });
            }
            if a % b == 0 {
                Ok(Value::Int(a / b))
            } else {
                Ok(Value::Float(a as f64 / b as f64))
            }
        }
        (Add, a, b) => Ok(Value::Float(as_f64(a) + as_f64(b))),
        (Subtract, a, b) => Ok(Value::Float(as_f64(a) - as_f64(b))),
        (Multiply, a, b) => Ok(Value::Float(as_f64(a) * as_f64(b))),
        (Divide, a, b) => {
            let b = as_f64(b);
            if b == 0.0 {
                return Err(Error {
                    cause: ErrorCause::DivisionByZero,
                    location: location.clone(),
                });
            }
            Ok(Value::Float(as_f64(a) / b))
        }
    }
}

fn as_f64(v: Value) -> f64 {
    match v {
        Value::Int(i) => i as f64,
        Value::Float(x) => x,
    }
}

fn parse_number<E>(text: &str, location: &Range<usize>) -> Result<Number, Error<E>> {
    if let Ok(i) = text.parse::<i64>() {
        Ok(Number::Int(i))
    } else if let Ok(x) = text.parse::<f64>() {
        Ok(Number::Float(x))
    } else {
        Err(Error {
            cause: ErrorCause::InvalidNumber,
            location: location.clone(),
        })
    }
}

/// Recursive-descent parser over the flat token stream.
///
/// Grammar (lowest to highest precedence):
/// ```text
/// expr   = term (('+' | '-') term)*
/// term   = factor (('*' | '/') factor)*
/// factor = '-' factor | '(' expr ')' | number | identifier
/// ```
struct Parser<'a> {
    tokens: Peekable<IntoIter<Spanned<'a>>>,
    len: usize,
}

impl<'a> Parser<'a> {
    fn expr<E>(&mut self) -> Result<Expr, Error<E>> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.tokens.peek().map(|s| &s.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            let at = self.tokens.next().unwrap().location;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location: at,
            };
        }
        Ok(lhs)
    }

    fn term<E>(&mut self) -> Result<Expr, Error<E>> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.tokens.peek().map(|s| &s.token) {
                Some(Token::Asterisk) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => break,
            };
            let at = self.tokens.next().unwrap().location;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                location: at,
            };
        }
        Ok(lhs)
    }

    fn factor<E>(&mut self) -> Result<Expr, Error<E>> {
        let Some(spanned) = self.tokens.next() else {
            return Err(Error {
                cause: ErrorCause::UnexpectedEof,
                location: self.len..self.len,
            });
        };
        match spanned.token {
            Token::Minus => Ok(Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(self.factor()?),
            }),
            Token::OpenParen => {
                let inner = self.expr()?;
                match self.tokens.next() {
                    Some(Spanned {
                        token: Token::CloseParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(Error {
                        cause: ErrorCause::UnexpectedToken,
                        location: other.location,
                    }),
                    None => Err(Error {
                        cause: ErrorCause::UnexpectedEof,
                        location: self.len..self.len,
                    }),
                }
            }
            Token::Number(text) => parse_number(text, &spanned.location).map(Expr::Number),
            Token::Identifier(name) => Ok(Expr::Variable {
                name: name.to_owned(),
                location: spanned.location,
            }),
            _ => Err(Error {
                cause: ErrorCause::UnexpectedToken,
                location: spanned.location,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn adds_and_multiplies_left_to_right() {
        let e = env(&[]);
        assert_eq!(eval("1 + 2 * 3", &e).unwrap(), Value::Int(7));
        assert_eq!(eval("5 - 4 - 3", &e).unwrap(), Value::Int(-2));
    }

    #[test]
    fn resolves_variables() {
        let e = env(&[("a", "1"), ("b", "2"), ("cd", "3")]);
        assert_eq!(eval("a", &e).unwrap(), Value::Int(1));
        assert_eq!(eval("((b))", &e).unwrap(), Value::Int(2));
        assert_eq!(eval("(( ( ( cd ) ) ))", &e).unwrap(), Value::Int(3));
        assert_eq!(eval("a * b * cd", &e).unwrap(), Value::Int(6));
    }

    #[test]
    fn division_promotes_to_float_when_inexact() {
        let e = env(&[("cd", "3"), ("b", "2")]);
        assert_eq!(eval("cd * cd / b", &e).unwrap(), Value::Float(4.5));
        assert_eq!(eval("(8 * 8) / 8 / 8", &e).unwrap(), Value::Int(1));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let e = env(&[]);
        assert_matches::assert_matches!(
            eval("1 / 0", &e),
            Err(Error {
                cause: ErrorCause::DivisionByZero,
                ..
            })
        );
    }

    #[test]
    fn unset_variable_is_zero() {
        let e = env(&[]);
        assert_eq!(eval("x + 1", &e).unwrap(), Value::Int(1));
    }
}
