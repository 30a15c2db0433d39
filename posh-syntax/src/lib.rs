//! Lexer, backtracking parser and abstract syntax tree for the shell
//! command language.
//!
//! The entry points are [`syntax::CommandSequence`]'s and
//! [`syntax::Word`]'s `FromStr` implementations (see [`parser`]); both are
//! built on [`lex`]'s word grammar and [`parser::core`]'s combinator
//! primitives.

pub mod lex;
pub mod notes;
pub mod parser;
pub mod syntax;

pub use parser::{ParseError, PResult};
pub use syntax::{
    Assign, Case, CaseClause, Command, CommandPipe, CommandSequence, Condition, DupTarget, For,
    Function, GlobKind, HereDoc, HereDocHandle, Id, If, Node, ParamOp, Redirect, RedirectBody,
    VariableRef, While, Word, WordPart,
};
