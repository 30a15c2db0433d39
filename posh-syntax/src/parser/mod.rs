//! The backtracking-combinator parser for the command grammar.
//!
//! [`core`] defines the cursor and primitive combinators; [`command`] and
//! [`compound`] build the command grammar on top of [`crate::lex`]'s word
//! grammar; [`pipeline`] ties pipelines and sequences together;
//! [`heredoc`] implements the `eol` parser that resolves here-documents
//! queued in the cursor's [`crate::notes::Notes`]; [`redirect`] parses
//! redirection operators, including the `<<TAG` operator that queues a
//! heredoc descriptor for `eol` to fill in.

pub mod command;
pub mod compound;
pub mod core;
pub mod heredoc;
pub mod layout;
pub mod pipeline;
pub mod redirect;

pub use core::{Cursor, ParseError, PResult};

use crate::syntax::{CommandSequence, Word};
use std::str::FromStr;

impl FromStr for CommandSequence {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        pipeline::parse_command_sequence_str(s)
    }
}

impl FromStr for Word {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cur = Cursor::new(s);
        let w = crate::lex::word(&mut cur)?;
        core::eof(&mut cur)?;
        Ok(w)
    }
}

/// Parses a full shell program: a [`CommandSequence`] followed by optional
/// trailing layout and end of input.
pub fn parse_program(source: &str) -> PResult<CommandSequence> {
    pipeline::parse_command_sequence_str(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_through_display_and_parse() {
        let cases = [
            "a=1 b=2 echo $a$b",
            "while false; do echo x; done; echo done",
            "for i in a b c; do echo $i; done",
            "case x in a) echo A ;; x) echo X ;; *) echo O ;; esac",
            "if a; then b; else c; fi",
        ];
        for src in cases {
            let ast = CommandSequence::from_str(src).unwrap();
            let rendered = ast.to_string();
            let reparsed = CommandSequence::from_str(&rendered).unwrap_or_else(|e| {
                panic!("rendered form {rendered:?} of {src:?} failed to reparse: {e}")
            });
            assert_eq!(
                ast, reparsed,
                "round trip mismatch for {src:?} (rendered as {rendered:?})"
            );
        }
    }

    #[test]
    fn newline_and_semicolon_are_interchangeable() {
        let a = CommandSequence::from_str("echo a; echo b").unwrap();
        let b = CommandSequence::from_str("echo a\necho b").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reserved_word_fails_as_a_plain_command_but_not_in_context() {
        let mut cur = Cursor::new("while");
        let c = crate::parser::command::simple_command(&mut cur).unwrap();
        assert!(c.is_null());
        assert!(CommandSequence::from_str("while true; do :; done").is_ok());
    }
}
