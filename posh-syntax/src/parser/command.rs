//! Simple command grammar: the interleaving of assignments, redirects and
//! words.

use crate::lex::{self, is_reserved_word};
use crate::parser::core::{literal, optional, regex_match, Cursor, PResult};
use crate::parser::redirect::redirect;
use crate::syntax::{Assign, Command, Word, WordPart};
use regex::Regex;
use std::sync::OnceLock;

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_regex() -> &'static Regex {
    crate::parser::core::cached_regex(&NAME_RE, r"^[a-zA-Z_][a-zA-Z0-9_]*")
}

/// `Id '=' Word`, only recognized at the head of a command, before the
/// first non-assignment word.
fn assignment(cur: &mut Cursor<'_>) -> PResult<Assign> {
    let name = regex_match(cur, name_regex())?.to_owned();
    literal(cur, "=")?;
    let value = optional(cur, lex::word).unwrap_or_default();
    Ok(Assign { name, value })
}

/// Renders a word back to a plain string if it is made only of literal
/// constant text, for comparing against the reserved-word list.
fn as_plain_literal(word: &Word) -> Option<String> {
    if word.parts.len() == 1 {
        if let WordPart::Constant(s) = &word.parts[0] {
            return Some(s.clone());
        }
    }
    None
}

/// `command = interleaved (assignment | redirect | word) while applicable`.
///
/// An empty result (no assigns, words or redirects) is the null command
/// no words, assignments or redirects; callers elide it.
pub fn simple_command(cur: &mut Cursor<'_>) -> PResult<Command> {
    let mut command = Command::default();
    let mut assignments_possible = true;
    loop {
        lex::skip_ws(cur);
        if let Some(r) = optional(cur, redirect) {
            command.redirects.push(r);
            continue;
        }
        if assignments_possible {
            if let Some(a) = optional(cur, assignment) {
                command.assigns.push(a);
                continue;
            }
        }
        let before = cur.pos;
        if let Some(word) = optional(cur, lex::word) {
            if command.words.is_empty() {
                if let Some(text) = as_plain_literal(&word) {
                    if is_reserved_word(&text) {
                        cur.pos = before;
                        break;
                    }
                }
            }
            assignments_possible = false;
            command.words.push(word);
            continue;
        }
        break;
    }
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments_before_words() {
        let mut cur = Cursor::new("a=1 b=2 echo $a$b");
        let c = simple_command(&mut cur).unwrap();
        assert_eq!(c.assigns.len(), 2);
        assert_eq!(c.words.len(), 2);
        assert_eq!(c.assigns[0].name, "a");
    }

    #[test]
    fn stops_assignment_parsing_after_first_word() {
        let mut cur = Cursor::new("echo a=1");
        let c = simple_command(&mut cur).unwrap();
        assert_eq!(c.assigns.len(), 0);
        assert_eq!(c.words.len(), 2);
    }

    #[test]
    fn reserved_word_does_not_start_a_plain_command() {
        let mut cur = Cursor::new("if");
        let c = simple_command(&mut cur).unwrap();
        assert!(c.is_null());
    }

    #[test]
    fn reserved_word_is_fine_as_a_later_argument() {
        let mut cur = Cursor::new("echo if");
        let c = simple_command(&mut cur).unwrap();
        assert_eq!(c.words.len(), 2);
    }

    #[test]
    fn null_command_has_no_parts() {
        let mut cur = Cursor::new("");
        let c = simple_command(&mut cur).unwrap();
        assert!(c.is_null());
    }
}
