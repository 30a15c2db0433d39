//! `pipeline = compound_command ('|' compound_command)*` and
//! `command_sequence = pipeline ((';' | '\n' | EOF) pipeline)*`

use crate::lex;
use crate::parser::compound::compound_command;
use crate::parser::core::{literal, optional, Cursor, ParseError, PResult};
use crate::parser::layout::sequence_separator;
use crate::syntax::{CommandPipe, CommandSequence};

pub fn pipeline(cur: &mut Cursor<'_>) -> PResult<CommandPipe> {
    let first = compound_command(cur)?;
    let mut units = vec![first];
    loop {
        lex::skip_ws(cur);
        if optional(cur, |c| literal(c, "|")).is_none() {
            break;
        }
        crate::parser::layout::skip_layout(cur);
        units.push(compound_command(cur)?);
    }
    Ok(CommandPipe { units })
}

pub fn command_sequence(cur: &mut Cursor<'_>) -> PResult<CommandSequence> {
    let mut units = Vec::new();
    loop {
        crate::parser::layout::skip_layout(cur);
        match optional(cur, pipeline) {
            Some(p) => units.push(p),
            None => break,
        }
        if !sequence_separator(cur) {
            break;
        }
    }
    if !cur.get_notes().hds.is_empty() {
        return Err(ParseError::new(cur.pos, "want additional heredocs"));
    }
    Ok(CommandSequence { units })
}

/// Parses `text` in full as a command sequence, the entry point used by
/// `$(...)`, backquotes and [`crate::syntax::CommandSequence::from_str`].
pub fn parse_command_sequence_str(text: &str) -> PResult<CommandSequence> {
    let mut cur = Cursor::new(text);
    let seq = command_sequence(&mut cur)?;
    crate::parser::layout::skip_layout(&mut cur);
    crate::parser::core::eof(&mut cur)?;
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sequence_separated_by_semicolons() {
        let seq = parse_command_sequence_str("echo a; echo b; echo c").unwrap();
        assert_eq!(seq.units.len(), 3);
    }

    #[test]
    fn parses_sequence_separated_by_newlines() {
        let seq = parse_command_sequence_str("echo a\necho b\n").unwrap();
        assert_eq!(seq.units.len(), 2);
    }

    #[test]
    fn parses_pipeline() {
        let seq = parse_command_sequence_str("a | b | c").unwrap();
        assert_eq!(seq.units.len(), 1);
        assert_eq!(seq.units[0].units.len(), 3);
    }

    #[test]
    fn empty_input_is_an_empty_sequence() {
        let seq = parse_command_sequence_str("").unwrap();
        assert!(seq.units.is_empty());
    }

    #[test]
    fn unclosed_heredoc_fails_the_sequence() {
        let err = parse_command_sequence_str("cat <<EOF\nhello").unwrap_err();
        assert!(err.label.contains("heredoc"));
    }
}
