//! The `eol` parser: consumes a newline, then resolves any here-documents
//! that were queued by a `<<TAG` redirect earlier in the line.

use crate::lex::parse_heredoc_body;
use crate::parser::core::{literal, Cursor, ParseError, PResult};
use crate::syntax::Word;

/// Consumes a single `\n`, then backfills every pending here-document in
/// the current notes entry before returning.
pub fn eol(cur: &mut Cursor<'_>) -> PResult<()> {
    literal(cur, "\n")?;
    loop {
        let mut note = cur.get_notes();
        let Some(descriptor) = note.hds.pop_front() else {
            break;
        };
        let (content, consumed) = read_heredoc_body(cur.rest(), &descriptor.end)
            .ok_or_else(|| ParseError::new(cur.pos, "looking for heredoc ending with EOF"))?;
        let body: Word = if descriptor.quoted {
            Word::constant(content)
        } else {
            parse_heredoc_body(&content)
        };
        descriptor.slot.fill(body);
        cur.pos += consumed;
        cur.put_note(note);
    }
    Ok(())
}

/// Reads lines from `input` until one, stripped of its trailing newline,
/// equals `end`. Returns the joined content (without the terminator line)
/// and the number of bytes consumed including the terminator line and its
/// newline (if present before EOF).
fn read_heredoc_body(input: &str, end: &str) -> Option<(String, usize)> {
    let mut offset = 0;
    let mut lines = Vec::new();
    loop {
        let rest = &input[offset..];
        let (line, line_len, had_newline) = match rest.find('\n') {
            Some(nl) => (&rest[..nl], nl + 1, true),
            None => (rest, rest.len(), false),
        };
        if line == end {
            offset += line_len;
            return Some((lines.join("\n"), offset));
        }
        if !had_newline {
            // EOF reached without finding the terminator line.
            return None;
        }
        lines.push(line.to_owned());
        offset += line_len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::{HeredocDescriptor, NoteData};
    use crate::syntax::HereDocHandle;

    #[test]
    fn fills_quoted_heredoc_verbatim() {
        let src = "\nhello $world\nEOF\nrest";
        let mut cur = Cursor::new(src);
        let handle = HereDocHandle::new();
        let mut note = NoteData::default();
        note.hds.push_back(HeredocDescriptor {
            end: "EOF".into(),
            quoted: true,
            slot: handle.clone(),
        });
        cur.put_note(note);
        eol(&mut cur).unwrap();
        assert_eq!(handle.get().unwrap(), Word::constant("hello $world"));
        assert_eq!(cur.rest(), "rest");
    }

    #[test]
    fn fills_unquoted_heredoc_with_expansion_parts() {
        let src = "\nhello $world\nEOF\n";
        let mut cur = Cursor::new(src);
        let handle = HereDocHandle::new();
        let mut note = NoteData::default();
        note.hds.push_back(HeredocDescriptor {
            end: "EOF".into(),
            quoted: false,
            slot: handle.clone(),
        });
        cur.put_note(note);
        eol(&mut cur).unwrap();
        let body = handle.get().unwrap();
        assert!(body.parts.len() >= 2);
    }

    #[test]
    fn unclosed_heredoc_is_a_parse_error() {
        let src = "\nhello\nthere";
        let mut cur = Cursor::new(src);
        let handle = HereDocHandle::new();
        let mut note = NoteData::default();
        note.hds.push_back(HeredocDescriptor {
            end: "EOF".into(),
            quoted: true,
            slot: handle,
        });
        cur.put_note(note);
        assert!(eol(&mut cur).is_err());
    }
}
