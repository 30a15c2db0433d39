//! Redirection and here-document-operator parsing.

use crate::lex;
use crate::notes::HeredocDescriptor;
use crate::parser::core::{choice, literal, optional, regex_match, Cursor, ParseError, PResult};
use crate::syntax::{DupTarget, HereDoc, HereDocHandle, Redirect, RedirectBody};
use regex::Regex;
use std::sync::OnceLock;

static FD_RE: OnceLock<Regex> = OnceLock::new();

fn fd_number(cur: &mut Cursor<'_>) -> Option<i32> {
    let re = crate::parser::core::cached_regex(&FD_RE, r"^[0-9]+");
    optional(cur, |c| regex_match(c, re)).and_then(|s| s.parse().ok())
}

/// Parses one redirection operator and its operand, appending a pending
/// here-document descriptor to the cursor's notes when it parses `<<TAG`.
pub fn redirect(cur: &mut Cursor<'_>) -> PResult<Redirect> {
    let start = cur.pos;
    let explicit_fd = fd_number(cur);
    let op = choice(
        cur,
        &[
            &|c: &mut Cursor<'_>| literal(c, "<<-").map(|_| "<<-"),
            &|c: &mut Cursor<'_>| literal(c, "<<").map(|_| "<<"),
            &|c: &mut Cursor<'_>| literal(c, "<&").map(|_| "<&"),
            &|c: &mut Cursor<'_>| literal(c, "<").map(|_| "<"),
            &|c: &mut Cursor<'_>| literal(c, ">>").map(|_| ">>"),
            &|c: &mut Cursor<'_>| literal(c, ">&").map(|_| ">&"),
            &|c: &mut Cursor<'_>| literal(c, ">").map(|_| ">"),
        ],
    )?;
    lex::skip_ws(cur);
    let body = match op {
        "<" => RedirectBody::From(lex::word(cur)?),
        ">" => RedirectBody::To(lex::word(cur)?),
        ">>" => RedirectBody::Append(lex::word(cur)?),
        "<&" => RedirectBody::DupIn(dup_target(cur)?),
        ">&" => RedirectBody::DupOut(dup_target(cur)?),
        "<<" | "<<-" => return heredoc_operator(cur, start, explicit_fd),
        _ => unreachable!(),
    };
    let fd = explicit_fd.unwrap_or(match op {
        "<" | "<&" => 0,
        _ => 1,
    });
    Ok(Redirect { fd, body })
}

fn dup_target(cur: &mut Cursor<'_>) -> PResult<DupTarget> {
    if optional(cur, |c| literal(c, "-")).is_some() {
        return Ok(DupTarget::Close);
    }
    Ok(DupTarget::Fd(lex::word(cur)?))
}

/// `<<[-]TAG` or `<<[-]'TAG'` / `<<[-]"TAG"`. Registers a [`HeredocDescriptor`]
/// in the current notes entry for `eol` to fill in later.
fn heredoc_operator(cur: &mut Cursor<'_>, start: usize, explicit_fd: Option<i32>) -> PResult<Redirect> {
    let (tag, quoted) = heredoc_tag(cur)?;
    let handle = HereDocHandle::new();
    let mut note = cur.get_notes();
    note.hds.push_back(HeredocDescriptor {
        end: tag.clone(),
        quoted,
        slot: handle.clone(),
    });
    cur.put_note(note);
    let fd = explicit_fd.unwrap_or(0);
    let _ = start;
    Ok(Redirect {
        fd,
        body: RedirectBody::Here(HereDoc {
            end: tag,
            quoted,
            content: handle,
        }),
    })
}

fn heredoc_tag(cur: &mut Cursor<'_>) -> PResult<(String, bool)> {
    if optional(cur, |c| literal(c, "'")).is_some() {
        let start = cur.pos;
        let end = cur
            .rest()
            .find('\'')
            .ok_or_else(|| ParseError::new(start, "unterminated quoted heredoc tag"))?;
        let tag = cur.src[start..start + end].to_owned();
        cur.pos = start + end;
        literal(cur, "'")?;
        return Ok((tag, true));
    }
    if optional(cur, |c| literal(c, "\"")).is_some() {
        let start = cur.pos;
        let end = cur
            .rest()
            .find('"')
            .ok_or_else(|| ParseError::new(start, "unterminated quoted heredoc tag"))?;
        let tag = cur.src[start..start + end].to_owned();
        cur.pos = start + end;
        literal(cur, "\"")?;
        return Ok((tag, true));
    }
    let start = cur.pos;
    let word = lex::word(cur)?;
    let tag = word
        .parts
        .iter()
        .map(|p| p.to_string())
        .collect::<String>();
    if tag.is_empty() {
        return Err(ParseError::new(start, "expected a here-document tag"));
    }
    Ok((tag, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fd_defaults() {
        let mut cur = Cursor::new("<file");
        let r = redirect(&mut cur).unwrap();
        assert_eq!(r.fd, 0);
        assert!(matches!(r.body, RedirectBody::From(_)));

        let mut cur = Cursor::new(">file");
        let r = redirect(&mut cur).unwrap();
        assert_eq!(r.fd, 1);
    }

    #[test]
    fn parses_explicit_fd_and_dup() {
        let mut cur = Cursor::new("2>&1");
        let r = redirect(&mut cur).unwrap();
        assert_eq!(r.fd, 2);
        assert!(matches!(r.body, RedirectBody::DupOut(DupTarget::Fd(_))));
    }

    #[test]
    fn parses_close_dup() {
        let mut cur = Cursor::new("3<&-");
        let r = redirect(&mut cur).unwrap();
        assert_eq!(r.fd, 3);
        assert!(matches!(r.body, RedirectBody::DupIn(DupTarget::Close)));
    }

    #[test]
    fn heredoc_operator_queues_descriptor() {
        let mut cur = Cursor::new("<<EOF");
        let r = redirect(&mut cur).unwrap();
        assert!(matches!(r.body, RedirectBody::Here(_)));
        assert_eq!(cur.get_notes().hds.len(), 1);
        assert_eq!(cur.get_notes().hds[0].end, "EOF");
    }

    #[test]
    fn quoted_heredoc_tag_disables_expansion() {
        let mut cur = Cursor::new("<<'EOF'");
        let r = redirect(&mut cur).unwrap();
        match r.body {
            RedirectBody::Here(h) => assert!(h.quoted),
            _ => panic!("expected heredoc"),
        }
    }
}
