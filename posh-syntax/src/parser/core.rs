//! The backtracking combinator core: cursor, error type, and the handful of
//! primitive combinators every grammar rule in this crate is built from.

use crate::notes::{NoteData, Notes};
use regex::Regex;
use std::sync::OnceLock;

/// The parser's position in the source plus its side-band [`Notes`].
///
/// Every combinator that might fail clones the cursor before attempting its
/// branch and only keeps the clone on success; on failure the caller's
/// original cursor (and its notes, as of before the attempt) is used
/// instead. This is what makes the notes log "backtracking-compatible":
/// nothing about a failed branch's [`Notes::notes_update`] calls survives.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    pub src: &'a str,
    pub pos: usize,
    pub notes: Notes,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Cursor {
            src,
            pos: 0,
            notes: Notes::new(),
        }
    }

    pub fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    /// The current annotation at the cursor.
    pub fn get_notes(&self) -> NoteData {
        self.notes.notes_for(self.pos)
    }

    /// Sets the annotation at the cursor.
    pub fn put_note(&mut self, data: NoteData) {
        self.notes.notes_update(self.pos, data);
    }
}

/// A parse failure: a byte offset and a short label.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    pub pos: usize,
    pub label: String,
}

impl ParseError {
    pub fn new(pos: usize, label: impl Into<String>) -> Self {
        ParseError {
            pos,
            label: label.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at byte {}: {}", self.pos, self.label)
    }
}

impl std::error::Error for ParseError {}

pub type PResult<T> = Result<T, ParseError>;

/// Matches a literal string at the cursor, advancing past it on success.
pub fn literal<'a>(cur: &mut Cursor<'a>, text: &str) -> PResult<&'a str> {
    if cur.rest().starts_with(text) {
        let start = cur.pos;
        cur.pos += text.len();
        Ok(&cur.src[start..cur.pos])
    } else {
        Err(ParseError::new(cur.pos, format!("expected {text:?}")))
    }
}

/// Matches a regular expression anchored at the cursor, advancing past the
/// match on success.
pub fn regex_match<'a>(cur: &mut Cursor<'a>, re: &Regex) -> PResult<&'a str> {
    match re.find(cur.rest()) {
        Some(m) if m.start() == 0 => {
            let start = cur.pos;
            cur.pos += m.end();
            Ok(&cur.src[start..cur.pos])
        }
        _ => Err(ParseError::new(cur.pos, "pattern did not match")),
    }
}

/// Tries each alternative in order against a clone of `cur`, keeping the
/// cursor mutation of the first one that succeeds (ordered choice with
/// backtracking). On total failure, returns the error of whichever
/// alternative consumed the most input, which tends to be the most useful
/// diagnostic.
pub fn choice<'a, T>(
    cur: &mut Cursor<'a>,
    alts: &[&dyn Fn(&mut Cursor<'a>) -> PResult<T>],
) -> PResult<T>
where
    T: Clone,
{
    let mut best_err: Option<ParseError> = None;
    for alt in alts {
        let mut attempt = cur.clone();
        match alt(&mut attempt) {
            Ok(v) => {
                *cur = attempt;
                return Ok(v);
            }
            Err(e) => {
                if best_err.as_ref().is_none_or(|b| e.pos >= b.pos) {
                    best_err = Some(e);
                }
            }
        }
    }
    Err(best_err.unwrap_or_else(|| ParseError::new(cur.pos, "no alternative matched")))
}

/// Zero-or-more repetitions of `p`, stopping (without failing) at the first
/// failed attempt.
pub fn many<'a, T>(cur: &mut Cursor<'a>, mut p: impl FnMut(&mut Cursor<'a>) -> PResult<T>) -> Vec<T> {
    let mut out = Vec::new();
    loop {
        let mut attempt = cur.clone();
        match p(&mut attempt) {
            Ok(v) => {
                if attempt.pos == cur.pos {
                    // Guard against infinite loops on zero-width matches.
                    *cur = attempt;
                    out.push(v);
                    break;
                }
                *cur = attempt;
                out.push(v);
            }
            Err(_) => break,
        }
    }
    out
}

/// One-or-more repetitions of `p`.
pub fn many1<'a, T>(
    cur: &mut Cursor<'a>,
    mut p: impl FnMut(&mut Cursor<'a>) -> PResult<T>,
) -> PResult<Vec<T>> {
    let first = p(cur)?;
    let mut rest = many(cur, p);
    rest.insert(0, first);
    Ok(rest)
}

/// Tries `p`; on failure, leaves `cur` untouched and returns `None`.
pub fn optional<'a, T>(
    cur: &mut Cursor<'a>,
    p: impl FnOnce(&mut Cursor<'a>) -> PResult<T>,
) -> Option<T> {
    let mut attempt = cur.clone();
    match p(&mut attempt) {
        Ok(v) => {
            *cur = attempt;
            Some(v)
        }
        Err(_) => None,
    }
}

/// Succeeds only at the end of input.
pub fn eof(cur: &mut Cursor<'_>) -> PResult<()> {
    if cur.at_eof() {
        Ok(())
    } else {
        Err(ParseError::new(cur.pos, "expected end of input"))
    }
}

pub fn cached_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex is valid"))
}
