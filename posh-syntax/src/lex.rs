//! Lexical primitives: whitespace, word characters, escapes, and the word
//! grammar built from them.

use crate::parser::core::{Cursor, ParseError, PResult, cached_regex, choice, literal, many,
    optional, regex_match};
use crate::syntax::{GlobKind, VariableRef, Word, WordPart};
use regex::Regex;
use std::sync::OnceLock;

static WS_RE: OnceLock<Regex> = OnceLock::new();
static WORD_ID_RE: OnceLock<Regex> = OnceLock::new();
static VAR_NAME_RE: OnceLock<Regex> = OnceLock::new();

/// `ws = /([ \t]|\\\n)+/` — plain whitespace or a line-continuation.
pub fn ws(cur: &mut Cursor<'_>) -> PResult<()> {
    let re = cached_regex(&WS_RE, r"^([ \t]|\\\n)+");
    regex_match(cur, re)?;
    Ok(())
}

pub fn skip_ws(cur: &mut Cursor<'_>) {
    let _ = optional(cur, ws);
}

fn word_id_regex() -> &'static Regex {
    cached_regex(&WORD_ID_RE, r#"^[^\s'()$=";|<>&\\{}`*]+"#)
}

fn var_name_regex() -> &'static Regex {
    cached_regex(&VAR_NAME_RE, r"^([1-9][0-9]*|[0?!#@*]|[a-zA-Z_][a-zA-Z0-9_]*)")
}

/// Reserved words, recognized only in their compound-command contexts, not
/// as the first word of a plain [`Command`](crate::syntax::Command).
pub const RESERVED_WORDS: &[&str] = &[
    "while", "do", "done", "if", "then", "elif", "else", "fi", "for", "in", "case", "esac",
];

pub fn is_reserved_word(s: &str) -> bool {
    RESERVED_WORDS.contains(&s)
}

/// Matches a reserved word as a whole token, i.e. not immediately followed
/// by another identifier character (so `iffy` does not match `if`).
pub fn keyword(cur: &mut Cursor<'_>, kw: &str) -> PResult<()> {
    let start = cur.pos;
    literal(cur, kw)?;
    let boundary_ok = cur
        .rest()
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric() && c != '_');
    if boundary_ok {
        Ok(())
    } else {
        cur.pos = start;
        Err(ParseError::new(start, format!("expected keyword {kw:?}")))
    }
}

/// Parses a single word, i.e. the `many` of [`word_part`], collapsing a
/// one-part word into that part's bare representation where useful for
/// callers that only want the string value (most callers use the full
/// `Word` though).
pub fn word(cur: &mut Cursor<'_>) -> PResult<Word> {
    let start = cur.pos;
    let parts: Vec<WordPart> = many1_filtered(cur, word_part)?;
    if parts.is_empty() {
        return Err(ParseError::new(start, "expected a word"));
    }
    Ok(Word {
        parts,
        double_quoted: false,
    })
}

fn many1_filtered(
    cur: &mut Cursor<'_>,
    p: impl Fn(&mut Cursor<'_>) -> PResult<Option<WordPart>>,
) -> PResult<Vec<WordPart>> {
    let mut out = Vec::new();
    loop {
        let mut attempt = cur.clone();
        match p(&mut attempt) {
            Ok(part) => {
                if attempt.pos == cur.pos {
                    break;
                }
                *cur = attempt;
                if let Some(part) = part {
                    out.push(part);
                }
            }
            Err(_) => break,
        }
    }
    Ok(out)
}

/// One word part, tried in priority order. Returns
/// `None` for constructs that consume input but contribute nothing to the
/// word (an escaped line-continuation).
fn word_part(cur: &mut Cursor<'_>) -> PResult<Option<WordPart>> {
    if let Some(p) = optional(cur, backquote_command_substitution) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, dollar_variable) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, dollar_arith) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, dollar_command_substitution) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, braced_param) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, single_quoted) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, double_quoted_word_part) {
        return Ok(Some(p));
    }
    if let Some(()) = optional(cur, escaped_newline) {
        return Ok(None);
    }
    if let Some(p) = optional(cur, backslash_escape) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, |c| literal(c, "**").map(|_| WordPart::Glob(GlobKind::StarStar))) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, |c| literal(c, "*").map(|_| WordPart::Glob(GlobKind::Star))) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, brace_literal) {
        return Ok(Some(p));
    }
    if let Some(p) = optional(cur, bare_equals) {
        return Ok(Some(p));
    }
    let text = regex_match(cur, word_id_regex())?;
    Ok(Some(WordPart::Constant(text.to_owned())))
}

fn escaped_newline(cur: &mut Cursor<'_>) -> PResult<()> {
    literal(cur, "\\\n").map(|_| ())
}

fn backslash_escape(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "\\")?;
    let start = cur.pos;
    if cur.at_eof() {
        return Err(ParseError::new(start, "dangling backslash"));
    }
    let ch = cur.rest().chars().next().unwrap();
    cur.pos += ch.len_utf8();
    Ok(WordPart::Constant(ch.to_string()))
}

fn brace_literal(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    choice(
        cur,
        &[
            &|c: &mut Cursor<'_>| literal(c, "{").map(|s| WordPart::Constant(s.to_owned())),
            &|c: &mut Cursor<'_>| literal(c, "}").map(|s| WordPart::Constant(s.to_owned())),
        ],
    )
}

fn bare_equals(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "=").map(|_| WordPart::Token("=".to_owned()))
}

fn single_quoted(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "'")?;
    let start = cur.pos;
    let end = cur.rest().find('\'').ok_or_else(|| {
        ParseError::new(start, "unterminated single-quoted string")
    })?;
    let text = &cur.src[start..start + end];
    cur.pos = start + end;
    literal(cur, "'")?;
    Ok(WordPart::Constant(text.to_owned()))
}

fn double_quoted_word_part(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "\"")?;
    let parts = many(cur, double_quoted_content_part);
    literal(cur, "\"")?;
    Ok(WordPart::DoubleQuoted(Box::new(Word {
        parts,
        double_quoted: true,
    })))
}

/// The double-quoted content grammar, also reused verbatim to parse an
/// unquoted here-document body.
fn double_quoted_content_part(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    if cur.rest().starts_with('"') || cur.at_eof() {
        return Err(ParseError::new(cur.pos, "end of double-quoted content"));
    }
    // A literal newline inside double quotes contributes nothing.
    if cur.rest().starts_with('\n') {
        cur.pos += 1;
        return Ok(WordPart::Constant(String::new()));
    }
    if cur.rest().starts_with('\\') {
        return backslash_in_double_quotes(cur);
    }
    if let Some(p) = optional(cur, dollar_variable) {
        return Ok(p);
    }
    if let Some(p) = optional(cur, dollar_arith) {
        return Ok(p);
    }
    if let Some(p) = optional(cur, dollar_command_substitution) {
        return Ok(p);
    }
    if let Some(p) = optional(cur, braced_param) {
        return Ok(p);
    }
    let start = cur.pos;
    let bytes = cur.rest();
    let stop = bytes
        .char_indices()
        .find(|&(_, c)| c == '"' || c == '$' || c == '\\')
        .map(|(i, _)| i)
        .unwrap_or(bytes.len());
    if stop == 0 {
        return Err(ParseError::new(start, "no literal text here"));
    }
    cur.pos += stop;
    Ok(WordPart::Constant(cur.src[start..cur.pos].to_owned()))
}

fn backslash_in_double_quotes(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "\\")?;
    let start = cur.pos;
    if cur.at_eof() {
        return Err(ParseError::new(start, "dangling backslash"));
    }
    let ch = cur.rest().chars().next().unwrap();
    cur.pos += ch.len_utf8();
    let literal_ch = match ch {
        'n' => '\n',
        't' => '\t',
        'b' => '\u{8}',
        other => other,
    };
    Ok(WordPart::Constant(literal_ch.to_string()))
}

/// Parses `text` as an unquoted here-document body using the double-quoted
/// content grammar.
pub fn parse_heredoc_body(text: &str) -> Word {
    let mut cur = Cursor::new(text);
    let parts = many(&mut cur, double_quoted_content_part);
    Word {
        parts,
        double_quoted: true,
    }
}

fn variable_ref(cur: &mut Cursor<'_>, double_quoted: bool) -> PResult<VariableRef> {
    let name = regex_match(cur, var_name_regex())?;
    Ok(VariableRef {
        name: name.to_owned(),
        double_quoted,
    })
}

fn dollar_variable(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "$")?;
    let v = variable_ref(cur, false)?;
    Ok(WordPart::Variable(v))
}

fn dollar_arith(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "$((")?;
    let start = cur.pos;
    let end = find_arith_close(cur.rest())
        .ok_or_else(|| ParseError::new(start, "unterminated arithmetic expansion"))?;
    let text = &cur.src[start..start + end];
    cur.pos = start + end;
    literal(cur, "))")?;
    let expr =
        posh_arith::parse::<std::convert::Infallible>(text).map_err(|e| ParseError::new(start + e.location.start, e.cause.to_string()))?;
    Ok(WordPart::Arithmetic(std::rc::Rc::new(expr)))
}

/// Finds the index of the first `)` that closes `$((` — i.e. the first `)`
/// at local paren-depth 0 that is itself followed by another `)`.
fn find_arith_close(s: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn dollar_command_substitution(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "$(")?;
    let start = cur.pos;
    let end = find_balanced_paren_close(cur.rest())
        .ok_or_else(|| ParseError::new(start, "unterminated command substitution"))?;
    let text = &cur.src[start..start + end];
    cur.pos = start + end;
    literal(cur, ")")?;
    let seq = crate::parser::pipeline::parse_command_sequence_str(text)
        .map_err(|e| ParseError::new(start + e.pos, e.label))?;
    Ok(WordPart::CommandSubstitution(Box::new(seq)))
}

/// Finds the offset of the `)` that balances the `(` implied by the caller
/// having already consumed `$(`, skipping over quoted sections so that a
/// paren inside a string literal does not confuse the match.
fn find_balanced_paren_close(s: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut in_single = false;
    let mut in_double = false;
    while i < bytes.len() {
        let c = bytes[i];
        if in_single {
            if c == b'\'' {
                in_single = false;
            }
            i += 1;
            continue;
        }
        if in_double {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == b'"' {
                in_double = false;
            }
            i += 1;
            continue;
        }
        match c {
            b'\'' => in_single = true,
            b'"' => in_double = true,
            b'\\' => {
                i += 2;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn backquote_command_substitution(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "`")?;
    let start = cur.pos;
    let mut peeled = String::new();
    loop {
        if cur.at_eof() {
            return Err(ParseError::new(start, "unterminated backquoted command"));
        }
        let c = cur.rest().chars().next().unwrap();
        if c == '`' {
            break;
        }
        if c == '\\' {
            let mut rest = cur.rest().chars();
            rest.next();
            match rest.next() {
                Some(next @ ('`' | '$' | '\\')) => {
                    peeled.push(next);
                    cur.pos += 2;
                }
                _ => {
                    peeled.push('\\');
                    cur.pos += 1;
                }
            }
        } else {
            peeled.push(c);
            cur.pos += c.len_utf8();
        }
    }
    literal(cur, "`")?;
    let seq = crate::parser::pipeline::parse_command_sequence_str(&peeled)
        .map_err(|e| ParseError::new(start + e.pos, e.label))?;
    Ok(WordPart::CommandSubstitution(Box::new(seq)))
}

/// `${...}`, with an optional parameter operator and pattern.
fn braced_param(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    literal(cur, "${")?;
    let start = cur.pos;
    let end = find_balanced_brace_close(cur.rest())
        .ok_or_else(|| ParseError::new(start, "unterminated parameter expansion"))?;
    let inner = &cur.src[start..start + end];
    cur.pos = start + end;
    literal(cur, "}")?;
    parse_braced_param_body(inner, start)
}

fn find_balanced_brace_close(s: &str) -> Option<usize> {
    let mut depth: i32 = 0;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn parse_braced_param_body(inner: &str, offset: usize) -> PResult<WordPart> {
    let mut name_cur = Cursor::new(inner);
    let name = regex_match(&mut name_cur, var_name_regex())
        .map_err(|e| ParseError::new(offset + e.pos, "expected a variable name"))?
        .to_owned();
    let rest = &inner[name_cur.pos..];
    if rest.is_empty() {
        return Ok(WordPart::Variable(VariableRef {
            name,
            double_quoted: false,
        }));
    }
    let (op, pattern_src) = if let Some(p) = rest.strip_prefix("##") {
        (crate::syntax::ParamOp::HashHash, p)
    } else if let Some(p) = rest.strip_prefix('#') {
        (crate::syntax::ParamOp::Hash, p)
    } else if let Some(p) = rest.strip_prefix("%%") {
        (crate::syntax::ParamOp::PercentPercent, p)
    } else if let Some(p) = rest.strip_prefix('%') {
        (crate::syntax::ParamOp::Percent, p)
    } else {
        return Err(ParseError::new(
            offset + name_cur.pos,
            "expected a parameter operator",
        ));
    };
    let pattern_offset = offset + name_cur.pos + (rest.len() - pattern_src.len());
    let pattern = parse_pattern_word(pattern_src, pattern_offset)?;
    Ok(WordPart::ParameterOp {
        var: VariableRef {
            name,
            double_quoted: false,
        },
        op,
        pattern: Box::new(pattern),
    })
}

fn parse_pattern_word(src: &str, offset: usize) -> PResult<Word> {
    let mut cur = Cursor::new(src);
    let parts = many(&mut cur, word_part_or_fail_fast);
    if cur.pos != src.len() {
        return Err(ParseError::new(offset + cur.pos, "invalid pattern"));
    }
    Ok(Word {
        parts,
        double_quoted: false,
    })
}

fn word_part_or_fail_fast(cur: &mut Cursor<'_>) -> PResult<WordPart> {
    match word_part(cur)? {
        Some(p) => Ok(p),
        None => Err(ParseError::new(cur.pos, "empty part")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Word {
        let mut cur = Cursor::new(src);
        let w = word(&mut cur).unwrap();
        assert!(cur.at_eof(), "leftover input: {:?}", cur.rest());
        w
    }

    #[test]
    fn constant_word() {
        let w = parse("hello");
        assert_eq!(w.parts, vec![WordPart::Constant("hello".into())]);
    }

    #[test]
    fn variable_reference() {
        let w = parse("$a$b");
        assert_eq!(
            w.parts,
            vec![
                WordPart::Variable(VariableRef {
                    name: "a".into(),
                    double_quoted: false
                }),
                WordPart::Variable(VariableRef {
                    name: "b".into(),
                    double_quoted: false
                }),
            ]
        );
    }

    #[test]
    fn single_quotes_suppress_expansion() {
        let w = parse("'hello $world'");
        assert_eq!(w.parts, vec![WordPart::Constant("hello $world".into())]);
    }

    #[test]
    fn double_quotes_still_expand_variables() {
        let w = parse("\"hello $world\"");
        assert_eq!(w.parts.len(), 1);
        match &w.parts[0] {
            WordPart::DoubleQuoted(inner) => {
                assert!(inner.double_quoted);
                assert_eq!(inner.parts.len(), 2);
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn star_and_starstar_are_glob_sentinels() {
        let w = parse("a*b**");
        assert_eq!(
            w.parts,
            vec![
                WordPart::Constant("a".into()),
                WordPart::Glob(GlobKind::Star),
                WordPart::Constant("b".into()),
                WordPart::Glob(GlobKind::StarStar),
            ]
        );
    }

    #[test]
    fn parameter_op_parses_pattern() {
        let w = parse("${name#x*}");
        assert_eq!(w.parts.len(), 1);
        match &w.parts[0] {
            WordPart::ParameterOp { var, op, pattern } => {
                assert_eq!(var.name, "name");
                assert_eq!(*op, crate::syntax::ParamOp::Hash);
                assert_eq!(
                    pattern.parts,
                    vec![
                        WordPart::Constant("x".into()),
                        WordPart::Glob(GlobKind::Star)
                    ]
                );
            }
            other => panic!("unexpected part: {other:?}"),
        }
    }
}
