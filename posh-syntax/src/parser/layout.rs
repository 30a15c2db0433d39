//! Shared "skip whatever whitespace or newlines are legal here" helper.
//!
//! Every newline consumed by the grammar must go through [`eol`] so that
//! any here-document queued earlier on the line gets resolved at the right
//! point. This module centralizes that rule so
//! command and compound-command parsing don't each reinvent it.

use crate::lex;
use crate::parser::core::{optional, Cursor};
use crate::parser::heredoc::eol;

/// Skips whitespace and newlines (resolving heredocs along the way), zero
/// or more times. Used between tokens in positions where a newline is
/// as good as whitespace.
pub fn skip_layout(cur: &mut Cursor<'_>) {
    loop {
        let before = cur.pos;
        lex::skip_ws(cur);
        if optional(cur, eol).is_none() && cur.pos == before {
            break;
        }
    }
}

/// A sequence separator: `;`, a newline (via [`eol`]), or end of input.
/// Consumes trailing layout after the separator too.
pub fn sequence_separator(cur: &mut Cursor<'_>) -> bool {
    lex::skip_ws(cur);
    let matched = optional(cur, |c| crate::parser::core::literal(c, ";")).is_some()
        || optional(cur, eol).is_some();
    if matched {
        skip_layout(cur);
    }
    matched
}
