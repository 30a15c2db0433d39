//! Quoting a string for inclusion in a diagnostic message.
//!
//! This crate does not implement shell quoting semantics; it only produces a
//! human-readable, re-parseable-looking representation of a string so error
//! messages elsewhere in the workspace can embed file names, patterns, and
//! command names without ambiguity.

/// Wraps `s` in single quotes, escaping any single quote it contains using
/// the usual `'\''` shell idiom.
///
/// ```
/// assert_eq!(posh_quote::quote("hello"), "'hello'");
/// assert_eq!(posh_quote::quote("it's"), "'it'\\''s'");
/// ```
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
    out
}

/// Quotes `s` only if it contains characters a shell would otherwise treat
/// specially; plain identifiers and paths are returned unchanged.
#[must_use]
pub fn quote_if_needed(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
    if plain { s.to_owned() } else { quote(s) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_strings() {
        assert_eq!(quote("abc"), "'abc'");
    }

    #[test]
    fn escapes_embedded_quotes() {
        assert_eq!(quote("a'b"), "'a'\\''b'");
    }

    #[test]
    fn leaves_identifiers_unquoted() {
        assert_eq!(quote_if_needed("foo/bar.txt"), "foo/bar.txt");
        assert_eq!(quote_if_needed("foo bar"), "'foo bar'");
        assert_eq!(quote_if_needed(""), "''");
    }
}
