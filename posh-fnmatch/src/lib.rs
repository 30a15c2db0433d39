//! Shell wildcard pattern matching.
//!
//! The shell core only needs `*` as a wildcard (matching any run of
//! characters, including none) and the POSIX leading-dot rule for filename
//! globbing: a `*` at the start of a pattern does not match a filename that
//! begins with `.`. `**` (recursive descent through directories) is handled
//! one level up, in the expansion engine's directory walk; this crate only
//! ever sees a single path segment or a single `case` pattern, never the
//! `**` sentinel itself.
//!
//! Patterns are compiled to [`regex::Regex`] once and reused across every
//! candidate string they are tested against, the same approach
//! `yash-fnmatch` takes internally.

use regex::Regex;
use thiserror::Error;

/// Error compiling a pattern.
#[derive(Debug, Error)]
#[error("invalid glob pattern: {0}")]
pub struct Error(#[from] regex::Error);

/// A compiled glob pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    regex: Regex,
    /// Whether this pattern was compiled with the filename leading-dot rule.
    leading_dot_sensitive: bool,
    starts_with_wildcard: bool,
    literal_first_char_is_dot: bool,
}

impl Pattern {
    /// Compiles `pattern` for matching an arbitrary string (used by `case`
    /// clauses). The leading-dot rule does not apply here: `case .x in *) ;;`
    /// matches.
    pub fn parse(pattern: &str) -> Result<Self, Error> {
        Self::compile(pattern, false)
    }

    /// Compiles `pattern` for matching a single filename segment, applying
    /// the POSIX leading-dot rule.
    pub fn parse_filename_segment(pattern: &str) -> Result<Self, Error> {
        Self::compile(pattern, true)
    }

    fn compile(pattern: &str, leading_dot_sensitive: bool) -> Result<Self, Error> {
        let mut regex_src = String::from("(?s)^");
        let mut starts_with_wildcard = false;
        let mut literal_first_char_is_dot = false;
        for (i, ch) in pattern.chars().enumerate() {
            match ch {
                '*' => {
                    if i == 0 {
                        starts_with_wildcard = true;
                    }
                    regex_src.push_str(".*");
                }
                _ => {
                    if i == 0 && ch == '.' {
                        literal_first_char_is_dot = true;
                    }
                    regex_src.push_str(&regex::escape(&ch.to_string()));
                }
            }
        }
        regex_src.push('$');
        let regex = Regex::new(&regex_src)?;
        Ok(Pattern {
            regex,
            leading_dot_sensitive,
            starts_with_wildcard,
            literal_first_char_is_dot,
        })
    }

    /// Whether `candidate` matches this pattern.
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        if self.leading_dot_sensitive
            && self.starts_with_wildcard
            && !self.literal_first_char_is_dot
            && candidate.starts_with('.')
        {
            return false;
        }
        self.regex.is_match(candidate)
    }
}

/// Returns whether `text` contains a character that makes it a wildcard
/// pattern rather than a literal string.
#[must_use]
pub fn has_wildcard(text: &str) -> bool {
    text.contains('*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches_only_itself() {
        let p = Pattern::parse("abc").unwrap();
        assert!(p.is_match("abc"));
        assert!(!p.is_match("abcd"));
    }

    #[test]
    fn star_matches_any_run() {
        let p = Pattern::parse("a*c").unwrap();
        assert!(p.is_match("ac"));
        assert!(p.is_match("abbbc"));
        assert!(!p.is_match("ab"));
    }

    #[test]
    fn leading_dot_rule_only_applies_to_filenames() {
        let filename_pattern = Pattern::parse_filename_segment("*").unwrap();
        assert!(!filename_pattern.is_match(".hidden"));
        assert!(filename_pattern.is_match("visible"));

        let dot_prefixed = Pattern::parse_filename_segment(".*").unwrap();
        assert!(dot_prefixed.is_match(".hidden"));

        let case_pattern = Pattern::parse("*").unwrap();
        assert!(case_pattern.is_match(".hidden"));
    }

    #[test]
    fn has_wildcard_detects_star() {
        assert!(has_wildcard("a*b"));
        assert!(!has_wildcard("abc"));
    }
}
