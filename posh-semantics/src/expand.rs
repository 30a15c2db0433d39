//! Word expansion: constants, variables, parameter operators, arithmetic,
//! command substitution, and the glob/no-glob split that feeds a [`Command`]
//! its argument vector.

use crate::error::ExpansionError;
use crate::exec;
use crate::glob::glob_expand;
use posh_env::{Environment, System};
use posh_syntax::{ParamOp, VariableRef, Word, WordPart};
use regex::Regex;

/// Resolves a variable or special-parameter reference to its current
/// string value. Unset names expand to the empty string, matching a
/// POSIX shell's default (unset-variable errors are out of scope).
pub fn lookup_variable(name: &str, env: &Environment) -> String {
    match name {
        "?" => env.exit_status().to_string(),
        "#" => env.positional_parameters().map_or(0, <[String]>::len).to_string(),
        "@" | "*" => env.positional_parameters().unwrap_or(&[]).join(" "),
        "!" | "0" => String::new(),
        digits if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            let idx: usize = digits.parse().unwrap_or(0);
            idx.checked_sub(1)
                .and_then(|i| env.positional_parameters().and_then(|p| p.get(i)))
                .cloned()
                .unwrap_or_default()
        }
        _ => env.get(name).unwrap_or_default().to_owned(),
    }
}

/// Adapts an [`Environment`] to [`posh_arith::Env`] so `$((...))` can read
/// shell variables and special parameters.
///
/// Each distinct name referenced by an expression is resolved once and
/// leaked for the `'static` lifetime `posh_arith::Env::get_variable`'s
/// borrow needs; arithmetic expressions are short and reference few
/// variables, so the leak is bounded in practice.
struct ArithEnv<'a>(&'a Environment);

impl posh_arith::Env for ArithEnv<'_> {
    type Error = std::convert::Infallible;

    fn get_variable(&self, name: &str) -> Result<Option<&str>, Self::Error> {
        let value = lookup_variable(name, self.0);
        Ok(Some(Box::leak(value.into_boxed_str())))
    }
}

fn expand_variable(v: &VariableRef, env: &Environment) -> String {
    lookup_variable(&v.name, env)
}

fn apply_param_op(value: &str, op: ParamOp, pattern: &str) -> Result<String, ExpansionError> {
    let body = pattern_body_regex(pattern)?;
    let boundaries: Vec<usize> = value
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(value.len()))
        .collect();

    let out = match op {
        ParamOp::Hash | ParamOp::HashHash => {
            let longest = op == ParamOp::HashHash;
            let mut order: Box<dyn Iterator<Item = &usize>> = if longest {
                Box::new(boundaries.iter().rev())
            } else {
                Box::new(boundaries.iter())
            };
            order
                .find(|&&end| body.is_match(&value[..end]))
                .map(|&end| value[end..].to_owned())
        }
        ParamOp::Percent | ParamOp::PercentPercent => {
            let longest = op == ParamOp::PercentPercent;
            let mut order: Box<dyn Iterator<Item = &usize>> = if longest {
                Box::new(boundaries.iter())
            } else {
                Box::new(boundaries.iter().rev())
            };
            order
                .find(|&&start| body.is_match(&value[start..]))
                .map(|&start| value[..start].to_owned())
        }
    };
    Ok(out.unwrap_or_else(|| value.to_owned()))
}

/// Builds a `^...$`-anchored regex from a shell glob pattern, for the
/// prefix/suffix scan in [`apply_param_op`]. `*` becomes `.*`; every other
/// character is escaped literally.
fn pattern_body_regex(pattern: &str) -> Result<Regex, ExpansionError> {
    let mut src = String::from("^");
    for ch in pattern.chars() {
        if ch == '*' {
            src.push_str(".*");
        } else {
            src.push_str(&regex::escape(&ch.to_string()));
        }
    }
    src.push('$');
    Regex::new(&src).map_err(|_| ExpansionError::InvalidPattern(pattern.to_owned()))
}

fn expand_command_substitution<S: System>(
    seq: &posh_syntax::CommandSequence,
    env: &mut Environment,
    system: &mut S,
) -> Result<String, ExpansionError> {
    let (read_fd, write_fd) = system.pipe()?;
    match system.fork()? {
        posh_env::ForkResult::Child => {
            let _ = system.close(read_fd);
            let _ = system.dup2(write_fd, 1);
            let _ = system.close(write_fd);
            let status = exec::run_to_status(seq, env, system);
            system.exit(status);
        }
        posh_env::ForkResult::Parent(pid) => {
            let _ = system.close(write_fd);
            let mut captured = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                match system.read(read_fd, &mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => captured.extend_from_slice(&chunk[..n]),
                }
            }
            let _ = system.close(read_fd);
            let _ = system.waitpid(pid);
            let mut text = String::from_utf8_lossy(&captured).into_owned();
            while text.ends_with('\n') {
                text.pop();
            }
            Ok(text)
        }
    }
}

fn expand_part<S: System>(part: &WordPart, env: &mut Environment, system: &mut S) -> Result<String, ExpansionError> {
    Ok(match part {
        WordPart::Constant(s) | WordPart::Token(s) => s.clone(),
        WordPart::Variable(v) => expand_variable(v, env),
        WordPart::ParameterOp { var, op, pattern } => {
            let value = expand_variable(var, env);
            let pattern_text = expand_scalar(pattern, env, system)?;
            apply_param_op(&value, *op, &pattern_text)?
        }
        WordPart::Arithmetic(expr) => expr
            .eval(&ArithEnv(env))
            .map_err(|e| ExpansionError::Arithmetic(e.to_string()))?
            .to_string(),
        WordPart::CommandSubstitution(seq) => expand_command_substitution(seq, env, system)?,
        WordPart::Glob(kind) => match kind {
            posh_syntax::GlobKind::Star => "*".to_owned(),
            posh_syntax::GlobKind::StarStar => "**".to_owned(),
        },
        WordPart::DoubleQuoted(inner) => expand_scalar(inner, env, system)?,
    })
}

/// Expands `word` to a single string: every part's expansion concatenated
/// in order. No field splitting is performed (IFS is out of scope); a
/// word's evaluation is always one string unless glob segmentation in
/// [`expand_fields`] splits it further.
pub fn expand_scalar<S: System>(word: &Word, env: &mut Environment, system: &mut S) -> Result<String, ExpansionError> {
    let mut out = String::new();
    for part in &word.parts {
        out.push_str(&expand_part(part, env, system)?);
    }
    Ok(out)
}

/// Expands `word` to the list of fields it produces: one, unless it
/// carries an unquoted glob sentinel, in which case the expanded string is
/// matched against the filesystem and every match becomes a field.
pub fn expand_fields<S: System>(word: &Word, env: &mut Environment, system: &mut S) -> Result<Vec<String>, ExpansionError> {
    let scalar = expand_scalar(word, env, system)?;
    if word.has_unquoted_glob() {
        Ok(glob_expand(&scalar, system))
    } else {
        Ok(vec![scalar])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posh_env::system::r#virtual::VirtualSystem;
    use std::str::FromStr;

    fn expand(src: &str, env: &mut Environment) -> String {
        let word = Word::from_str(src).unwrap();
        expand_scalar(&word, env, &mut VirtualSystem::new()).unwrap()
    }

    #[test]
    fn constants_and_variables_concatenate() {
        let mut env = Environment::new();
        env.set("a", "1");
        env.set("b", "2");
        assert_eq!(expand("$a$b", &mut env), "12");
    }

    #[test]
    fn exit_status_and_positional_count_are_visible() {
        let mut env = Environment::new();
        env.set_exit_status(7);
        assert_eq!(expand("$?", &mut env), "7");
        env.with_function_scope(vec!["a".into(), "b".into()], |env| {
            assert_eq!(lookup_variable("#", env), "2");
            assert_eq!(lookup_variable("1", env), "a");
            assert_eq!(lookup_variable("@", env), "a b");
        });
    }

    #[test]
    fn shortest_and_longest_prefix_removal() {
        assert_eq!(apply_param_op("xx123xx", ParamOp::Hash, "x").unwrap(), "x123xx");
        assert_eq!(apply_param_op("xx123xx", ParamOp::HashHash, "*x").unwrap(), "");
    }

    #[test]
    fn shortest_and_longest_suffix_removal() {
        assert_eq!(apply_param_op("xx123xx", ParamOp::Percent, "x").unwrap(), "xx123x");
        assert_eq!(apply_param_op("xx123xx", ParamOp::PercentPercent, "x*").unwrap(), "");
    }

    #[test]
    fn no_match_leaves_value_unchanged() {
        assert_eq!(apply_param_op("abc", ParamOp::Hash, "z").unwrap(), "abc");
    }

    #[test]
    fn arithmetic_expansion_reads_shell_variables() {
        let mut env = Environment::new();
        env.set("x", "4");
        assert_eq!(expand("$((x + 1))", &mut env), "5");
    }
}
