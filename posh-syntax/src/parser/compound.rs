//! Compound commands: braces, `if`, `while`, `for`, `case` and function
//! definitions.

use crate::lex::{self, keyword};
use crate::parser::core::{choice, literal, many, optional, regex_match, Cursor, ParseError, PResult};
use crate::parser::layout::skip_layout;
use crate::parser::pipeline::command_sequence;
use crate::parser::redirect::redirect;
use crate::syntax::{Case, CaseClause, Condition, Function, For, Id, If, Node, Redirect, While};
use regex::Regex;
use std::rc::Rc;
use std::sync::OnceLock;

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name(cur: &mut Cursor<'_>) -> PResult<Id> {
    let re = crate::parser::core::cached_regex(&NAME_RE, r"^[a-zA-Z_][a-zA-Z0-9_]*");
    regex_match(cur, re).map(|s| s.to_owned())
}

fn redirects(cur: &mut Cursor<'_>) -> Vec<Redirect> {
    many(cur, |c| {
        lex::skip_ws(c);
        redirect(c)
    })
}

/// `compound_command = brace | if | while | for | case | function | command`.
pub fn compound_command(cur: &mut Cursor<'_>) -> PResult<Node> {
    choice(
        cur,
        &[
            &|c: &mut Cursor<'_>| brace(c).map(Node::Brace),
            &|c: &mut Cursor<'_>| if_command(c).map(Node::If),
            &|c: &mut Cursor<'_>| while_command(c).map(Node::While),
            &|c: &mut Cursor<'_>| for_command(c).map(Node::For),
            &|c: &mut Cursor<'_>| case_command(c).map(Node::Case),
            &|c: &mut Cursor<'_>| function_def(c).map(Node::FunctionDef),
            &|c: &mut Cursor<'_>| {
                let cmd = crate::parser::command::simple_command(c)?;
                if cmd.is_null() {
                    Err(ParseError::new(c.pos, "no command here"))
                } else {
                    Ok(Node::Simple(cmd))
                }
            },
        ],
    )
}

fn brace(cur: &mut Cursor<'_>) -> PResult<crate::syntax::CommandSequence> {
    literal(cur, "{")?;
    skip_layout(cur);
    let body = command_sequence(cur)?;
    skip_layout(cur);
    literal(cur, "}")?;
    Ok(body)
}

fn if_command(cur: &mut Cursor<'_>) -> PResult<If> {
    keyword(cur, "if")?;
    skip_layout(cur);
    let mut arms = Vec::new();
    let cond = command_sequence(cur)?;
    skip_layout(cur);
    keyword(cur, "then")?;
    skip_layout(cur);
    let body = command_sequence(cur)?;
    arms.push((Condition::Test(cond), body));
    loop {
        skip_layout(cur);
        if optional(cur, |c| keyword(c, "elif")).is_some() {
            skip_layout(cur);
            let cond = command_sequence(cur)?;
            skip_layout(cur);
            keyword(cur, "then")?;
            skip_layout(cur);
            let body = command_sequence(cur)?;
            arms.push((Condition::Test(cond), body));
            continue;
        }
        if optional(cur, |c| keyword(c, "else")).is_some() {
            skip_layout(cur);
            let body = command_sequence(cur)?;
            arms.push((Condition::Otherwise, body));
        }
        break;
    }
    skip_layout(cur);
    keyword(cur, "fi")?;
    Ok(If {
        arms,
        redirects: redirects(cur),
    })
}

fn while_command(cur: &mut Cursor<'_>) -> PResult<While> {
    keyword(cur, "while")?;
    skip_layout(cur);
    let condition = command_sequence(cur)?;
    skip_layout(cur);
    keyword(cur, "do")?;
    skip_layout(cur);
    let body = command_sequence(cur)?;
    skip_layout(cur);
    keyword(cur, "done")?;
    Ok(While {
        condition,
        body,
        redirects: redirects(cur),
    })
}

fn for_command(cur: &mut Cursor<'_>) -> PResult<For> {
    keyword(cur, "for")?;
    skip_layout(cur);
    let var = name(cur)?;
    skip_layout(cur);
    let words = if optional(cur, |c| keyword(c, "in")).is_some() {
        skip_layout(cur);
        let mut ws = Vec::new();
        loop {
            let mut attempt = cur.clone();
            lex::skip_ws(&mut attempt);
            match lex::word(&mut attempt) {
                Ok(w) => {
                    *cur = attempt;
                    ws.push(w);
                }
                Err(_) => break,
            }
        }
        Some(ws)
    } else {
        None
    };
    skip_layout(cur);
    if words.is_some() {
        // Optional statement terminator before `do`.
        let _ = optional(cur, |c| literal(c, ";"));
        skip_layout(cur);
    }
    keyword(cur, "do")?;
    skip_layout(cur);
    let body = command_sequence(cur)?;
    skip_layout(cur);
    keyword(cur, "done")?;
    Ok(For {
        var,
        words,
        body,
        redirects: redirects(cur),
    })
}

fn case_command(cur: &mut Cursor<'_>) -> PResult<Case> {
    keyword(cur, "case")?;
    skip_layout(cur);
    let subject = lex::word(cur)?;
    skip_layout(cur);
    keyword(cur, "in")?;
    skip_layout(cur);
    let mut clauses = Vec::new();
    while optional(cur, |c| keyword(c, "esac")).is_none() {
        let _ = optional(cur, |c| literal(c, "("));
        let mut patterns = vec![lex::word(cur)?];
        loop {
            lex::skip_ws(cur);
            if optional(cur, |c| literal(c, "|")).is_some() {
                lex::skip_ws(cur);
                patterns.push(lex::word(cur)?);
            } else {
                break;
            }
        }
        lex::skip_ws(cur);
        literal(cur, ")")?;
        skip_layout(cur);
        let body = command_sequence(cur)?;
        skip_layout(cur);
        let _ = optional(cur, |c| literal(c, ";;"));
        skip_layout(cur);
        clauses.push(CaseClause { patterns, body });
        if optional(cur, |c| keyword(c, "esac")).is_some() {
            break;
        }
    }
    Ok(Case {
        subject,
        clauses,
        redirects: redirects(cur),
    })
}

fn function_def(cur: &mut Cursor<'_>) -> PResult<Function> {
    let fn_name = name(cur)?;
    lex::skip_ws(cur);
    literal(cur, "(")?;
    lex::skip_ws(cur);
    literal(cur, ")")?;
    skip_layout(cur);
    let body = brace(cur)?;
    Ok(Function {
        name: fn_name,
        body: Rc::new(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_while_loop() {
        let mut cur = Cursor::new("while false; do echo x; done");
        let w = while_command(&mut cur).unwrap();
        assert_eq!(w.condition.units.len(), 1);
        assert_eq!(w.body.units.len(), 1);
    }

    #[test]
    fn parses_if_elif_else() {
        let src = "if a; then b; elif c; then d; else e; fi";
        let mut cur = Cursor::new(src);
        let n = if_command(&mut cur).unwrap();
        assert_eq!(n.arms.len(), 3);
        assert!(matches!(n.arms[2].0, Condition::Otherwise));
    }

    #[test]
    fn for_defaults_positional_parameters_when_in_is_omitted() {
        let mut cur = Cursor::new("for i; do echo $i; done");
        let f = for_command(&mut cur).unwrap();
        assert!(f.words.is_none());
    }

    #[test]
    fn parses_for_with_word_list() {
        let mut cur = Cursor::new("for i in a b c; do echo $i; done");
        let f = for_command(&mut cur).unwrap();
        assert_eq!(f.words.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn parses_case_with_multiple_patterns() {
        let src = "case x in a) echo A ;; x) echo X ;; *) echo O ;; esac";
        let mut cur = Cursor::new(src);
        let c = case_command(&mut cur).unwrap();
        assert_eq!(c.clauses.len(), 3);
    }

    #[test]
    fn parses_function_definition() {
        let mut cur = Cursor::new("f() { local x=2; echo $x; }");
        let f = function_def(&mut cur).unwrap();
        assert_eq!(f.name, "f");
    }
}
