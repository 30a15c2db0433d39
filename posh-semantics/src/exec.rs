//! Execution of the command AST: simple commands, pipelines, and the
//! control constructs, dispatched against a [`System`] and an
//! [`Environment`].
//!
//! Every node returns an [`ExecResult`]: `ControlFlow::Continue(status)` on
//! ordinary completion, or `ControlFlow::Break(divert)` for a break,
//! continue, or return unwind threading its way out through enclosing
//! `CommandSequence`s until something catches it.

use crate::builtins;
use crate::expand::{expand_fields, expand_scalar};
use crate::redirects::resolve_redirects;
use posh_env::redirect::apply as apply_redirects;
use posh_env::{Environment, ForkResult, System};
use posh_syntax::{Case, Command, CommandPipe, CommandSequence, Condition, For, If, Node, While};
use std::ops::ControlFlow;

/// A non-local unwind carrying the depth (for break/continue) or the exit
/// status (for return) it was raised with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Divert {
    Break(u32),
    Continue(u32),
    Return(i32),
}

pub type ExecResult = ControlFlow<Divert, i32>;

fn report<S: System>(system: &mut S, message: &str) {
    let _ = system.write(2, message.as_bytes());
    let _ = system.write(2, b"\n");
}

/// Collapses any uncaught unwind into a plain status: a `return` with no
/// enclosing function becomes its own code, an uncaught break/continue
/// becomes 1.
fn collapse(result: ExecResult) -> i32 {
    match result {
        ControlFlow::Continue(status) => status,
        ControlFlow::Break(Divert::Return(status)) => status,
        ControlFlow::Break(_) => 1,
    }
}

/// Runs `seq`, collapsing any uncaught unwind. Used by the top-level
/// driver and by a command substitution's forked child, neither of which
/// has anywhere further out to propagate an unwind to.
pub fn run_to_status<S: System>(seq: &CommandSequence, env: &mut Environment, system: &mut S) -> i32 {
    collapse(execute_sequence(seq, env, system))
}

pub fn execute_sequence<S: System>(seq: &CommandSequence, env: &mut Environment, system: &mut S) -> ExecResult {
    let mut status = 0;
    for pipe in &seq.units {
        match execute_pipe(pipe, env, system) {
            ControlFlow::Continue(s) => status = s,
            brk => return brk,
        }
    }
    ControlFlow::Continue(status)
}

fn execute_pipe<S: System>(pipe: &CommandPipe, env: &mut Environment, system: &mut S) -> ExecResult {
    if pipe.units.len() == 1 {
        return execute_node(&pipe.units[0], env, system);
    }

    let mut prev_read = None;
    let mut children = Vec::new();
    let last = pipe.units.len() - 1;

    for (i, unit) in pipe.units.iter().enumerate() {
        if i == last {
            let saved = prev_read.map(|r| {
                let saver = apply_redirects(system, &[posh_env::redirect::ResolvedRedirect {
                    fd: 0,
                    target: posh_env::redirect::RedirectTarget::DupFrom(r),
                }]);
                (r, saver)
            });
            let result = execute_node(unit, env, system);
            if let Some((r, saver)) = saved {
                if let Ok(saver) = saver {
                    saver.restore(system);
                }
                let _ = system.close(r);
            }
            for pid in children {
                let _ = system.waitpid(pid);
            }
            return result;
        }

        let Ok((read_fd, write_fd)) = system.pipe() else {
            report(system, "pipe: resource exhausted");
            return ControlFlow::Continue(1);
        };
        match system.fork() {
            Ok(ForkResult::Child) => {
                if let Some(r) = prev_read {
                    let _ = system.dup2(r, 0);
                    let _ = system.close(r);
                }
                let _ = system.dup2(write_fd, 1);
                let _ = system.close(write_fd);
                let _ = system.close(read_fd);
                let status = collapse(execute_node(unit, env, system));
                system.exit(status);
            }
            Ok(ForkResult::Parent(pid)) => {
                children.push(pid);
                let _ = system.close(write_fd);
                if let Some(r) = prev_read {
                    let _ = system.close(r);
                }
                prev_read = Some(read_fd);
            }
            Err(_) => {
                report(system, "fork: resource exhausted");
                let _ = system.close(read_fd);
                let _ = system.close(write_fd);
                return ControlFlow::Continue(1);
            }
        }
    }
    unreachable!("loop always returns at the last unit")
}

fn execute_node<S: System>(node: &Node, env: &mut Environment, system: &mut S) -> ExecResult {
    match node {
        Node::Simple(cmd) => execute_command(cmd, env, system),
        Node::Brace(seq) => execute_sequence(seq, env, system),
        Node::If(n) => execute_if(n, env, system),
        Node::While(n) => execute_while(n, env, system),
        Node::For(n) => execute_for(n, env, system),
        Node::Case(n) => execute_case(n, env, system),
        Node::FunctionDef(f) => {
            env.define_function(f.name.clone(), f.body.clone());
            ControlFlow::Continue(0)
        }
    }
}

/// Resolves and applies `redirects`, runs `body`, then unconditionally
/// restores the previous fd state — even when `body` returns a
/// propagated unwind.
fn with_redirects<S: System>(
    redirects: &[posh_syntax::Redirect],
    env: &mut Environment,
    system: &mut S,
    body: impl FnOnce(&mut Environment, &mut S) -> ExecResult,
) -> ExecResult {
    let resolved = match resolve_redirects(redirects, env, system) {
        Ok(r) => r,
        Err(e) => {
            report(system, &e.to_string());
            env.set_exit_status(1);
            return ControlFlow::Continue(1);
        }
    };
    let saver = match apply_redirects(system, &resolved) {
        Ok(s) => s,
        Err(e) => {
            report(system, &e.to_string());
            env.set_exit_status(1);
            return ControlFlow::Continue(1);
        }
    };
    let result = body(env, system);
    saver.restore(system);
    result
}

fn execute_command<S: System>(cmd: &Command, env: &mut Environment, system: &mut S) -> ExecResult {
    if !env.execution_permitted() {
        report(system, "execution is not permitted in this context");
        return ControlFlow::Continue(126);
    }

    for assign in &cmd.assigns {
        match expand_scalar(&assign.value, env, system) {
            Ok(value) => env.set(&assign.name, value),
            Err(e) => {
                report(system, &e.to_string());
                env.set_exit_status(1);
                return ControlFlow::Continue(1);
            }
        }
    }
    if cmd.words.is_empty() {
        return ControlFlow::Continue(0);
    }

    let mut argv = Vec::new();
    for word in &cmd.words {
        match expand_fields(word, env, system) {
            Ok(fields) => argv.extend(fields),
            Err(e) => {
                report(system, &e.to_string());
                env.set_exit_status(1);
                return ControlFlow::Continue(1);
            }
        }
    }
    if argv.is_empty() {
        return ControlFlow::Continue(0);
    }

    let resolved = match resolve_redirects(&cmd.redirects, env, system) {
        Ok(r) => r,
        Err(e) => {
            report(system, &e.to_string());
            env.set_exit_status(1);
            return ControlFlow::Continue(1);
        }
    };

    let name = argv[0].clone();

    if let Some(builtin) = builtins::lookup(&name) {
        let saver = match apply_redirects(system, &resolved) {
            Ok(s) => s,
            Err(e) => {
                report(system, &e.to_string());
                env.set_exit_status(1);
                return ControlFlow::Continue(1);
            }
        };
        let result = builtin(&argv, env, system);
        saver.restore(system);
        if let ControlFlow::Continue(status) = result {
            env.set_exit_status(status);
        }
        return result;
    }

    if let Some(body) = env.get_function(&name) {
        let saver = match apply_redirects(system, &resolved) {
            Ok(s) => s,
            Err(e) => {
                report(system, &e.to_string());
                env.set_exit_status(1);
                return ControlFlow::Continue(1);
            }
        };
        let args = argv[1..].to_vec();
        let inner = env.with_function_scope(args, |env| execute_sequence(&body, env, system));
        saver.restore(system);
        let status = match inner {
            ControlFlow::Continue(s) => s,
            ControlFlow::Break(Divert::Return(s)) => s,
            ControlFlow::Break(unwind) => {
                report(system, &format!("{unwind:?} escaped the function body uncaught"));
                collapse(ControlFlow::Break(unwind))
            }
        };
        env.set_exit_status(status);
        return ControlFlow::Continue(status);
    }

    match system.fork() {
        Ok(ForkResult::Child) => {
            if apply_redirects(system, &resolved).is_err() {
                system.exit(126);
            }
            system.execvp(&name, &argv);
            system.exit(127);
        }
        Ok(ForkResult::Parent(pid)) => {
            let status = match system.waitpid(pid) {
                Ok(posh_env::ExitStatus(code)) => code,
                Err(_) => 1,
            };
            env.set_exit_status(status);
            ControlFlow::Continue(status)
        }
        Err(_) => {
            report(system, "fork: resource exhausted");
            env.set_exit_status(1);
            ControlFlow::Continue(1)
        }
    }
}

fn execute_if<S: System>(n: &If, env: &mut Environment, system: &mut S) -> ExecResult {
    with_redirects(&n.redirects, env, system, |env, system| {
        for (cond, body) in &n.arms {
            match cond {
                Condition::Otherwise => return execute_sequence(body, env, system),
                Condition::Test(test) => match execute_sequence(test, env, system) {
                    ControlFlow::Continue(0) => return execute_sequence(body, env, system),
                    ControlFlow::Continue(_) => continue,
                    brk => return brk,
                },
            }
        }
        ControlFlow::Continue(0)
    })
}

fn execute_while<S: System>(n: &While, env: &mut Environment, system: &mut S) -> ExecResult {
    with_redirects(&n.redirects, env, system, |env, system| loop {
        match execute_sequence(&n.condition, env, system) {
            ControlFlow::Continue(0) => {}
            ControlFlow::Continue(status) => return ControlFlow::Continue(status),
            brk => return brk,
        }
        match execute_sequence(&n.body, env, system) {
            ControlFlow::Continue(_) => {}
            ControlFlow::Break(Divert::Break(depth)) => {
                return if depth <= 1 {
                    ControlFlow::Continue(0)
                } else {
                    ControlFlow::Break(Divert::Break(depth - 1))
                };
            }
            ControlFlow::Break(Divert::Continue(depth)) => {
                if depth <= 1 {
                    continue;
                }
                return ControlFlow::Break(Divert::Continue(depth - 1));
            }
            brk => return brk,
        }
    })
}

fn execute_for<S: System>(n: &For, env: &mut Environment, system: &mut S) -> ExecResult {
    with_redirects(&n.redirects, env, system, |env, system| {
        let values = match &n.words {
            Some(words) => {
                let mut out = Vec::new();
                for w in words {
                    match expand_fields(w, env, system) {
                        Ok(fields) => out.extend(fields),
                        Err(e) => {
                            report(system, &e.to_string());
                            env.set_exit_status(1);
                            return ControlFlow::Continue(1);
                        }
                    }
                }
                out
            }
            None => env.positional_parameters().unwrap_or(&[]).to_vec(),
        };

        let mut last = 0;
        for value in values {
            env.set(&n.var, value);
            match execute_sequence(&n.body, env, system) {
                ControlFlow::Continue(s) => last = s,
                ControlFlow::Break(Divert::Break(depth)) => {
                    return if depth <= 1 {
                        ControlFlow::Continue(0)
                    } else {
                        ControlFlow::Break(Divert::Break(depth - 1))
                    };
                }
                ControlFlow::Break(Divert::Continue(depth)) => {
                    if depth <= 1 {
                        continue;
                    }
                    return ControlFlow::Break(Divert::Continue(depth - 1));
                }
                brk => return brk,
            }
        }
        ControlFlow::Continue(last)
    })
}

fn execute_case<S: System>(n: &Case, env: &mut Environment, system: &mut S) -> ExecResult {
    with_redirects(&n.redirects, env, system, |env, system| {
        let subject = match expand_scalar(&n.subject, env, system) {
            Ok(s) => s,
            Err(e) => {
                report(system, &e.to_string());
                env.set_exit_status(1);
                return ControlFlow::Continue(1);
            }
        };
        for clause in &n.clauses {
            for pattern in &clause.patterns {
                let text = match expand_scalar(pattern, env, system) {
                    Ok(s) => s,
                    Err(e) => {
                        report(system, &e.to_string());
                        env.set_exit_status(1);
                        return ControlFlow::Continue(1);
                    }
                };
                let Ok(compiled) = posh_fnmatch::Pattern::parse(&text) else {
                    continue;
                };
                if compiled.is_match(&subject) {
                    return execute_sequence(&clause.body, env, system);
                }
            }
        }
        ControlFlow::Continue(0)
    })
}

/// Runs a whole program, surfacing an unwind that escapes every enclosing
/// construct (a bare top-level `return`, or an unmatched `break`/
/// `continue`) as an error rather than silently discarding it.
pub fn run_program<S: System>(seq: &CommandSequence, env: &mut Environment, system: &mut S) -> Result<i32, String> {
    match execute_sequence(seq, env, system) {
        ControlFlow::Continue(status) => Ok(status),
        ControlFlow::Break(Divert::Return(_)) => Err("return used outside a function".to_owned()),
        ControlFlow::Break(Divert::Break(_)) => Err("break used outside a loop".to_owned()),
        ControlFlow::Break(Divert::Continue(_)) => Err("continue used outside a loop".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posh_env::system::r#virtual::VirtualSystem;
    use std::str::FromStr;

    fn run(src: &str) -> (i32, Vec<u8>) {
        let seq = CommandSequence::from_str(src).unwrap();
        let mut env = Environment::new();
        let mut sys = VirtualSystem::new();
        sys.set_fd(1, Vec::new());
        let status = run_to_status(&seq, &mut env, &mut sys);
        (status, sys.fd_contents(1))
    }

    #[test]
    fn assignment_then_echo_sees_no_field_splitting() {
        let (status, out) = run("a=1 b=2 echo $a$b");
        assert_eq!(status, 0);
        assert_eq!(out, b"12\n");
    }

    #[test]
    fn while_loop_runs_until_the_condition_returns_nonzero() {
        let (_, out) = run(
            "count=0; cond() { count=$((count+1)); case $count in 4) return 1 ;; *) return 0 ;; esac; }; \
             while cond; do echo $count; done; echo done",
        );
        assert_eq!(out, b"1\n2\n3\ndone\n");
    }

    #[test]
    fn for_loop_iterates_in_order() {
        let (_, out) = run("for i in a b c; do echo $i; done");
        assert_eq!(out, b"a\nb\nc\n");
    }

    #[test]
    fn case_runs_first_matching_clause() {
        let (_, out) = run("case x in a) echo A ;; x) echo X ;; *) echo O ;; esac");
        assert_eq!(out, b"X\n");
    }

    #[test]
    fn break_unwinds_exactly_one_enclosing_loop() {
        let (_, out) = run("for i in a b c; do case $i in b) break ;; esac; echo $i; done");
        assert_eq!(out, b"a\n");
    }

    #[test]
    fn function_return_is_caught_at_the_call_site() {
        let (status, out) = run("f() { echo before; return 3; echo after; }; f; echo $?");
        assert_eq!(out, b"before\n3\n");
        assert_eq!(status, 0);
    }

    #[test]
    fn local_shadows_and_restores_across_a_function_call() {
        let (_, out) = run("x=1; f() { local x=2; echo $x; }; f; echo $x");
        assert_eq!(out, b"2\n1\n");
    }

    #[test]
    fn a_break_uncaught_inside_a_function_body_does_not_escape_the_call() {
        let (_, out) = run("f() { break; }; for i in a b c; do f; echo $i; done");
        assert_eq!(out, b"a\nb\nc\n");
    }

    #[test]
    fn expansion_errors_set_a_nonzero_exit_status() {
        let (status, _) = run("echo $((1/0)); echo done");
        assert_ne!(status, 0);
    }
}

/// Coverage that needs a real fork/exec/pipe, which [`VirtualSystem`]
/// deliberately doesn't implement: runs against short-lived, always-present
/// external programs instead of mocking a process scheduler.
#[cfg(test)]
mod real_system_tests {
    use super::*;
    use posh_env::system::real::RealSystem;
    use std::str::FromStr;

    /// Runs `src` (with `{out}` standing for an absolute path to a fresh,
    /// empty file) and returns the exit status plus that file's contents.
    fn run(src: &str) -> (i32, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let out_path = dir.path().join("captured");
        let seq = CommandSequence::from_str(&src.replace("{out}", &out_path.display().to_string())).unwrap();
        let mut env = Environment::new();
        let mut sys = RealSystem;
        let status = run_to_status(&seq, &mut env, &mut sys);
        (status, std::fs::read(&out_path).unwrap_or_default())
    }

    #[test]
    fn an_external_command_runs_and_its_exit_status_is_visible() {
        let seq = CommandSequence::from_str("true").unwrap();
        let mut env = Environment::new();
        let mut sys = RealSystem;
        assert_eq!(run_to_status(&seq, &mut env, &mut sys), 0);

        let seq = CommandSequence::from_str("false").unwrap();
        assert_eq!(run_to_status(&seq, &mut env, &mut sys), 1);
    }

    #[test]
    fn a_pipeline_forks_every_non_last_stage_and_joins_their_output() {
        let (status, out) = run("echo hello | cat > {out}");
        assert_eq!(status, 0);
        assert_eq!(out, b"hello\n");
    }

    #[test]
    fn command_substitution_captures_a_forked_childs_stdout() {
        let (status, out) = run("echo \"$(echo one; echo two)\" > {out}");
        assert_eq!(status, 0);
        assert_eq!(out, b"one\ntwo\n");
    }
}
