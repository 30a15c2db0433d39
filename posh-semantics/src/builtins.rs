//! The built-in command table: `echo`, `local`, `break`, `continue`,
//! `return`, `:`. Each built-in runs in the parent process, under
//! whatever redirects [`crate::exec::execute_command`] already installed.

use crate::exec::{Divert, ExecResult};
use posh_env::{Environment, System};
use std::ops::ControlFlow;

type Builtin = fn(&[String], &mut Environment, &mut dyn System) -> ExecResult;

pub fn lookup(name: &str) -> Option<Builtin> {
    Some(match name {
        "echo" => echo,
        "local" => local,
        "break" => break_builtin,
        "continue" => continue_builtin,
        "return" => return_builtin,
        ":" => colon,
        _ => return None,
    })
}

/// `psh/builtin.py`'s `echo` explicitly flushes after writing; there is no
/// userspace buffering layer in this `System` abstraction to flush (every
/// `write` is already a direct syscall), so that behavior is inherent here.
fn echo(args: &[String], _env: &mut Environment, system: &mut dyn System) -> ExecResult {
    let line = args[1..].join(" ");
    let _ = system.write(1, line.as_bytes());
    let _ = system.write(1, b"\n");
    ControlFlow::Continue(0)
}

fn local(args: &[String], env: &mut Environment, _system: &mut dyn System) -> ExecResult {
    for arg in &args[1..] {
        match arg.split_once('=') {
            Some((name, value)) => env.declare_local(name, value),
            None => env.declare_local_inherited(arg),
        }
    }
    ControlFlow::Continue(0)
}

fn depth(args: &[String]) -> u32 {
    args.get(1)
        .and_then(|s| s.parse().ok())
        .filter(|&n: &u32| n >= 1)
        .unwrap_or(1)
}

fn break_builtin(args: &[String], _env: &mut Environment, _system: &mut dyn System) -> ExecResult {
    ControlFlow::Break(Divert::Break(depth(args)))
}

fn continue_builtin(args: &[String], _env: &mut Environment, _system: &mut dyn System) -> ExecResult {
    ControlFlow::Break(Divert::Continue(depth(args)))
}

fn return_builtin(args: &[String], env: &mut Environment, _system: &mut dyn System) -> ExecResult {
    let status = args.get(1).and_then(|s| s.parse().ok()).unwrap_or_else(|| env.exit_status());
    ControlFlow::Break(Divert::Return(status))
}

fn colon(_args: &[String], _env: &mut Environment, _system: &mut dyn System) -> ExecResult {
    ControlFlow::Continue(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use posh_env::system::r#virtual::VirtualSystem;

    #[test]
    fn echo_joins_args_with_spaces_and_a_trailing_newline() {
        let mut env = Environment::new();
        let mut sys = VirtualSystem::new();
        sys.set_fd(1, Vec::new());
        echo(&["echo".into(), "a".into(), "b".into()], &mut env, &mut sys);
        assert_eq!(sys.fd_contents(1), b"a b\n");
    }

    #[test]
    fn local_with_no_value_inherits_the_outer_binding() {
        let mut env = Environment::new();
        env.set("x", "outer");
        let mut sys = VirtualSystem::new();
        env.with_function_scope(vec![], |env| {
            local(&["local".into(), "x".into()], env, &mut sys);
            assert_eq!(env.get("x"), Some("outer"));
        });
    }

    #[test]
    fn break_and_continue_default_to_depth_one() {
        assert_eq!(depth(&["break".into()]), 1);
        assert_eq!(depth(&["break".into(), "3".into()]), 3);
        assert_eq!(depth(&["break".into(), "0".into()]), 1);
    }

    #[test]
    fn return_with_no_argument_reuses_the_current_exit_status() {
        let mut env = Environment::new();
        env.set_exit_status(9);
        let mut sys = VirtualSystem::new();
        let result = return_builtin(&["return".into()], &mut env, &mut sys);
        assert_matches::assert_matches!(result, ControlFlow::Break(Divert::Return(9)));
    }
}
