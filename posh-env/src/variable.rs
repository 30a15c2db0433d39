//! The variable scope chain and function table.
//!
//! Scopes form a parent-linked stack: the base scope at index 0 is always
//! present and never popped. `local` pushes a binding into whichever scope
//! is currently on top (usually one freshly pushed for a function call);
//! a plain assignment walks outward to whichever scope already owns the
//! name, falling back to the base scope if none do.

use posh_syntax::CommandSequence;
use std::collections::HashMap;
use std::rc::Rc;

/// One level of the scope chain.
#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, String>,
    /// `Some` in a function-call scope: `1..N` and `#`/`@` resolve here
    /// instead of walking further out.
    positional: Option<Vec<String>>,
}

/// The shell's variable scopes, function table, and the two process-wide
/// pieces of state (`?` and whether execution is currently permitted).
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
    functions: HashMap<String, Rc<CommandSequence>>,
    exit_status: i32,
    execution_permitted: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            scopes: vec![Scope::default()],
            functions: HashMap::new(),
            exit_status: 0,
            execution_permitted: true,
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// Looks up `name`, walking from the innermost scope outward.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.vars.get(name))
            .map(String::as_str)
    }

    /// Assigns `name = value` in the scope that already owns `name`, or the
    /// base scope if no scope does.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let owner = self
            .scopes
            .iter()
            .rposition(|s| s.vars.contains_key(name))
            .unwrap_or(0);
        self.scopes[owner].vars.insert(name.to_owned(), value.into());
    }

    /// `local NAME=VALUE`: creates `NAME` in the current (innermost) scope.
    pub fn declare_local(&mut self, name: &str, value: impl Into<String>) {
        let top = self.scopes.len() - 1;
        self.scopes[top].vars.insert(name.to_owned(), value.into());
    }

    /// `local NAME` with no `=`: creates `NAME` in the current scope,
    /// initialized to whatever value was already visible for it.
    pub fn declare_local_inherited(&mut self, name: &str) {
        let inherited = self.get(name).map(str::to_owned).unwrap_or_default();
        self.declare_local(name, inherited);
    }

    /// Pushes a function-call scope with the given positional parameters,
    /// runs `body`, then pops the scope unconditionally (even if `body`
    /// returns `Err`, e.g. on a propagated control-flow unwind).
    pub fn with_function_scope<T>(
        &mut self,
        args: Vec<String>,
        body: impl FnOnce(&mut Environment) -> T,
    ) -> T {
        self.scopes.push(Scope {
            vars: HashMap::new(),
            positional: Some(args),
        });
        let result = body(self);
        self.scopes.pop();
        result
    }

    /// The positional parameters visible at this point: the innermost
    /// function scope's, or none at the top level.
    pub fn positional_parameters(&self) -> Option<&[String]> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.positional.as_deref())
    }

    pub fn define_function(&mut self, name: impl Into<String>, body: Rc<CommandSequence>) {
        self.functions.insert(name.into(), body);
    }

    pub fn get_function(&self, name: &str) -> Option<Rc<CommandSequence>> {
        self.functions.get(name).cloned()
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    pub fn set_exit_status(&mut self, status: i32) {
        self.exit_status = status;
    }

    pub fn execution_permitted(&self) -> bool {
        self.execution_permitted
    }

    pub fn set_execution_permitted(&mut self, permitted: bool) {
        self.execution_permitted = permitted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_falls_back_to_base_scope() {
        let mut env = Environment::new();
        env.set("x", "1");
        assert_eq!(env.get("x"), Some("1"));
    }

    #[test]
    fn local_shadows_outer_binding_and_restores_it_on_pop() {
        let mut env = Environment::new();
        env.set("x", "1");
        env.with_function_scope(vec![], |env| {
            env.declare_local("x", "2");
            assert_eq!(env.get("x"), Some("2"));
        });
        assert_eq!(env.get("x"), Some("1"));
    }

    #[test]
    fn local_with_no_value_inherits_the_outer_one() {
        let mut env = Environment::new();
        env.set("x", "outer");
        env.with_function_scope(vec![], |env| {
            env.declare_local_inherited("x");
            assert_eq!(env.get("x"), Some("outer"));
            env.set("x", "inner");
            assert_eq!(env.get("x"), Some("inner"));
        });
        assert_eq!(env.get("x"), Some("outer"));
    }

    #[test]
    fn assignment_inside_function_targets_the_owning_outer_scope() {
        let mut env = Environment::new();
        env.set("x", "1");
        env.with_function_scope(vec![], |env| {
            env.set("x", "2");
        });
        assert_eq!(env.get("x"), Some("2"));
    }

    #[test]
    fn positional_parameters_are_scoped_to_the_function_call() {
        let mut env = Environment::new();
        assert_eq!(env.positional_parameters(), None);
        env.with_function_scope(vec!["a".into(), "b".into()], |env| {
            assert_eq!(env.positional_parameters(), Some(&["a".to_owned(), "b".to_owned()][..]));
        });
        assert_eq!(env.positional_parameters(), None);
    }

    #[test]
    fn functions_are_registered_globally() {
        let mut env = Environment::new();
        let body = Rc::new(CommandSequence::default());
        env.define_function("f", body.clone());
        env.with_function_scope(vec![], |env| {
            assert!(env.get_function("f").is_some());
        });
    }
}
