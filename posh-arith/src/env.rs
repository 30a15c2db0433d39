//! Variable lookup used while evaluating an expression.

use std::collections::HashMap;
use std::convert::Infallible;

/// Read-only access to variables referenced by an arithmetic expression.
///
/// `posh-arith` has no notion of a shell scope chain; the caller (normally
/// `posh-semantics`'s expansion engine) supplies one of these so that `$((x + 1))`
/// can resolve `x` against whatever environment is in scope.
pub trait Env {
    /// Error produced when a variable lookup itself fails (most callers use
    /// `Infallible` here; a scope chain lookup cannot fail).
    type Error;

    /// Returns the current value of `name`, or `None` if it is unset.
    fn get_variable(&self, name: &str) -> Result<Option<&str>, Self::Error>;
}

impl Env for HashMap<String, String> {
    type Error = Infallible;

    fn get_variable(&self, name: &str) -> Result<Option<&str>, Infallible> {
        Ok(self.get(name).map(String::as_str))
    }
}
