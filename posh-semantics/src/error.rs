//! Errors raised while expanding words or resolving redirection targets.
//!
//! These are not control-flow unwinds (see [`crate::exec::Divert`]); they
//! represent an expansion that could not complete, and callers fold them
//! into a nonzero exit status plus a diagnostic on `stderr`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpansionError {
    #[error("arithmetic expansion failed: {0}")]
    Arithmetic(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("{0}: not a valid file descriptor")]
    BadFd(String),
    #[error(transparent)]
    System(#[from] posh_env::SystemError),
}

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error(transparent)]
    Expansion(#[from] ExpansionError),
    #[error(transparent)]
    Apply(#[from] posh_env::redirect::RedirectError),
}
