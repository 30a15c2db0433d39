//! Word expansion and command execution: the engine that drives a parsed
//! [`posh_syntax::CommandSequence`] against an [`posh_env::Environment`]
//! and a [`posh_env::System`].

pub mod builtins;
mod error;
pub mod exec;
pub mod expand;
mod glob;
mod redirects;

pub use error::{ExpansionError, RedirectError};
pub use exec::{run_program, run_to_status, Divert, ExecResult};
pub use expand::{expand_fields, expand_scalar};
