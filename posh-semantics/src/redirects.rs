//! Bridges a parsed [`posh_syntax::Redirect`] list to the already-expanded
//! [`posh_env::redirect::ResolvedRedirect`] form the redirection engine
//! applies, expanding each target word (and, for a here-document, its
//! already-parsed body) along the way.

use crate::error::{ExpansionError, RedirectError};
use crate::expand::expand_scalar;
use posh_env::redirect::{RedirectTarget, ResolvedRedirect};
use posh_env::{Environment, RawFd, System};
use posh_syntax::{DupTarget, Redirect, RedirectBody};
use std::path::PathBuf;

pub fn resolve_redirects<S: System>(
    redirects: &[Redirect],
    env: &mut Environment,
    system: &mut S,
) -> Result<Vec<ResolvedRedirect>, RedirectError> {
    let mut out = Vec::with_capacity(redirects.len());
    for r in redirects {
        let target = match &r.body {
            RedirectBody::From(w) => RedirectTarget::OpenRead(PathBuf::from(expand_scalar(w, env, system)?)),
            RedirectBody::To(w) => RedirectTarget::OpenWrite(PathBuf::from(expand_scalar(w, env, system)?)),
            RedirectBody::Append(w) => RedirectTarget::OpenAppend(PathBuf::from(expand_scalar(w, env, system)?)),
            RedirectBody::DupIn(DupTarget::Close) | RedirectBody::DupOut(DupTarget::Close) => RedirectTarget::Close,
            RedirectBody::DupIn(DupTarget::Fd(w)) | RedirectBody::DupOut(DupTarget::Fd(w)) => {
                RedirectTarget::DupFrom(parse_fd(&expand_scalar(w, env, system)?)?)
            }
            RedirectBody::Here(h) => {
                let body = h.content.get().unwrap_or_default();
                RedirectTarget::HereDocContent(expand_scalar(&body, env, system)?)
            }
        };
        out.push(ResolvedRedirect { fd: r.fd, target });
    }
    Ok(out)
}

fn parse_fd(text: &str) -> Result<RawFd, ExpansionError> {
    text.parse().map_err(|_| ExpansionError::BadFd(text.to_owned()))
}
