//! Scoped acquire/release of file descriptors around a command or compound.
//!
//! Callers first expand each [`posh_syntax::Redirect`]'s target word into a
//! [`ResolvedRedirect`] (that expansion needs the expansion engine, which
//! lives above this crate), then call [`apply`]. The returned [`Saver`]
//! restores every touched descriptor to what it pointed to before, when
//! [`Saver::restore`] is called — which callers must do on every exit path,
//! including early returns from a propagated control-flow unwind.

use crate::system::{OpenMode, RawFd, System};
use std::path::PathBuf;
use thiserror::Error;

/// What a single already-expanded redirection does to its target fd.
#[derive(Clone, Debug)]
pub enum RedirectTarget {
    OpenRead(PathBuf),
    OpenWrite(PathBuf),
    OpenAppend(PathBuf),
    /// Duplicate an already-open fd onto the target.
    DupFrom(RawFd),
    /// `N<&-` / `N>&-`: close the target fd.
    Close,
    /// A here-document's already-computed content, delivered through a
    /// pipe whose write end is fed by a forked writer.
    HereDocContent(String),
}

#[derive(Clone, Debug)]
pub struct ResolvedRedirect {
    pub fd: RawFd,
    pub target: RedirectTarget,
}

#[derive(Debug, Error)]
pub enum RedirectError {
    #[error(transparent)]
    System(#[from] crate::system::SystemError),
    #[error("{0}: no such file or directory")]
    NotFound(String),
}

/// Records which fds a scoped block has overwritten, and how to put them
/// back. `max` is the fds-on-or-above watermark used to park originals,
/// bumped past every newly parked fd so parking slots never collide with
/// each other or with fds the command itself opens.
#[derive(Debug)]
pub struct Saver {
    saved: Vec<(RawFd, Option<RawFd>)>,
    max: RawFd,
}

impl Saver {
    fn new() -> Self {
        Saver {
            saved: Vec::new(),
            max: 100,
        }
    }

    fn save<S: System>(&mut self, system: &mut S, fd: RawFd) -> Result<(), RedirectError> {
        if self.saved.iter().any(|&(orig, _)| orig == fd) {
            return Ok(());
        }
        match system.fcntl_dupfd(fd, self.max) {
            Ok(parked) => {
                self.max = parked + 1;
                self.saved.push((fd, Some(parked)));
            }
            Err(_) => {
                // fd wasn't open before; restoring means closing it again.
                self.saved.push((fd, None));
            }
        }
        Ok(())
    }

    /// Restores every touched fd to what it was before [`apply`] ran.
    pub fn restore<S: System>(self, system: &mut S) {
        for (orig, parked) in self.saved.into_iter().rev() {
            match parked {
                Some(parked) => {
                    let _ = system.dup2(parked, orig);
                    let _ = system.close(parked);
                }
                None => {
                    let _ = system.close(orig);
                }
            }
        }
    }
}

/// Applies `redirects` in order, saving each touched fd's previous state
/// the first time it's touched.
pub fn apply<S: System>(system: &mut S, redirects: &[ResolvedRedirect]) -> Result<Saver, RedirectError> {
    let mut saver = Saver::new();
    for r in redirects {
        if matches!(r.target, RedirectTarget::Close) {
            saver.save(system, r.fd)?;
            let _ = system.close(r.fd);
            continue;
        }

        let (src_fd, owned) = match &r.target {
            RedirectTarget::OpenRead(path) => (
                system
                    .open(path, OpenMode::Read)
                    .map_err(|_| RedirectError::NotFound(path.display().to_string()))?,
                true,
            ),
            RedirectTarget::OpenWrite(path) => {
                (system.open(path, OpenMode::WriteCreateTruncate)?, true)
            }
            RedirectTarget::OpenAppend(path) => {
                (system.open(path, OpenMode::WriteCreateAppend)?, true)
            }
            RedirectTarget::DupFrom(fd) => (*fd, false),
            RedirectTarget::HereDocContent(content) => (spawn_heredoc_writer(system, content)?, true),
            RedirectTarget::Close => unreachable!("handled above"),
        };

        if src_fd == r.fd {
            continue;
        }
        saver.save(system, r.fd)?;
        system.dup2(src_fd, r.fd)?;
        if owned {
            let _ = system.close(src_fd);
        }
    }
    Ok(saver)
}

/// Forks a child that writes `content` to a pipe and exits, returning the
/// read end for the parent to attach as the heredoc's source fd.
fn spawn_heredoc_writer<S: System>(system: &mut S, content: &str) -> Result<RawFd, RedirectError> {
    let (read_fd, write_fd) = system.pipe()?;
    match system.fork()? {
        crate::system::ForkResult::Child => {
            let _ = system.close(read_fd);
            let _ = system.write(write_fd, content.as_bytes());
            let _ = system.close(write_fd);
            system.exit(0);
        }
        crate::system::ForkResult::Parent(_) => {
            let _ = system.close(write_fd);
            Ok(read_fd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::r#virtual::VirtualSystem;

    #[test]
    fn redirecting_a_fd_onto_itself_is_a_no_op() {
        let mut sys = VirtualSystem::new();
        sys.set_fd(1, Vec::new());
        let saver = apply(&mut sys, &[ResolvedRedirect { fd: 1, target: RedirectTarget::DupFrom(1) }]).unwrap();
        saver.restore(&mut sys);
        sys.write(1, b"x").unwrap();
        assert_eq!(sys.fd_contents(1), b"x");
    }

    #[test]
    fn save_and_restore_round_trips_fd_table() {
        let mut sys = VirtualSystem::new().with_file("/out", "before");
        sys.set_fd(1, Vec::new());

        let saver = apply(
            &mut sys,
            &[ResolvedRedirect {
                fd: 1,
                target: RedirectTarget::OpenWrite(PathBuf::from("/out")),
            }],
        )
        .unwrap();
        sys.write(1, b"during").unwrap();
        saver.restore(&mut sys);

        sys.write(1, b"after").unwrap();
        assert_eq!(sys.fd_contents(1), b"after");
    }

    #[test]
    fn close_redirect_closes_the_target_fd() {
        let mut sys = VirtualSystem::new();
        sys.set_fd(3, Vec::new());
        apply(&mut sys, &[ResolvedRedirect { fd: 3, target: RedirectTarget::Close }]).unwrap();
        let mut buf = [0u8; 1];
        assert!(sys.read(3, &mut buf).is_err());
    }

    #[test]
    fn missing_input_file_is_reported_as_not_found() {
        let mut sys = VirtualSystem::new();
        let err = apply(
            &mut sys,
            &[ResolvedRedirect {
                fd: 0,
                target: RedirectTarget::OpenRead(PathBuf::from("/missing")),
            }],
        )
        .unwrap_err();
        assert!(matches!(err, RedirectError::NotFound(_)));
    }
}
