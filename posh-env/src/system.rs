//! The OS interface the execution engine forks and redirects through.
//!
//! [`System`] exposes exactly the syscalls the interpreter core needs —
//! nothing from job control, signals, or terminal handling, since those
//! are out of scope. [`real::RealSystem`] backs it with `nix`; every test
//! in this workspace that doesn't need to actually spawn a process uses
//! [`r#virtual::VirtualSystem`] instead.

pub mod real;
pub mod r#virtual;

use std::path::Path;
use thiserror::Error;

pub type RawFd = std::os::unix::io::RawFd;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    Read,
    WriteCreateTruncate,
    WriteCreateAppend,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FileStat {
    pub is_directory: bool,
    pub is_regular_file: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ForkResult {
    Parent(i32),
    Child,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExitStatus(pub i32);

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("{0}: {1}")]
    Os(&'static str, std::io::Error),
    #[error("operation not supported by this System implementation")]
    NotSupported,
}

pub type Result<T> = std::result::Result<T, SystemError>;

/// The OS operations the core depends on: open/close/dup/dup2/fcntl-dupfd,
/// pipe, fork, waitpid, execvp, chdir, fstat, and directory listing for
/// globbing, plus plain byte I/O on already-open descriptors.
pub trait System {
    fn open(&mut self, path: &Path, mode: OpenMode) -> Result<RawFd>;
    fn close(&mut self, fd: RawFd) -> Result<()>;
    fn dup(&mut self, fd: RawFd) -> Result<RawFd>;
    fn dup2(&mut self, src: RawFd, dst: RawFd) -> Result<RawFd>;
    fn fcntl_dupfd(&mut self, fd: RawFd, min_fd: RawFd) -> Result<RawFd>;
    fn pipe(&mut self) -> Result<(RawFd, RawFd)>;
    fn fork(&mut self) -> Result<ForkResult>;
    fn waitpid(&mut self, pid: i32) -> Result<ExitStatus>;
    /// Replaces the running child with `path`, run with `args` (`args[0]`
    /// is the program name). Never returns on success.
    fn execvp(&mut self, path: &str, args: &[String]) -> SystemError;
    fn chdir(&mut self, path: &Path) -> Result<()>;
    fn fstat(&mut self, fd: RawFd) -> Result<FileStat>;
    fn read_dir(&mut self, path: &Path) -> Result<Vec<String>>;
    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, fd: RawFd, buf: &[u8]) -> Result<usize>;
    fn exit(&mut self, status: i32) -> !;
}
