//! An in-memory [`System`] mock, so that environment, redirection and
//! built-in tests run hermetically without touching the real filesystem
//! or spawning real processes.
//!
//! `fork`/`waitpid`/`execvp` have no in-memory equivalent worth building —
//! that would mean re-implementing a process scheduler, which is exactly
//! the async-executor machinery this workspace deliberately drops. Tests
//! that exercise pipelines or external commands use [`super::real::RealSystem`]
//! against short-lived, always-available programs (`true`, `false`, `cat`)
//! instead; this mock covers everything else: redirection's fd-table
//! bookkeeping, variable scoping, and built-in dispatch.

use super::{ExitStatus, FileStat, ForkResult, OpenMode, RawFd, Result, System, SystemError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type Buffer = Rc<RefCell<Vec<u8>>>;
type PipeBuffer = Rc<RefCell<VecDeque<u8>>>;

enum FdEntry {
    File { buffer: Buffer, pos: usize },
    PipeRead(PipeBuffer),
    PipeWrite(PipeBuffer),
}

impl Clone for FdEntry {
    fn clone(&self) -> Self {
        match self {
            FdEntry::File { buffer, pos } => FdEntry::File {
                buffer: buffer.clone(),
                pos: *pos,
            },
            FdEntry::PipeRead(b) => FdEntry::PipeRead(b.clone()),
            FdEntry::PipeWrite(b) => FdEntry::PipeWrite(b.clone()),
        }
    }
}

/// An in-memory filesystem and file-descriptor table.
#[derive(Default)]
pub struct VirtualSystem {
    files: HashMap<PathBuf, Buffer>,
    dirs: HashMap<PathBuf, Vec<String>>,
    fds: HashMap<RawFd, FdEntry>,
    next_fd: RawFd,
}

impl VirtualSystem {
    pub fn new() -> Self {
        VirtualSystem {
            next_fd: 3,
            ..Default::default()
        }
    }

    /// Seeds a regular file with the given content.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(path.into(), Rc::new(RefCell::new(content.into())));
        self
    }

    /// Seeds a directory listing (as returned by `readdir`).
    pub fn with_dir(mut self, path: impl Into<PathBuf>, entries: Vec<String>) -> Self {
        self.dirs.insert(path.into(), entries);
        self
    }

    /// Opens `fd` onto a buffer-backed sink other than a named file, e.g.
    /// to stand in for a captured stdout/stderr. Returns the fd it was
    /// assigned, or `fd` itself if given explicitly via [`Self::set_fd`].
    pub fn set_fd(&mut self, fd: RawFd, content: impl Into<Vec<u8>>) {
        let buffer = Rc::new(RefCell::new(content.into()));
        self.fds.insert(fd, FdEntry::File { buffer, pos: 0 });
        self.next_fd = self.next_fd.max(fd + 1);
    }

    /// The bytes written so far to `fd`, for assertions in tests.
    pub fn fd_contents(&self, fd: RawFd) -> Vec<u8> {
        match self.fds.get(&fd) {
            Some(FdEntry::File { buffer, .. }) => buffer.borrow().clone(),
            _ => Vec::new(),
        }
    }

    fn alloc_fd(&mut self, min: RawFd) -> RawFd {
        let mut fd = min.max(self.next_fd);
        while self.fds.contains_key(&fd) {
            fd += 1;
        }
        self.next_fd = self.next_fd.max(fd + 1);
        fd
    }

    fn not_found(op: &'static str) -> SystemError {
        SystemError::Os(op, io::Error::from(io::ErrorKind::NotFound))
    }

    fn bad_fd(op: &'static str) -> SystemError {
        SystemError::Os(op, io::Error::from_raw_os_error(libc::EBADF))
    }
}

impl System for VirtualSystem {
    fn open(&mut self, path: &Path, mode: OpenMode) -> Result<RawFd> {
        let buffer = match mode {
            OpenMode::Read => self.files.get(path).cloned().ok_or_else(|| Self::not_found("open"))?,
            OpenMode::WriteCreateTruncate => {
                let buffer = Rc::new(RefCell::new(Vec::new()));
                self.files.insert(path.to_owned(), buffer.clone());
                buffer
            }
            OpenMode::WriteCreateAppend => self
                .files
                .entry(path.to_owned())
                .or_insert_with(|| Rc::new(RefCell::new(Vec::new())))
                .clone(),
        };
        let pos = if mode == OpenMode::WriteCreateAppend {
            buffer.borrow().len()
        } else {
            0
        };
        let fd = self.alloc_fd(3);
        self.fds.insert(fd, FdEntry::File { buffer, pos });
        Ok(fd)
    }

    fn close(&mut self, fd: RawFd) -> Result<()> {
        self.fds.remove(&fd).map(|_| ()).ok_or_else(|| Self::bad_fd("close"))
    }

    fn dup(&mut self, fd: RawFd) -> Result<RawFd> {
        let entry = self.fds.get(&fd).cloned().ok_or_else(|| Self::bad_fd("dup"))?;
        let new_fd = self.alloc_fd(3);
        self.fds.insert(new_fd, entry);
        Ok(new_fd)
    }

    fn dup2(&mut self, src: RawFd, dst: RawFd) -> Result<RawFd> {
        let entry = self.fds.get(&src).cloned().ok_or_else(|| Self::bad_fd("dup2"))?;
        self.fds.insert(dst, entry);
        self.next_fd = self.next_fd.max(dst + 1);
        Ok(dst)
    }

    fn fcntl_dupfd(&mut self, fd: RawFd, min_fd: RawFd) -> Result<RawFd> {
        let entry = self.fds.get(&fd).cloned().ok_or_else(|| Self::bad_fd("fcntl_dupfd"))?;
        let new_fd = self.alloc_fd(min_fd);
        self.fds.insert(new_fd, entry);
        Ok(new_fd)
    }

    fn pipe(&mut self) -> Result<(RawFd, RawFd)> {
        let buffer: PipeBuffer = Rc::new(RefCell::new(VecDeque::new()));
        let read_fd = self.alloc_fd(3);
        self.fds.insert(read_fd, FdEntry::PipeRead(buffer.clone()));
        let write_fd = self.alloc_fd(3);
        self.fds.insert(write_fd, FdEntry::PipeWrite(buffer));
        Ok((read_fd, write_fd))
    }

    fn fork(&mut self) -> Result<ForkResult> {
        Err(SystemError::NotSupported)
    }

    fn waitpid(&mut self, _pid: i32) -> Result<ExitStatus> {
        Err(SystemError::NotSupported)
    }

    fn execvp(&mut self, _path: &str, _args: &[String]) -> SystemError {
        SystemError::NotSupported
    }

    fn chdir(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn fstat(&mut self, fd: RawFd) -> Result<FileStat> {
        match self.fds.get(&fd) {
            Some(FdEntry::File { .. }) => Ok(FileStat {
                is_directory: false,
                is_regular_file: true,
            }),
            Some(_) => Ok(FileStat {
                is_directory: false,
                is_regular_file: false,
            }),
            None => Err(Self::bad_fd("fstat")),
        }
    }

    fn read_dir(&mut self, path: &Path) -> Result<Vec<String>> {
        self.dirs.get(path).cloned().ok_or_else(|| Self::not_found("readdir"))
    }

    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> Result<usize> {
        match self.fds.get_mut(&fd).ok_or_else(|| Self::bad_fd("read"))? {
            FdEntry::File { buffer, pos } => {
                let data = buffer.borrow();
                let remaining = &data[(*pos).min(data.len())..];
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                *pos += n;
                Ok(n)
            }
            FdEntry::PipeRead(queue) => {
                let mut queue = queue.borrow_mut();
                let n = queue.len().min(buf.len());
                for slot in buf.iter_mut().take(n) {
                    *slot = queue.pop_front().unwrap();
                }
                Ok(n)
            }
            FdEntry::PipeWrite(_) => Err(Self::bad_fd("read")),
        }
    }

    fn write(&mut self, fd: RawFd, buf: &[u8]) -> Result<usize> {
        match self.fds.get_mut(&fd).ok_or_else(|| Self::bad_fd("write"))? {
            FdEntry::File { buffer, pos } => {
                let mut data = buffer.borrow_mut();
                if *pos > data.len() {
                    data.resize(*pos, 0);
                }
                let end = *pos + buf.len();
                if end > data.len() {
                    data.resize(end, 0);
                }
                data[*pos..end].copy_from_slice(buf);
                *pos = end;
                Ok(buf.len())
            }
            FdEntry::PipeWrite(queue) => {
                queue.borrow_mut().extend(buf.iter().copied());
                Ok(buf.len())
            }
            FdEntry::PipeRead(_) => Err(Self::bad_fd("write")),
        }
    }

    fn exit(&mut self, _status: i32) -> ! {
        panic!("VirtualSystem::exit called outside a real process");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_seeded_file_content() {
        let mut sys = VirtualSystem::new().with_file("/greeting", "hi");
        let fd = sys.open(Path::new("/greeting"), OpenMode::Read).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(sys.read(fd, &mut buf).unwrap(), 2);
        assert_eq!(&buf, b"hi");
    }

    #[test]
    fn write_create_truncate_replaces_existing_content() {
        let mut sys = VirtualSystem::new().with_file("/out", "stale");
        let fd = sys.open(Path::new("/out"), OpenMode::WriteCreateTruncate).unwrap();
        sys.write(fd, b"fresh").unwrap();
        assert_eq!(sys.fd_contents(fd), b"fresh");
    }

    #[test]
    fn append_mode_starts_past_existing_content() {
        let mut sys = VirtualSystem::new().with_file("/log", "a");
        let fd = sys.open(Path::new("/log"), OpenMode::WriteCreateAppend).unwrap();
        sys.write(fd, b"b").unwrap();
        assert_eq!(sys.fd_contents(fd), b"ab");
    }

    #[test]
    fn dup2_onto_an_existing_fd_overwrites_it() {
        let mut sys = VirtualSystem::new();
        sys.set_fd(1, Vec::new());
        let (r, w) = sys.pipe().unwrap();
        sys.dup2(w, 1).unwrap();
        sys.write(1, b"piped").unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(sys.read(r, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"piped");
    }

    #[test]
    fn fcntl_dupfd_parks_at_or_above_the_requested_minimum() {
        let mut sys = VirtualSystem::new();
        sys.set_fd(1, Vec::new());
        let parked = sys.fcntl_dupfd(1, 100).unwrap();
        assert!(parked >= 100);
    }
}
