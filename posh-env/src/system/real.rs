//! [`System`] backed by actual syscalls, via `nix`.

use super::{ExitStatus, FileStat, ForkResult, OpenMode, RawFd, Result, System, SystemError};
use nix::fcntl::{self, FcntlArg, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid as nix_waitpid, WaitStatus};
use nix::unistd::Pid;
use std::ffi::CString;
use std::os::fd::{BorrowedFd, IntoRawFd};
use std::path::Path;

fn os_err(op: &'static str, e: nix::Error) -> SystemError {
    SystemError::Os(op, std::io::Error::from_raw_os_error(e as i32))
}

unsafe fn borrow(fd: RawFd) -> BorrowedFd<'static> {
    unsafe { BorrowedFd::borrow_raw(fd) }
}

#[derive(Debug, Default)]
pub struct RealSystem;

impl System for RealSystem {
    fn open(&mut self, path: &Path, mode: OpenMode) -> Result<RawFd> {
        let (flags, file_mode) = match mode {
            OpenMode::Read => (OFlag::O_RDONLY, Mode::empty()),
            OpenMode::WriteCreateTruncate => (
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
                Mode::from_bits_truncate(0o644),
            ),
            OpenMode::WriteCreateAppend => (
                OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
                Mode::from_bits_truncate(0o644),
            ),
        };
        fcntl::open(path, flags, file_mode)
            .map(IntoRawFd::into_raw_fd)
            .map_err(|e| os_err("open", e))
    }

    fn close(&mut self, fd: RawFd) -> Result<()> {
        nix::unistd::close(fd).map_err(|e| os_err("close", e))
    }

    fn dup(&mut self, fd: RawFd) -> Result<RawFd> {
        let borrowed = unsafe { borrow(fd) };
        nix::unistd::dup(borrowed)
            .map(IntoRawFd::into_raw_fd)
            .map_err(|e| os_err("dup", e))
    }

    fn dup2(&mut self, src: RawFd, dst: RawFd) -> Result<RawFd> {
        let borrowed = unsafe { borrow(src) };
        unsafe { nix::unistd::dup2_raw(borrowed, dst) }
            .map(IntoRawFd::into_raw_fd)
            .map_err(|e| os_err("dup2", e))
    }

    fn fcntl_dupfd(&mut self, fd: RawFd, min_fd: RawFd) -> Result<RawFd> {
        let borrowed = unsafe { borrow(fd) };
        fcntl::fcntl(borrowed, FcntlArg::F_DUPFD(min_fd)).map_err(|e| os_err("fcntl(F_DUPFD)", e))
    }

    fn pipe(&mut self) -> Result<(RawFd, RawFd)> {
        let (reader, writer) = nix::unistd::pipe().map_err(|e| os_err("pipe", e))?;
        Ok((reader.into_raw_fd(), writer.into_raw_fd()))
    }

    fn fork(&mut self) -> Result<ForkResult> {
        match unsafe { nix::unistd::fork() }.map_err(|e| os_err("fork", e))? {
            nix::unistd::ForkResult::Parent { child } => Ok(ForkResult::Parent(child.as_raw())),
            nix::unistd::ForkResult::Child => Ok(ForkResult::Child),
        }
    }

    fn waitpid(&mut self, pid: i32) -> Result<ExitStatus> {
        match nix_waitpid(Some(Pid::from_raw(pid)), None).map_err(|e| os_err("waitpid", e))? {
            WaitStatus::Exited(_, code) => Ok(ExitStatus(code)),
            WaitStatus::Signaled(_, signal, _) => Ok(ExitStatus(128 + signal as i32)),
            _ => Ok(ExitStatus(0)),
        }
    }

    fn execvp(&mut self, path: &str, args: &[String]) -> SystemError {
        let Ok(path) = CString::new(path) else {
            return SystemError::Os("execvp", std::io::Error::from_raw_os_error(libc::EINVAL));
        };
        let Ok(args) = args
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
        else {
            return SystemError::Os("execvp", std::io::Error::from_raw_os_error(libc::EINVAL));
        };
        let err = nix::unistd::execvp(&path, &args).unwrap_err();
        os_err("execvp", err)
    }

    fn chdir(&mut self, path: &Path) -> Result<()> {
        nix::unistd::chdir(path).map_err(|e| os_err("chdir", e))
    }

    fn fstat(&mut self, fd: RawFd) -> Result<FileStat> {
        let borrowed = unsafe { borrow(fd) };
        let stat = nix::sys::stat::fstat(borrowed).map_err(|e| os_err("fstat", e))?;
        let file_type = stat.st_mode & libc::S_IFMT as u32;
        Ok(FileStat {
            is_directory: file_type == libc::S_IFDIR as u32,
            is_regular_file: file_type == libc::S_IFREG as u32,
        })
    }

    fn read_dir(&mut self, path: &Path) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(path)
            .map_err(|e| SystemError::Os("readdir", e))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        Ok(entries)
    }

    fn read(&mut self, fd: RawFd, buf: &mut [u8]) -> Result<usize> {
        let borrowed = unsafe { borrow(fd) };
        nix::unistd::read(&borrowed, buf).map_err(|e| os_err("read", e))
    }

    fn write(&mut self, fd: RawFd, buf: &[u8]) -> Result<usize> {
        let borrowed = unsafe { borrow(fd) };
        nix::unistd::write(borrowed, buf).map_err(|e| os_err("write", e))
    }

    fn exit(&mut self, status: i32) -> ! {
        std::process::exit(status)
    }
}
