//! Process file descriptors (Linux 5.3+).
//!
//! A pidfd refers to one thread-group leader. Opening one for a thread id
//! fails with `EINVAL`, and a signal sent through it can't reach a process
//! that later reuses the pid.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;

use nix::errno::Errno;
use nix::sys::signal::Signal;

#[derive(Debug)]
pub(crate) struct PidFd(OwnedFd);

impl PidFd {
    /// `ESRCH` for no such process, `EINVAL` for a thread id, `ENOSYS` (or
    /// `EPERM` under a seccomp filter) when the kernel offers no pidfds.
    pub(crate) fn open(pid: u32) -> Result<Self, Errno> {
        let pid = libc::pid_t::try_from(pid).map_err(|_| Errno::EINVAL)?;
        let ret = unsafe { libc::syscall(libc::SYS_pidfd_open, pid, 0 as libc::c_uint) };
        if ret < 0 {
            return Err(Errno::last());
        }
        Ok(Self(unsafe { OwnedFd::from_raw_fd(ret as RawFd) }))
    }

    pub(crate) fn send_signal(&self, signal: Signal) -> Result<(), Errno> {
        let ret = unsafe {
            libc::syscall(
                libc::SYS_pidfd_send_signal,
                self.0.as_raw_fd(),
                signal as libc::c_int,
                ptr::null::<libc::siginfo_t>(),
                0 as libc::c_uint,
            )
        };
        if ret < 0 {
            return Err(Errno::last());
        }
        Ok(())
    }
}

/// True when pidfds can't be used here and callers must fall back to plain
/// pids.
pub(crate) fn unsupported(err: Errno) -> bool {
    matches!(err, Errno::ENOSYS | Errno::EPERM)
}
