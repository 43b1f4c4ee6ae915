//! Process termination.
//!
//! Termination is a request, not a confirmation: [`kill`] returns as soon as
//! the OS has accepted it. Poll [`find_process`](crate::find_process) (and,
//! for your own children, reap them) if you need to observe the exit.

use procscan_common::{PsError, PsResult};
use tracing::info;

use crate::validation::validate_pid;

#[cfg(target_os = "linux")]
const THREAD_ID: &str = "pid names a thread, not a process";

/// Resolve `pid` to a live process and forcefully terminate it
/// (SIGKILL on Unix, TerminateProcess on Windows).
///
/// On Linux the target is resolved to a pidfd first, so a thread id (which
/// [`find_process`](crate::find_process) doesn't report) is never signalled
/// and the signal can't reach a process that reused the pid.
///
/// Fails with [`PsError::ResolutionFailed`] when no such process can be
/// resolved and [`PsError::TerminationRefused`] when the OS rejects the
/// request; callers that don't care which may use
/// [`PsError::is_termination_failure`].
pub fn kill(pid: u32) -> PsResult<()> {
    validate_pid(pid)?;
    info!(pid, "requesting process termination");

    #[cfg(target_os = "linux")]
    {
        kill_linux(pid)
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        kill_unix(pid)
    }

    #[cfg(windows)]
    {
        kill_windows(pid)
    }
}

#[cfg(target_os = "linux")]
fn kill_linux(pid: u32) -> PsResult<()> {
    use crate::platform::{linux, pidfd};
    use nix::errno::Errno;
    use nix::sys::signal::Signal;

    let target = match pidfd::PidFd::open(pid) {
        Ok(target) => target,
        Err(Errno::ESRCH) => return Err(PsError::resolution_failed(pid, "no such process")),
        Err(Errno::EINVAL) => return Err(PsError::resolution_failed(pid, THREAD_ID)),
        Err(e) if pidfd::unsupported(e) => {
            if linux::is_thread_id(pid) {
                return Err(PsError::resolution_failed(pid, THREAD_ID));
            }
            return kill_unix(pid);
        }
        Err(e) => return Err(PsError::resolution_failed(pid, e.to_string())),
    };

    target.send_signal(Signal::SIGKILL).map_err(|e| match e {
        // Exited and reaped after the pidfd was opened
        Errno::ESRCH => PsError::resolution_failed(pid, e.to_string()),
        _ => PsError::termination_refused(pid, e.to_string()),
    })
}

#[cfg(unix)]
fn kill_unix(pid: u32) -> PsResult<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let exists = crate::check::process_exists(pid)
        .map_err(|e| PsError::resolution_failed(pid, e.to_string()))?;
    if !exists {
        return Err(PsError::resolution_failed(pid, "no such process"));
    }

    signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL).map_err(|e| match e {
        // Exited between the existence check and the signal
        Errno::ESRCH => PsError::resolution_failed(pid, e.to_string()),
        _ => PsError::termination_refused(pid, e.to_string()),
    })
}

#[cfg(windows)]
fn kill_windows(pid: u32) -> PsResult<()> {
    use windows::Win32::Foundation::CloseHandle;
    use windows::Win32::System::Threading::{OpenProcess, TerminateProcess, PROCESS_TERMINATE};

    unsafe {
        let handle = match OpenProcess(PROCESS_TERMINATE, false, pid) {
            Ok(h) if !h.is_invalid() => h,
            Ok(_) => {
                return Err(PsError::resolution_failed(pid, "OpenProcess returned an invalid handle"));
            }
            Err(e) => return Err(PsError::resolution_failed(pid, e.to_string())),
        };

        let result = TerminateProcess(handle, 1);
        let _ = CloseHandle(handle);

        result.map_err(|e| PsError::termination_refused(pid, format!("TerminateProcess failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kill_pid_zero_rejected() {
        assert!(matches!(kill(0), Err(PsError::InvalidPid { .. })));
    }

    #[test]
    fn test_kill_nonexistent_process() {
        let err = kill(0x7FFF_FFF0).unwrap_err();
        assert!(err.is_termination_failure());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_kill_thread_id_leaves_process_running() {
        let thread = crate::platform::pidfd::testing::ParkedThread::spawn();

        // A signal here would take down this test process
        let err = kill(thread.tid).unwrap_err();
        assert!(matches!(err, PsError::ResolutionFailed { .. }));
        assert!(crate::find_process(thread.tid, false).unwrap().is_none());
        assert!(crate::process_exists(std::process::id()).unwrap());
    }

    #[test]
    #[cfg(unix)]
    fn test_kill_refused_for_init() {
        // Only meaningful (and only safe) without privilege
        if nix::unistd::geteuid().is_root() {
            return;
        }
        let err = kill(1).unwrap_err();
        assert!(matches!(err, PsError::TerminationRefused { .. }));
    }
}
