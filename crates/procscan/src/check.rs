//! Process existence checking.

use procscan_common::{PsError, PsResult};

use crate::validation::validate_pid;

/// Check if a process with the given PID exists.
///
/// This is a cheaper check than [`find_process`](crate::find_process) and
/// agrees with it on what counts as a process. On Linux it opens a pidfd,
/// which thread ids can't have; kernels without pidfds fall back to
/// `kill(pid, 0)` plus a `Tgid` check. Other Unixes use `kill(pid, 0)`,
/// which sends no signal but reports whether the process exists. On Windows,
/// it uses `OpenProcess`.
///
/// # Returns
///
/// * `Ok(true)` - Process exists (possibly owned by someone else)
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The pid is invalid or the check itself failed
///
/// # Examples
///
/// ```rust,no_run
/// use procscan::process_exists;
///
/// if process_exists(1234).unwrap() {
///     println!("Process 1234 is running");
/// }
/// ```
pub fn process_exists(pid: u32) -> PsResult<bool> {
    validate_pid(pid)?;

    #[cfg(target_os = "linux")]
    {
        process_exists_linux(pid)
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        process_exists_unix(pid)
    }

    #[cfg(windows)]
    {
        process_exists_windows(pid)
    }
}

#[cfg(target_os = "linux")]
fn process_exists_linux(pid: u32) -> PsResult<bool> {
    use crate::platform::{linux, pidfd};
    use nix::errno::Errno;

    match pidfd::PidFd::open(pid) {
        Ok(_) => Ok(true),
        // EINVAL: a thread id, which find_process doesn't report either
        Err(Errno::ESRCH | Errno::EINVAL) => Ok(false),
        Err(e) if pidfd::unsupported(e) => {
            Ok(process_exists_unix(pid)? && !linux::is_thread_id(pid))
        }
        Err(e) => Err(PsError::query_failed(format!("pidfd_open({pid})"), e.to_string())),
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: u32) -> PsResult<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        // Exists, but belongs to someone we may not signal
        Err(Errno::EPERM) => Ok(true),
        Err(e) => Err(PsError::query_failed(format!("kill({pid}, 0)"), e.to_string())),
    }
}

#[cfg(windows)]
fn process_exists_windows(pid: u32) -> PsResult<bool> {
    use windows::Win32::Foundation::{CloseHandle, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    match unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) } {
        Ok(handle) => {
            unsafe {
                let _ = CloseHandle(handle);
            }
            Ok(true)
        }
        // OpenProcess reports an unknown pid as an invalid parameter
        Err(e) if e.code() == ERROR_INVALID_PARAMETER.to_hresult() => Ok(false),
        // Protected processes exist but refuse even limited queries
        Err(e) if e.code() == ERROR_ACCESS_DENIED.to_hresult() => Ok(true),
        Err(e) => Err(PsError::query_failed(format!("OpenProcess({pid})"), e.to_string())),
    }
}
