//! Pid validation for operations that act on a process.

use procscan_common::{PsError, PsResult};

/// Validate that `pid` names exactly one process on this platform.
///
/// On Unix, `kill(2)` treats 0 as "every process in my group" and negative
/// values as process groups, so pid 0 and anything that doesn't fit in a
/// `pid_t` are rejected. On Windows, pid 0 is the System Idle Process.
pub fn validate_pid(pid: u32) -> PsResult<()> {
    if pid == 0 {
        return Err(PsError::invalid_pid(
            pid,
            "pid 0 does not name a single process",
        ));
    }

    #[cfg(unix)]
    if i32::try_from(pid).is_err() {
        return Err(PsError::invalid_pid(
            pid,
            "pid does not fit in pid_t and would address a process group",
        ));
    }

    Ok(())
}
