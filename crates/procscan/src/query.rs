//! Enumeration and lookup entry points.
//!
//! Both functions hand the request straight to the platform backend selected
//! at build time and return its answer unchanged: no filtering, sorting,
//! merging or caching happens here.

use procscan_common::PsResult;
use tracing::debug;

use crate::platform;
use crate::process::Process;

/// Return every process in the process table.
///
/// The result is a point-in-time snapshot; on platforms without an atomic
/// view of the process table it may include processes that exited while the
/// table was being read. With `full_info` the backend also resolves the
/// expensive fields (owner, command line), leaving any it can't resolve for a
/// given process empty rather than failing the whole call.
///
/// An `Err` means the process table itself could not be read; a partial list
/// is never returned as success.
pub fn list_processes(full_info: bool) -> PsResult<Vec<Process>> {
    debug!(full_info, "listing processes");
    let processes = platform::list(full_info)?;
    debug!(count = processes.len(), "process snapshot taken");
    Ok(processes)
}

/// Look up a single process by pid.
///
/// * `Ok(Some(process))` - the process exists
/// * `Ok(None)` - no such process (never existed or already exited)
/// * `Err(_)` - the query itself failed, e.g. permission was denied
pub fn find_process(pid: u32, full_info: bool) -> PsResult<Option<Process>> {
    debug!(pid, full_info, "looking up process");
    platform::find(pid, full_info)
}
