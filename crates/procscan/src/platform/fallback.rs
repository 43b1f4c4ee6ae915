//! Generic backend for targets without a dedicated implementation
//! (FreeBSD, NetBSD, ...), built on sysinfo.
//!
//! sysinfo reports no errors for an unreadable process table, so `list`
//! never fails here, and it exposes no architecture.

use procscan_common::PsResult;
use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind, Users};

use crate::process::Process;

pub(crate) fn list(full_info: bool) -> PsResult<Vec<Process>> {
    let mut system = System::new();
    system.refresh_processes_specifics(refresh_kind(full_info));

    let users = full_info.then(Users::new_with_refreshed_list);
    Ok(system
        .processes()
        .values()
        .map(|process| to_process(process, users.as_ref()))
        .collect())
}

pub(crate) fn find(pid: u32, full_info: bool) -> PsResult<Option<Process>> {
    let mut system = System::new();
    let sysinfo_pid = Pid::from_u32(pid);
    if !system.refresh_process_specifics(sysinfo_pid, refresh_kind(full_info)) {
        return Ok(None);
    }

    let users = full_info.then(Users::new_with_refreshed_list);
    Ok(system
        .process(sysinfo_pid)
        .map(|process| to_process(process, users.as_ref())))
}

fn refresh_kind(full_info: bool) -> ProcessRefreshKind {
    let kind = ProcessRefreshKind::new();
    if full_info {
        kind.with_user(UpdateKind::Always)
            .with_cmd(UpdateKind::Always)
    } else {
        kind
    }
}

fn to_process(process: &sysinfo::Process, users: Option<&Users>) -> Process {
    let owner = users.and_then(|users| {
        process
            .user_id()
            .and_then(|uid| users.get_user_by_id(uid))
            .map(|user| user.name().to_string())
    });

    Process::new(process.pid().as_u32())
        .with_ppid(process.parent().map(|p| p.as_u32()).unwrap_or(0))
        .with_executable(process.name())
        .with_owner(owner)
        .with_cmd_line(process.cmd().to_vec())
}
