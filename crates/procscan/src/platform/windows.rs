//! Windows backend: ToolHelp snapshot for the process table.
//!
//! - `CreateToolhelp32Snapshot` + `Process32*W`: pid, ppid, image name
//! - `OpenProcessToken` + `LookupAccountSidW`: `DOMAIN\user` (full info)
//! - `GetProcessInformation(ProcessMachineTypeInfo)`, falling back to
//!   `IsWow64Process2`: architecture (full info)
//!
//! Owner and architecture need a process handle each, so they are only
//! resolved with full info. The command line lives in the target's PEB and
//! is not read.

use std::ffi::c_void;
use std::mem;

use procscan_common::{Architecture, PsError, PsResult};
use tracing::{debug, trace};
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Security::{
    GetTokenInformation, LookupAccountSidW, TokenUser, SID_NAME_USE, TOKEN_QUERY, TOKEN_USER,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::SystemInformation::{
    IMAGE_FILE_MACHINE, IMAGE_FILE_MACHINE_AMD64, IMAGE_FILE_MACHINE_ARM,
    IMAGE_FILE_MACHINE_ARM64, IMAGE_FILE_MACHINE_ARMNT, IMAGE_FILE_MACHINE_I386,
    IMAGE_FILE_MACHINE_UNKNOWN,
};
use windows::Win32::System::Threading::{
    GetProcessInformation, IsWow64Process2, OpenProcess, OpenProcessToken,
    ProcessMachineTypeInfo, PROCESS_MACHINE_INFORMATION, PROCESS_QUERY_LIMITED_INFORMATION,
};

use crate::process::Process;

/// Closes the wrapped handle on drop.
struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

pub(crate) fn list(full_info: bool) -> PsResult<Vec<Process>> {
    let entries = snapshot_entries()?;
    Ok(entries
        .iter()
        .map(|entry| to_process(entry, full_info))
        .collect())
}

pub(crate) fn find(pid: u32, full_info: bool) -> PsResult<Option<Process>> {
    let entries = snapshot_entries()?;
    Ok(entries
        .iter()
        .find(|entry| entry.th32ProcessID == pid)
        .map(|entry| to_process(entry, full_info)))
}

fn snapshot_entries() -> PsResult<Vec<PROCESSENTRY32W>> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
        .map_err(|e| PsError::query_failed("CreateToolhelp32Snapshot", e.to_string()))?;
    let snapshot = OwnedHandle(snapshot);

    let mut entry = PROCESSENTRY32W {
        dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    unsafe { Process32FirstW(snapshot.0, &mut entry) }
        .map_err(|e| PsError::query_failed("Process32FirstW", e.to_string()))?;

    let mut entries = vec![entry];
    // Process32NextW fails with ERROR_NO_MORE_FILES at the end of the table
    while unsafe { Process32NextW(snapshot.0, &mut entry) }.is_ok() {
        entries.push(entry);
    }

    Ok(entries)
}

fn to_process(entry: &PROCESSENTRY32W, full_info: bool) -> Process {
    let pid = entry.th32ProcessID;
    let process = Process::new(pid)
        .with_ppid(entry.th32ParentProcessID)
        .with_executable(wide_to_string(&entry.szExeFile));

    if !full_info {
        return process;
    }

    // The idle and system processes can't be opened
    let handle = match unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) } {
        Ok(handle) => OwnedHandle(handle),
        Err(e) => {
            debug!(pid, error = %e, "OpenProcess failed, owner and architecture unresolved");
            return process;
        }
    };

    process
        .with_owner(process_owner(pid, handle.0))
        .with_architecture(process_architecture(pid, handle.0))
}

/// Convert a NUL-terminated UTF-16 buffer to a String.
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn process_owner(pid: u32, process: HANDLE) -> Option<String> {
    match token_account(process) {
        Ok(owner) => Some(owner),
        Err(e) => {
            debug!(pid, error = %e, "owner lookup failed");
            None
        }
    }
}

/// Resolve the account a process token belongs to as `DOMAIN\user`.
fn token_account(process: HANDLE) -> windows::core::Result<String> {
    let mut token = HANDLE::default();
    unsafe { OpenProcessToken(process, TOKEN_QUERY, &mut token) }?;
    let token = OwnedHandle(token);

    // First call only reports the required size
    let mut len = 0u32;
    let _ = unsafe { GetTokenInformation(token.0, TokenUser, None, 0, &mut len) };

    // u64 storage keeps TOKEN_USER suitably aligned
    let mut buffer = vec![0u64; (len as usize).div_ceil(mem::size_of::<u64>())];
    unsafe {
        GetTokenInformation(
            token.0,
            TokenUser,
            Some(buffer.as_mut_ptr() as *mut c_void),
            len,
            &mut len,
        )
    }?;
    let user = unsafe { &*(buffer.as_ptr() as *const TOKEN_USER) };

    let mut name = [0u16; 256];
    let mut name_len = name.len() as u32;
    let mut domain = [0u16; 256];
    let mut domain_len = domain.len() as u32;
    let mut sid_use = SID_NAME_USE::default();

    unsafe {
        LookupAccountSidW(
            PCWSTR::null(),
            user.User.Sid,
            PWSTR(name.as_mut_ptr()),
            &mut name_len,
            PWSTR(domain.as_mut_ptr()),
            &mut domain_len,
            &mut sid_use,
        )
    }?;

    Ok(format_account(
        &wide_to_string(&domain[..domain_len as usize]),
        &wide_to_string(&name[..name_len as usize]),
    ))
}

pub(crate) fn format_account(domain: &str, name: &str) -> String {
    if domain.is_empty() {
        name.to_string()
    } else {
        format!("{domain}\\{name}")
    }
}

fn process_architecture(pid: u32, process: HANDLE) -> Option<Architecture> {
    // Windows 11 and later name the emulated machine, x64 on ARM64 included
    match process_machine_info(process) {
        Ok(machine) => return machine_architecture(machine),
        Err(e) => trace!(pid, error = %e, "ProcessMachineTypeInfo unavailable"),
    }

    let mut process_machine = IMAGE_FILE_MACHINE_UNKNOWN;
    let mut native_machine = IMAGE_FILE_MACHINE_UNKNOWN;

    let result = unsafe {
        IsWow64Process2(
            process,
            &mut process_machine,
            Some(&mut native_machine as *mut IMAGE_FILE_MACHINE),
        )
    };
    if let Err(e) = result {
        trace!(pid, error = %e, "IsWow64Process2 failed");
        return None;
    }

    // UNKNOWN means the process is not running under WOW64. Releases without
    // ProcessMachineTypeInfo can't emulate x64 on ARM64, so it is native.
    let machine = if process_machine == IMAGE_FILE_MACHINE_UNKNOWN {
        native_machine
    } else {
        process_machine
    };
    machine_architecture(machine)
}

fn process_machine_info(process: HANDLE) -> windows::core::Result<IMAGE_FILE_MACHINE> {
    let mut info = PROCESS_MACHINE_INFORMATION::default();
    unsafe {
        GetProcessInformation(
            process,
            ProcessMachineTypeInfo,
            &mut info as *mut PROCESS_MACHINE_INFORMATION as *mut c_void,
            mem::size_of::<PROCESS_MACHINE_INFORMATION>() as u32,
        )
    }?;
    Ok(info.ProcessMachine)
}

pub(crate) fn machine_architecture(machine: IMAGE_FILE_MACHINE) -> Option<Architecture> {
    match machine {
        IMAGE_FILE_MACHINE_I386 => Some(Architecture::X86),
        IMAGE_FILE_MACHINE_AMD64 => Some(Architecture::X86_64),
        IMAGE_FILE_MACHINE_ARM | IMAGE_FILE_MACHINE_ARMNT => Some(Architecture::Arm),
        IMAGE_FILE_MACHINE_ARM64 => Some(Architecture::Arm64),
        _ => None,
    }
}
