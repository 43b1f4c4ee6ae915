//! macOS backend: libproc for the process list and per-process BSD info,
//! sysctl for the Rosetta flag and argument vector.
//!
//! - `proc_listallpids`: pids
//! - `proc_pidinfo(PROC_PIDTBSDINFO)`: ppid, name, uid, LP64 flag
//! - `sysctl(KERN_PROC_PID)`: `P_TRANSLATED` (x86_64 under Rosetta)
//! - `sysctl(KERN_PROCARGS2)`: argv (full info only)

use std::ffi::CStr;
use std::io;
use std::mem;

use procscan_common::{Architecture, PsError, PsResult};
use tracing::{debug, trace};

use super::unix::OwnerNames;
use crate::process::Process;

/// Process is running translated by Rosetta (`<sys/proc.h>`).
const P_TRANSLATED: i32 = 0x0002_0000;

/// `pbi_flags`: process uses a 64-bit address space.
const PROC_FLAG_LP64: u32 = 0x10;

pub(crate) fn list(full_info: bool) -> PsResult<Vec<Process>> {
    let pids = list_pids()?;
    let mut owners = OwnerNames::default();
    let mut processes = Vec::with_capacity(pids.len());

    for pid in pids {
        match read_process(pid, full_info, &mut owners) {
            Ok(process) => processes.push(process),
            Err(e) if is_gone(&e) => trace!(pid, "process exited during scan"),
            Err(e) => {
                debug!(pid, error = %e, "process details unreadable");
                processes.push(Process::new(pid as u32));
            }
        }
    }

    Ok(processes)
}

pub(crate) fn find(pid: u32, full_info: bool) -> PsResult<Option<Process>> {
    let Ok(pid) = i32::try_from(pid) else {
        return Ok(None);
    };
    let mut owners = OwnerNames::default();
    match read_process(pid, full_info, &mut owners) {
        Ok(process) => Ok(Some(process)),
        Err(e) if is_gone(&e) => Ok(None),
        Err(e) => Err(PsError::query_failed(
            format!("proc_pidinfo({pid})"),
            e.to_string(),
        )),
    }
}

fn is_gone(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::ESRCH)
}

fn list_pids() -> PsResult<Vec<i32>> {
    let mut capacity = 4096usize;

    loop {
        let mut buffer: Vec<i32> = vec![0; capacity];
        let ret = unsafe {
            libc::proc_listallpids(
                buffer.as_mut_ptr() as *mut libc::c_void,
                (buffer.len() * mem::size_of::<i32>()) as libc::c_int,
            )
        };

        if ret <= 0 {
            return Err(PsError::query_failed(
                "proc_listallpids",
                io::Error::last_os_error().to_string(),
            ));
        }

        // proc_listallpids returns a pid count
        let count = ret as usize;
        if count >= buffer.len() {
            // Buffer might be too small, double it
            capacity *= 2;
            continue;
        }

        buffer.truncate(count);
        return Ok(buffer);
    }
}

fn read_process(pid: i32, full_info: bool, owners: &mut OwnerNames) -> io::Result<Process> {
    let info = bsd_info(pid)?;

    let mut process = Process::new(pid as u32)
        .with_ppid(info.pbi_ppid)
        .with_executable(process_name(&info))
        .with_architecture(architecture(pid, &info));

    if full_info {
        process = process
            .with_owner(owners.resolve(info.pbi_uid))
            .with_cmd_line(read_cmd_line(pid));
    }

    Ok(process)
}

fn bsd_info(pid: i32) -> io::Result<libc::proc_bsdinfo> {
    let mut info: libc::proc_bsdinfo = unsafe { mem::zeroed() };
    let size = mem::size_of::<libc::proc_bsdinfo>() as libc::c_int;

    let ret = unsafe {
        libc::proc_pidinfo(
            pid,
            libc::PROC_PIDTBSDINFO,
            0,
            &mut info as *mut _ as *mut libc::c_void,
            size,
        )
    };

    if ret <= 0 {
        return Err(io::Error::last_os_error());
    }
    if ret < size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short proc_bsdinfo for pid {pid}"),
        ));
    }

    Ok(info)
}

/// `pbi_name` holds the longer name when set; `pbi_comm` is capped at
/// MAXCOMLEN characters.
fn process_name(info: &libc::proc_bsdinfo) -> String {
    let name = c_chars_to_string(&info.pbi_name);
    if name.is_empty() {
        c_chars_to_string(&info.pbi_comm)
    } else {
        name
    }
}

fn c_chars_to_string(chars: &[libc::c_char]) -> String {
    let bytes: &[u8] =
        unsafe { std::slice::from_raw_parts(chars.as_ptr() as *const u8, chars.len()) };
    match CStr::from_bytes_until_nul(bytes) {
        Ok(cstr) => cstr.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn architecture(pid: i32, info: &libc::proc_bsdinfo) -> Option<Architecture> {
    if info.pbi_flags & PROC_FLAG_LP64 == 0 {
        return Some(Architecture::X86);
    }

    match is_translated(pid) {
        Some(true) => Some(Architecture::X86_64),
        Some(false) => Some(host_architecture()),
        None => None,
    }
}

/// Architecture of the host CPU, independent of how this binary was built.
fn host_architecture() -> Architecture {
    // hw.optional.arm64 only exists on Apple silicon
    let mut value: libc::c_int = 0;
    let mut size = mem::size_of::<libc::c_int>();
    let ret = unsafe {
        libc::sysctlbyname(
            c"hw.optional.arm64".as_ptr(),
            &mut value as *mut _ as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };

    if ret == 0 && value == 1 {
        Architecture::Arm64
    } else {
        Architecture::X86_64
    }
}

fn is_translated(pid: i32) -> Option<bool> {
    let mut mib = [libc::CTL_KERN, libc::KERN_PROC, libc::KERN_PROC_PID, pid];
    let mut kinfo: libc::kinfo_proc = unsafe { mem::zeroed() };
    let mut size = mem::size_of::<libc::kinfo_proc>();

    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            &mut kinfo as *mut _ as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };

    if ret != 0 || size == 0 {
        trace!(pid, "kinfo_proc unavailable");
        return None;
    }

    Some(kinfo.kp_proc.p_flag & P_TRANSLATED != 0)
}

fn read_cmd_line(pid: i32) -> Vec<String> {
    match procargs(pid) {
        Ok(buffer) => parse_procargs2(&buffer),
        Err(e) => {
            debug!(pid, error = %e, "KERN_PROCARGS2 unavailable");
            Vec::new()
        }
    }
}

fn procargs(pid: i32) -> io::Result<Vec<u8>> {
    let mut arg_max: libc::c_int = 0;
    let mut size = mem::size_of::<libc::c_int>();
    let mut mib = [libc::CTL_KERN, libc::KERN_ARGMAX];

    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            &mut arg_max as *mut _ as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    let mut buffer = vec![0u8; arg_max as usize];
    let mut size = buffer.len();
    let mut mib = [libc::CTL_KERN, libc::KERN_PROCARGS2, pid];

    let ret = unsafe {
        libc::sysctl(
            mib.as_mut_ptr(),
            mib.len() as libc::c_uint,
            buffer.as_mut_ptr() as *mut libc::c_void,
            &mut size,
            std::ptr::null_mut(),
            0,
        )
    };
    if ret != 0 {
        return Err(io::Error::last_os_error());
    }

    buffer.truncate(size);
    Ok(buffer)
}

/// Parse a KERN_PROCARGS2 buffer.
///
/// Layout: `argc: i32`, the executable path, NUL padding, then `argc`
/// NUL-terminated arguments followed by the environment.
pub(crate) fn parse_procargs2(buffer: &[u8]) -> Vec<String> {
    let Some((argc, rest)) = buffer.split_first_chunk::<4>() else {
        return Vec::new();
    };
    let argc = i32::from_ne_bytes(*argc).max(0) as usize;

    // Skip the executable path and the padding after it
    let Some(path_end) = rest.iter().position(|&b| b == 0) else {
        return Vec::new();
    };
    let rest = &rest[path_end..];
    let Some(args_start) = rest.iter().position(|&b| b != 0) else {
        return Vec::new();
    };

    rest[args_start..]
        .split(|&b| b == 0)
        .take(argc)
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}
