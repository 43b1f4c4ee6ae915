//! Linux backend: reads the /proc pseudo-filesystem.
//!
//! - `/proc/<pid>/stat`: executable name (comm) and ppid
//! - `/proc/<pid>/status`: Tgid (threads are not processes) and effective uid
//! - `/proc/<pid>/cmdline`: NUL-separated argument vector
//! - `/proc/<pid>/exe`: ELF header, mapped to an architecture
//!
//! Owner and cmdline are only read with full info.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use procscan_common::{Architecture, PsError, PsResult};
use tracing::{debug, trace};

use super::unix::OwnerNames;
use crate::process::Process;

const PROC_ROOT: &str = "/proc";

/// Enough for an ELF64 file header; ELF32 headers are shorter.
const ELF_HEADER_LEN: u64 = 64;

pub(crate) fn list(full_info: bool) -> PsResult<Vec<Process>> {
    list_in(Path::new(PROC_ROOT), full_info)
}

pub(crate) fn find(pid: u32, full_info: bool) -> PsResult<Option<Process>> {
    find_in(Path::new(PROC_ROOT), pid, full_info)
}

pub(crate) fn list_in(root: &Path, full_info: bool) -> PsResult<Vec<Process>> {
    let entries = fs::read_dir(root)
        .map_err(|e| PsError::query_failed(format!("read {}", root.display()), e.to_string()))?;

    let mut owners = OwnerNames::default();
    let mut processes = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| {
            PsError::query_failed(format!("read {}", root.display()), e.to_string())
        })?;

        // Only numeric directories are processes
        let pid: u32 = match entry.file_name().to_string_lossy().parse() {
            Ok(pid) => pid,
            Err(_) => continue,
        };

        match read_process(root, pid, full_info, &mut owners) {
            Ok(Some(process)) => processes.push(process),
            Ok(None) => {}
            Err(e) if is_gone(&e) => trace!(pid, "process exited during scan"),
            // readdir only lists thread-group leaders, so the pid is real even
            // when its details are hidden (hidepid, permissions)
            Err(e) => {
                debug!(pid, error = %e, "process details unreadable");
                processes.push(Process::new(pid));
            }
        }
    }

    Ok(processes)
}

pub(crate) fn find_in(root: &Path, pid: u32, full_info: bool) -> PsResult<Option<Process>> {
    let mut owners = OwnerNames::default();

    match read_process(root, pid, full_info, &mut owners) {
        Ok(process) => Ok(process),
        Err(e) if is_gone(&e) => Ok(None),
        Err(e) => Err(PsError::query_failed(
            format!("read {}/{}", root.display(), pid),
            e.to_string(),
        )),
    }
}

/// Reads one process. `Ok(None)` means the pid names a thread, not a process.
fn read_process(
    root: &Path,
    pid: u32,
    full_info: bool,
    owners: &mut OwnerNames,
) -> io::Result<Option<Process>> {
    let dir = root.join(pid.to_string());

    let stat = fs::read_to_string(dir.join("stat"))?;
    let stat = parse_stat(&stat).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidData, format!("malformed stat for pid {pid}"))
    })?;

    // /proc/<tid> resolves for threads even though readdir hides them
    let status = fs::read_to_string(dir.join("status"))?;
    let status = parse_status(&status);
    if status.tgid.is_some_and(|tgid| tgid != pid) {
        return Ok(None);
    }

    let mut process = Process::new(pid)
        .with_ppid(stat.ppid)
        .with_executable(stat.comm)
        .with_architecture(read_architecture(&dir));

    if full_info {
        let owner = status.euid.and_then(|uid| owners.resolve(uid));
        process = process
            .with_owner(owner)
            .with_cmd_line(read_cmd_line(&dir));
    }

    Ok(Some(process))
}

/// True when the error means the process no longer (or never) existed.
fn is_gone(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ESRCH)
}

/// True when `pid` is a thread id inside another process's thread group.
///
/// Signals sent to such an id act on the whole thread group, so callers
/// that address processes must not treat it as one.
pub(crate) fn is_thread_id(pid: u32) -> bool {
    is_thread_id_in(Path::new(PROC_ROOT), pid)
}

pub(crate) fn is_thread_id_in(root: &Path, pid: u32) -> bool {
    fs::read_to_string(root.join(pid.to_string()).join("status"))
        .map(|status| parse_status(&status).tgid.is_some_and(|tgid| tgid != pid))
        .unwrap_or(false)
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct StatFields {
    pub comm: String,
    pub ppid: u32,
}

/// Parse /proc/<pid>/stat.
///
/// Format: `pid (comm) state ppid ...`. The comm field may itself contain
/// spaces and parentheses, so it spans from the first '(' to the last ')'.
pub(crate) fn parse_stat(content: &str) -> Option<StatFields> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }

    let comm = content[open + 1..close].to_string();
    let mut rest = content[close + 1..].split_whitespace();
    let _state = rest.next()?;
    let ppid = rest.next()?.parse().ok()?;

    Some(StatFields { comm, ppid })
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct StatusFields {
    pub tgid: Option<u32>,
    pub euid: Option<u32>,
}

/// Parse the fields we need from /proc/<pid>/status.
///
/// `Uid:` lists real, effective, saved and filesystem uids; we report the
/// effective one, as ps does.
pub(crate) fn parse_status(content: &str) -> StatusFields {
    let mut fields = StatusFields::default();

    for line in content.lines() {
        if let Some(value) = line.strip_prefix("Tgid:") {
            fields.tgid = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("Uid:") {
            fields.euid = value.split_whitespace().nth(1).and_then(|v| v.parse().ok());
        }
    }

    fields
}

/// Split /proc/<pid>/cmdline into arguments.
pub(crate) fn parse_cmd_line(raw: &[u8]) -> Vec<String> {
    let raw = raw.strip_suffix(&[0]).unwrap_or(raw);
    if raw.is_empty() {
        return Vec::new();
    }

    raw.split(|&b| b == 0)
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect()
}

fn read_cmd_line(dir: &Path) -> Vec<String> {
    match fs::read(dir.join("cmdline")) {
        Ok(raw) => parse_cmd_line(&raw),
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "cmdline unavailable");
            Vec::new()
        }
    }
}

fn read_architecture(dir: &Path) -> Option<Architecture> {
    let mut header = Vec::with_capacity(ELF_HEADER_LEN as usize);
    let read = fs::File::open(dir.join("exe"))
        .and_then(|file| file.take(ELF_HEADER_LEN).read_to_end(&mut header));

    match read {
        Ok(_) => elf_architecture(&header),
        // Kernel threads have no exe; other users' processes need privilege
        Err(e) => {
            trace!(path = %dir.display(), error = %e, "exe unavailable");
            None
        }
    }
}

/// Map an ELF file header to the architecture it was built for.
pub(crate) fn elf_architecture(header: &[u8]) -> Option<Architecture> {
    use object::elf::{self, FileHeader32, FileHeader64};
    use object::read::elf::FileHeader;
    use object::{Endianness, FileKind};

    let (machine, is_64) = match FileKind::parse(header).ok()? {
        FileKind::Elf32 => {
            let ehdr = FileHeader32::<Endianness>::parse(header).ok()?;
            (ehdr.e_machine(ehdr.endian().ok()?), false)
        }
        FileKind::Elf64 => {
            let ehdr = FileHeader64::<Endianness>::parse(header).ok()?;
            (ehdr.e_machine(ehdr.endian().ok()?), true)
        }
        _ => return None,
    };

    match machine {
        elf::EM_386 => Some(Architecture::X86),
        // ELF32 + EM_X86_64 is the x32 ABI, still an x86_64 instruction set
        elf::EM_X86_64 => Some(Architecture::X86_64),
        elf::EM_ARM => Some(Architecture::Arm),
        elf::EM_AARCH64 => Some(Architecture::Arm64),
        elf::EM_RISCV if is_64 => Some(Architecture::RiscV64),
        elf::EM_PPC64 => Some(Architecture::PowerPc64),
        elf::EM_S390 if is_64 => Some(Architecture::S390x),
        elf::EM_MIPS if is_64 => Some(Architecture::Mips64),
        elf::EM_MIPS => Some(Architecture::Mips),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::pidfd::testing::ParkedThread;

    fn elf_header(class: u8, data: u8, machine: u16) -> Vec<u8> {
        let mut header = vec![0u8; 64];
        header[..4].copy_from_slice(b"\x7fELF");
        header[4] = class;
        header[5] = data;
        header[6] = 1; // EV_CURRENT
        let machine = if data == 1 {
            machine.to_le_bytes()
        } else {
            machine.to_be_bytes()
        };
        header[18..20].copy_from_slice(&machine);
        header
    }

    fn write_proc_entry(root: &Path, pid: u32, stat: &str, status: &str, cmdline: &[u8]) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stat"), stat).unwrap();
        fs::write(dir.join("status"), status).unwrap();
        fs::write(dir.join("cmdline"), cmdline).unwrap();
    }

    #[test]
    fn parse_stat_simple() {
        let stat = parse_stat("1234 (bash) S 1000 1234 1234 34816 0").unwrap();
        assert_eq!(stat.comm, "bash");
        assert_eq!(stat.ppid, 1000);
    }

    #[test]
    fn parse_stat_name_with_spaces_and_parens() {
        let stat = parse_stat("77 (tmux: server (1)) S 1 77 77 0 -1").unwrap();
        assert_eq!(stat.comm, "tmux: server (1)");
        assert_eq!(stat.ppid, 1);
    }

    #[test]
    fn parse_stat_malformed() {
        assert!(parse_stat("").is_none());
        assert!(parse_stat("12 bash S 1").is_none());
        assert!(parse_stat("12 (bash) S").is_none());
        assert!(parse_stat("12 (bash) S notanumber").is_none());
    }

    #[test]
    fn parse_status_fields() {
        let status = "Name:\tbash\nTgid:\t1234\nPid:\t1234\nPPid:\t1\nUid:\t1000\t1001\t1000\t1000\n";
        let fields = parse_status(status);
        assert_eq!(fields.tgid, Some(1234));
        assert_eq!(fields.euid, Some(1001));
    }

    #[test]
    fn parse_status_missing_fields() {
        assert_eq!(parse_status("Name:\tkthreadd\n"), StatusFields::default());
    }

    #[test]
    fn parse_cmd_line_args() {
        assert_eq!(
            parse_cmd_line(b"/usr/bin/python3\0-m\0http.server\0"),
            vec!["/usr/bin/python3", "-m", "http.server"]
        );
        assert_eq!(parse_cmd_line(b"prog\0\0last\0"), vec!["prog", "", "last"]);
        assert!(parse_cmd_line(b"").is_empty());
    }

    #[test]
    fn elf_architecture_mapping() {
        assert_eq!(
            elf_architecture(&elf_header(2, 1, 62)),
            Some(Architecture::X86_64)
        );
        assert_eq!(elf_architecture(&elf_header(1, 1, 3)), Some(Architecture::X86));
        assert_eq!(elf_architecture(&elf_header(2, 1, 183)), Some(Architecture::Arm64));
        assert_eq!(elf_architecture(&elf_header(1, 1, 40)), Some(Architecture::Arm));
        assert_eq!(elf_architecture(&elf_header(2, 2, 22)), Some(Architecture::S390x));
        assert_eq!(elf_architecture(&elf_header(2, 1, 8)), Some(Architecture::Mips64));
    }

    #[test]
    fn elf_architecture_rejects_non_elf() {
        assert_eq!(elf_architecture(b"#!/bin/sh\n"), None);
        assert_eq!(elf_architecture(&[]), None);
        // Unknown machine
        assert_eq!(elf_architecture(&elf_header(2, 1, 0xBEEF)), None);
    }

    #[test]
    fn fake_root_listing() {
        let root = tempfile::tempdir().unwrap();
        write_proc_entry(
            root.path(),
            1,
            "1 (init) S 0 1 1 0 -1",
            "Tgid:\t1\nUid:\t0\t0\t0\t0\n",
            b"/sbin/init\0",
        );
        write_proc_entry(
            root.path(),
            42,
            "42 (worker (x)) R 1 42 42 0 -1",
            "Tgid:\t42\nUid:\t1000\t1000\t1000\t1000\n",
            b"worker\0--fast\0",
        );
        // Non-process entries are ignored
        fs::create_dir_all(root.path().join("sys")).unwrap();
        fs::write(root.path().join("uptime"), "1.0 2.0").unwrap();

        let mut processes = list_in(root.path(), false).unwrap();
        processes.sort_by_key(|p| p.pid());

        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].pid(), 1);
        assert_eq!(processes[0].executable(), "init");
        assert_eq!(processes[1].ppid(), 1);
        assert_eq!(processes[1].executable(), "worker (x)");
        // No exe link in the fixture, no cmdline without full info
        assert!(processes[1].architecture().is_none());
        assert!(processes[1].cmd_line().is_empty());
        assert!(processes[1].owner().is_none());
    }

    #[test]
    fn fake_root_full_info_reads_cmd_line() {
        let root = tempfile::tempdir().unwrap();
        write_proc_entry(
            root.path(),
            42,
            "42 (worker) R 1 42 42 0 -1",
            "Tgid:\t42\nUid:\t1000\t1000\t1000\t1000\n",
            b"worker\0--fast\0",
        );

        let process = find_in(root.path(), 42, true).unwrap().unwrap();
        assert_eq!(process.cmd_line(), ["worker", "--fast"]);
        if let Some(owner) = process.owner() {
            assert!(!owner.is_empty());
        }
    }

    #[test]
    fn fake_root_find_missing_is_none() {
        let root = tempfile::tempdir().unwrap();
        assert!(find_in(root.path(), 4242, false).unwrap().is_none());
    }

    #[test]
    fn fake_root_thread_is_not_a_process() {
        let root = tempfile::tempdir().unwrap();
        write_proc_entry(
            root.path(),
            43,
            "43 (worker) S 1 42 42 0 -1",
            "Tgid:\t42\nUid:\t1000\t1000\t1000\t1000\n",
            b"",
        );
        assert!(find_in(root.path(), 43, false).unwrap().is_none());
    }

    #[test]
    fn fake_root_malformed_stat_fails_lookup() {
        let root = tempfile::tempdir().unwrap();
        write_proc_entry(root.path(), 5, "garbage", "Tgid:\t5\n", b"");

        let err = find_in(root.path(), 5, false).unwrap_err();
        assert!(matches!(err, PsError::QueryFailed { .. }));
    }

    #[test]
    fn fake_root_unreadable_entry_keeps_pid() {
        let root = tempfile::tempdir().unwrap();
        write_proc_entry(root.path(), 5, "garbage", "Tgid:\t5\n", b"");
        write_proc_entry(
            root.path(),
            6,
            "6 (worker) S 1 6 6 0 -1",
            "Tgid:\t6\n",
            b"",
        );

        let mut processes = list_in(root.path(), true).unwrap();
        processes.sort_by_key(|p| p.pid());

        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].pid(), 5);
        assert_eq!(processes[0].executable(), "");
        assert!(processes[0].owner().is_none());
        assert_eq!(processes[1].executable(), "worker");
    }

    #[test]
    fn fake_root_vanished_entry_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        // Directory left behind without its files: the process exited
        fs::create_dir_all(root.path().join("9")).unwrap();
        assert!(list_in(root.path(), false).unwrap().is_empty());
    }

    #[test]
    fn thread_id_detection() {
        let root = tempfile::tempdir().unwrap();
        write_proc_entry(root.path(), 42, "42 (app) S 1 42 42 0 -1", "Tgid:\t42\n", b"");
        write_proc_entry(root.path(), 43, "43 (app) S 1 42 42 0 -1", "Tgid:\t42\n", b"");

        assert!(!is_thread_id_in(root.path(), 42));
        assert!(is_thread_id_in(root.path(), 43));
        assert!(!is_thread_id_in(root.path(), 44));
    }

    #[test]
    fn live_thread_id_is_not_a_process() {
        let thread = ParkedThread::spawn();

        assert!(is_thread_id(thread.tid));
        assert!(!is_thread_id(std::process::id()));
        assert!(find(thread.tid, false).unwrap().is_none());
        assert!(list(false).unwrap().iter().all(|p| p.pid() != thread.tid));
    }

    #[test]
    fn missing_root_is_query_failure() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        let err = list_in(&missing, false).unwrap_err();
        assert!(matches!(err, PsError::QueryFailed { .. }));
    }
}
