//! The process entity every backend produces.
//!
//! A [`Process`] is a snapshot: it is built from live OS state during one
//! `list_processes`/`find_process` call and never updated afterwards. Only
//! `pid` is guaranteed; every other field is best-effort and stays empty when
//! the backend could not resolve it (or was asked not to, see `full_info`).

use procscan_common::Architecture;
use serde::Serialize;

/// Point-in-time descriptor of one operating-system process.
#[derive(Debug, Clone, Serialize)]
pub struct Process {
    pid: u32,
    ppid: u32,
    executable: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    architecture: Option<Architecture>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cmd_line: Vec<String>,
}

impl Process {
    pub(crate) fn new(pid: u32) -> Self {
        Self {
            pid,
            ppid: 0,
            executable: String::new(),
            owner: None,
            architecture: None,
            cmd_line: Vec::new(),
        }
    }

    pub(crate) fn with_ppid(mut self, ppid: u32) -> Self {
        self.ppid = ppid;
        self
    }

    pub(crate) fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Empty names count as unresolved.
    pub(crate) fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner.filter(|name| !name.is_empty());
        self
    }

    pub(crate) fn with_architecture(mut self, architecture: Option<Architecture>) -> Self {
        self.architecture = architecture;
        self
    }

    pub(crate) fn with_cmd_line(mut self, cmd_line: Vec<String>) -> Self {
        self.cmd_line = cmd_line;
        self
    }

    /// Process ID at observation time. Ids are recycled by the OS.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Parent process ID, or 0 when the parent is gone or unknown.
    pub fn ppid(&self) -> u32 {
        self.ppid
    }

    /// Program name (not a filesystem path).
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Account name the process runs under, if it could be resolved.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Instruction set the process was loaded for, if it could be resolved.
    pub fn architecture(&self) -> Option<Architecture> {
        self.architecture
    }

    /// Argument vector, empty unless requested with full info and readable.
    pub fn cmd_line(&self) -> &[String] {
        &self.cmd_line
    }
}
