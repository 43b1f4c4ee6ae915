//! Platform backends.
//!
//! Exactly one is compiled per target and each exports
//! `list(full_info) -> PsResult<Vec<Process>>` and
//! `find(pid, full_info) -> PsResult<Option<Process>>`.

#[cfg(any(target_os = "linux", target_os = "macos"))]
mod unix;

#[cfg(target_os = "linux")]
pub(crate) mod linux;
#[cfg(target_os = "linux")]
pub(crate) mod pidfd;
#[cfg(target_os = "linux")]
pub(crate) use linux::{find, list};

#[cfg(target_os = "macos")]
pub(crate) mod macos;
#[cfg(target_os = "macos")]
pub(crate) use macos::{find, list};

#[cfg(windows)]
pub(crate) mod windows;
#[cfg(windows)]
pub(crate) use self::windows::{find, list};

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod fallback;
#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
pub(crate) use fallback::{find, list};
