//! # procscan
//!
//! Platform-agnostic access to the operating system's process table.
//!
//! This crate provides one contract over every supported OS:
//! - Listing all running processes ([`list_processes`])
//! - Looking up a process by pid ([`find_process`])
//! - Terminating a process by pid ([`kill`])
//! - Checking whether a pid is alive ([`process_exists`])
//!
//! One backend is compiled per target: `/proc` on Linux, libproc/sysctl on
//! macOS, ToolHelp on Windows and sysinfo elsewhere. All calls are
//! synchronous, re-query live OS state and keep no shared state.
//!
//! ```rust,no_run
//! use procscan::{find_process, list_processes};
//!
//! for process in list_processes(false)? {
//!     println!("{} {}", process.pid(), process.executable());
//! }
//!
//! match find_process(1, true)? {
//!     Some(init) => println!("pid 1 is {}", init.executable()),
//!     None => println!("pid 1 is not running"),
//! }
//! # Ok::<(), procscan::PsError>(())
//! ```

pub mod check;
pub mod process;
pub mod query;
pub mod terminate;
pub mod validation;

mod platform;

// Re-export main types
pub use check::process_exists;
pub use process::Process;
pub use query::{find_process, list_processes};
pub use terminate::kill;
pub use validation::validate_pid;

pub use procscan_common::{Architecture, PsError, PsResult};
