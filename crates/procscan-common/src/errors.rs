//! Error types for procscan.
//!
//! Every fallible process-table operation returns [`PsResult`]. Note that a
//! process that simply isn't running is *not* an error: lookups model that
//! case as `Ok(None)`, so callers can tell "it's gone" apart from "the query
//! itself failed".
//!
//! ```rust
//! use procscan_common::{PsError, PsResult};
//!
//! fn open_table() -> PsResult<()> {
//!     Err(PsError::query_failed("read /proc", "permission denied"))
//! }
//!
//! assert!(matches!(open_table(), Err(PsError::QueryFailed { .. })));
//! ```

use thiserror::Error;

/// Errors surfaced by process-table queries and termination requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PsError {
    /// The backend could not access the process table at all.
    #[error("Process table query failed: {operation} - {reason}")]
    QueryFailed { operation: String, reason: String },

    /// The target pid could not be resolved to a live process handle.
    #[error("Process resolution failed: pid {pid} - {reason}")]
    ResolutionFailed { pid: u32, reason: String },

    /// The operating system rejected the termination request.
    #[error("Process termination refused: pid {pid} - {reason}")]
    TerminationRefused { pid: u32, reason: String },

    /// The pid can never name a single process on this platform.
    #[error("Invalid pid {pid}: {reason}")]
    InvalidPid { pid: u32, reason: String },
}

impl PsError {
    pub fn query_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn resolution_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::ResolutionFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn termination_refused(pid: u32, reason: impl Into<String>) -> Self {
        Self::TerminationRefused {
            pid,
            reason: reason.into(),
        }
    }

    pub fn invalid_pid(pid: u32, reason: impl Into<String>) -> Self {
        Self::InvalidPid {
            pid,
            reason: reason.into(),
        }
    }

    /// Returns true for the two failure classes `kill` can produce once the
    /// pid itself has been accepted.
    pub fn is_termination_failure(&self) -> bool {
        matches!(
            self,
            Self::ResolutionFailed { .. } | Self::TerminationRefused { .. }
        )
    }
}

/// Result type for process-table operations.
pub type PsResult<T> = std::result::Result<T, PsError>;
