//! # procscan common
//!
//! Error taxonomy and domain types shared by the procscan library and its
//! command-line front end.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{PsError, PsResult};
pub use types::{Architecture, UnknownArchitecture};
