//! Core domain types shared by the procscan crates.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Instruction-set architecture a process was loaded for.
///
/// A 32-bit executable running on a 64-bit host reports its own
/// architecture (`X86` under WOW64, `X86_64` under Rosetta), not the host's.
///
/// # Example
/// ```
/// use procscan_common::Architecture;
///
/// let arch: Architecture = "amd64".parse().unwrap();
/// assert_eq!(arch, Architecture::X86_64);
/// assert_eq!(arch.as_str(), "x86_64");
/// ```
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X86_64,
    Arm,
    Arm64,
    RiscV64,
    #[serde(rename = "ppc64")]
    PowerPc64,
    S390x,
    Mips,
    Mips64,
}

impl Architecture {
    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
            Architecture::RiscV64 => "riscv64",
            Architecture::PowerPc64 => "ppc64",
            Architecture::S390x => "s390x",
            Architecture::Mips => "mips",
            Architecture::Mips64 => "mips64",
        }
    }

    /// Architecture this binary was compiled for, if it is one we name.
    pub fn native() -> Option<Self> {
        std::env::consts::ARCH.parse().ok()
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string does not name a known architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownArchitecture(pub String);

impl fmt::Display for UnknownArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown architecture: {}", self.0)
    }
}

impl std::error::Error for UnknownArchitecture {}

impl FromStr for Architecture {
    type Err = UnknownArchitecture;

    /// Accepts the canonical names plus the common aliases used by
    /// compilers and package managers (`amd64`, `i686`, `aarch64`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "i386" | "i486" | "i586" | "i686" | "386" => Ok(Architecture::X86),
            "x86_64" | "amd64" | "x64" => Ok(Architecture::X86_64),
            "arm" | "armv7" | "armhf" => Ok(Architecture::Arm),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "riscv64" => Ok(Architecture::RiscV64),
            "ppc64" | "powerpc64" | "ppc64le" => Ok(Architecture::PowerPc64),
            "s390x" => Ok(Architecture::S390x),
            "mips" => Ok(Architecture::Mips),
            "mips64" => Ok(Architecture::Mips64),
            _ => Err(UnknownArchitecture(s.to_string())),
        }
    }
}
