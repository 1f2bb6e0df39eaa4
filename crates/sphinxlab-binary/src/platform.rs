//! Host platform classification
//!
//! Prebuilt Sphinx binaries are published per `{os}-{arch}` classifier
//! (`linux-x86_64`, `osx-aarch_64`, `windows-x86_64`, ...). Detection runs
//! once per process; later calls return the memoized result.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Osx,
    Windows,
    FreeBsd,
    OpenBsd,
    NetBsd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    X86_32,
    Aarch64,
    Arm32,
    Ppc64,
    Ppc64le,
    Riscv64,
    S390x,
}

impl Os {
    pub fn as_str(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Osx => "osx",
            Os::Windows => "windows",
            Os::FreeBsd => "freebsd",
            Os::OpenBsd => "openbsd",
            Os::NetBsd => "netbsd",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "linux" => Some(Os::Linux),
            "osx" => Some(Os::Osx),
            "windows" => Some(Os::Windows),
            "freebsd" => Some(Os::FreeBsd),
            "openbsd" => Some(Os::OpenBsd),
            "netbsd" => Some(Os::NetBsd),
            _ => None,
        }
    }

    /// Maps a `std::env::consts::OS` value
    fn from_target(os: &str) -> Option<Self> {
        match os {
            "macos" => Some(Os::Osx),
            other => Self::parse(other),
        }
    }
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::X86_32 => "x86_32",
            Arch::Aarch64 => "aarch_64",
            Arch::Arm32 => "arm_32",
            Arch::Ppc64 => "ppc_64",
            Arch::Ppc64le => "ppcle_64",
            Arch::Riscv64 => "riscv64",
            Arch::S390x => "s390_64",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "x86_64" => Some(Arch::X86_64),
            "x86_32" => Some(Arch::X86_32),
            "aarch_64" => Some(Arch::Aarch64),
            "arm_32" => Some(Arch::Arm32),
            "ppc_64" => Some(Arch::Ppc64),
            "ppcle_64" => Some(Arch::Ppc64le),
            "riscv64" => Some(Arch::Riscv64),
            "s390_64" => Some(Arch::S390x),
            _ => None,
        }
    }

    /// Maps a `std::env::consts::ARCH` value
    fn from_target(arch: &str, little_endian: bool) -> Option<Self> {
        match arch {
            "x86_64" => Some(Arch::X86_64),
            "x86" => Some(Arch::X86_32),
            "aarch64" => Some(Arch::Aarch64),
            "arm" => Some(Arch::Arm32),
            "powerpc64" if little_endian => Some(Arch::Ppc64le),
            "powerpc64" => Some(Arch::Ppc64),
            "riscv64" => Some(Arch::Riscv64),
            "s390x" => Some(Arch::S390x),
            _ => None,
        }
    }
}

/// Operating system and CPU architecture of a prebuilt binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    os: Os,
    arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Platform of the running process, detected on first use
    pub fn current() -> Result<Platform, PlatformError> {
        static CURRENT: OnceLock<Result<Platform, PlatformError>> = OnceLock::new();
        CURRENT.get_or_init(Self::detect).clone()
    }

    /// Detects the platform without memoization
    pub fn detect() -> Result<Platform, PlatformError> {
        Ok(Self::new(detect_os()?, detect_arch()?))
    }

    /// Parses a classifier such as `linux-x86_64`
    pub fn from_classifier(classifier: &str) -> Result<Platform, PlatformError> {
        let invalid = || PlatformError::InvalidClassifier {
            classifier: classifier.to_string(),
        };

        let (os, arch) = classifier.trim().split_once('-').ok_or_else(invalid)?;
        let os = Os::parse(os).ok_or_else(invalid)?;
        let arch = Arch::parse(arch).ok_or_else(invalid)?;
        Ok(Self::new(os, arch))
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn classifier(&self) -> String {
        format!("{}-{}", self.os.as_str(), self.arch.as_str())
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// Appended to the OS-agnostic binary base name
    pub fn executable_suffix(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_classifier(s)
    }
}

pub fn detect_os() -> Result<Os, PlatformError> {
    Os::from_target(std::env::consts::OS).ok_or_else(|| PlatformError::UnsupportedOs {
        os: std::env::consts::OS.to_string(),
    })
}

pub fn detect_arch() -> Result<Arch, PlatformError> {
    Arch::from_target(std::env::consts::ARCH, cfg!(target_endian = "little")).ok_or_else(|| {
        PlatformError::UnsupportedArch {
            arch: std::env::consts::ARCH.to_string(),
        }
    })
}

/// Platform classification errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("unsupported operating system: {os}")]
    UnsupportedOs { os: String },

    #[error("unsupported architecture: {arch}")]
    UnsupportedArch { arch: String },

    #[error("invalid platform classifier '{classifier}' (expected e.g. linux-x86_64)")]
    InvalidClassifier { classifier: String },
}
