//! Platform probe: OS family, architecture and temp-directory policy.

use std::ffi::OsString;
use std::path::PathBuf;

/// Runner-provided temp directory override.
pub const RUNNER_TEMP_VAR: &str = "RUNNER_TEMP";

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Windows.
    Windows,
    /// macOS.
    MacOs,
    /// Linux and any other POSIX system.
    Linux,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// x86_64 / amd64.
    X64,
    /// aarch64 / arm64.
    Arm64,
    /// Anything else, named as Rust names it.
    Other(&'static str),
}

/// A snapshot of the platform questions the installers branch on.
///
/// The probe is a plain value so tests can build one for any platform
/// instead of depending on the host.
///
/// # Example
///
/// ```rust
/// use clj_provision::{Arch, Os, Platform};
///
/// let platform = Platform::new(Os::Linux, Arch::X64);
/// assert!(!platform.is_windows_like());
/// assert_eq!(platform.architecture_tag(), "x64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system family.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
}

impl Platform {
    /// Create a platform from its parts.
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// The platform this process runs on.
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::MacOs,
            _ => Os::Linux,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => Arch::X64,
            "aarch64" => Arch::Arm64,
            other => Arch::Other(other),
        };
        Self { os, arch }
    }

    /// Whether installers must take their Windows branch.
    pub fn is_windows_like(&self) -> bool {
        self.os == Os::Windows
    }

    /// Architecture component of cache keys (`x64`, `arm64`, ...).
    pub fn architecture_tag(&self) -> &'static str {
        match self.arch {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
            Arch::Other(name) => name,
        }
    }

    /// Root under which temporary installation directories are created.
    ///
    /// Reads `RUNNER_TEMP` from the process environment; see
    /// [`Platform::temp_root_from`] for the policy.
    pub fn default_temp_root(&self) -> PathBuf {
        self.temp_root_from(|name| std::env::var_os(name))
    }

    /// Temp root policy over an arbitrary variable lookup.
    ///
    /// A non-empty `RUNNER_TEMP` wins. Otherwise the base is the user
    /// profile on Windows (`C:\` when unset), `/Users` on macOS and `/home`
    /// elsewhere, with `actions/temp` appended.
    pub fn temp_root_from<F>(&self, lookup: F) -> PathBuf
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(dir) = lookup(RUNNER_TEMP_VAR).filter(|v| !v.is_empty()) {
            return PathBuf::from(dir);
        }

        let base = match self.os {
            Os::Windows => lookup("USERPROFILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("C:\\")),
            Os::MacOs => PathBuf::from("/Users"),
            Os::Linux => PathBuf::from("/home"),
        };
        base.join("actions").join("temp")
    }
}
