//! Per-tool definitions.
//!
//! Each tool kind maps to one [`ToolDefinition`] describing how its artifact
//! is installed and what it publishes to the job environment. Definitions
//! can depend on the platform (Clojure CLI ships a PowerShell module on
//! Windows).

use crate::platform::Platform;
use crate::version::VersionSyntax;
use crate::ToolKind;

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// gzip-compressed tarball.
    TarGz,
    /// zip archive.
    Zip,
}

impl ArchiveFormat {
    /// File extension used in release asset names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

/// How an archive's contents are arranged into an installation root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveLayout {
    /// `clojure-tools/` tarball rearranged into `bin`, `lib/clojure` and
    /// `share/man`, with install placeholders substituted.
    ClojureTools,
    /// Zip holding the `ClojureTools` PowerShell module, extracted as is.
    PowerShellModule,
    /// Archive of standalone executables, extracted into `bin`.
    Executables(&'static [&'static str]),
}

/// A self-installing script and how to run it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BootstrapPlan {
    /// Directory under the destination that becomes the install root.
    pub dir_name: &'static str,
    /// File name the script is stored under in `<root>/bin`.
    pub script_name: &'static str,
    /// Variable telling the script where to materialize the installation.
    pub home_var: &'static str,
    /// Variable pinning the version, for tools that pin at run time.
    pub version_var: Option<&'static str>,
    /// Interpreter prefix, for scripts that are not directly executable.
    pub launcher: &'static [&'static str],
    /// Arguments for a pinned version.
    pub pinned_args: &'static [&'static str],
    /// Arguments for `latest`.
    pub latest_args: &'static [&'static str],
}

/// Installer kind for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstallerKind {
    /// Run a downloaded bootstrap script.
    Bootstrap(BootstrapPlan),
    /// Extract an archive.
    Archive(ArchiveLayout),
}

/// Which search-path variable the install root feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchPath {
    /// `<root>/bin` is prepended to `PATH`.
    Bin,
    /// `<root>` is prepended to `PSModulePath`.
    PowerShellModules,
}

/// Environment published for a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EnvSpec {
    pub search_path: SearchPath,
    pub home_var: Option<&'static str>,
    /// Only exported for pinned versions.
    pub version_var: Option<&'static str>,
}

/// Everything the engine needs to know about one tool on one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ToolDefinition {
    pub kind: ToolKind,
    pub supports_windows: bool,
    pub syntax: VersionSyntax,
    /// Accept `v1.2.3` for tools whose release tags carry a `v`.
    pub allow_v_prefix: bool,
    pub installer: InstallerKind,
    pub env: EnvSpec,
}

const BIN_ONLY: EnvSpec = EnvSpec {
    search_path: SearchPath::Bin,
    home_var: None,
    version_var: None,
};

impl ToolKind {
    /// The definition of this tool on `platform`.
    pub(crate) fn definition(&self, platform: &Platform) -> ToolDefinition {
        match self {
            Self::Leiningen => leiningen(platform),
            Self::Boot => boot(),
            Self::ClojureCli => clojure_cli(platform),
            Self::Babashka => babashka(platform),
            Self::CljKondo => clj_kondo(platform),
        }
    }

    /// Whether this tool can be provisioned on `platform` at all.
    pub fn is_supported_on(&self, platform: &Platform) -> bool {
        !platform.is_windows_like() || self.definition(platform).supports_windows
    }
}

/// Leiningen: the `lein` script downloads its own jar on first run.
fn leiningen(platform: &Platform) -> ToolDefinition {
    let plan = if platform.is_windows_like() {
        BootstrapPlan {
            dir_name: "leiningen",
            script_name: "lein.bat",
            home_var: "LEIN_HOME",
            version_var: None,
            launcher: &["cmd", "/C"],
            pinned_args: &["self-install"],
            latest_args: &["self-install"],
        }
    } else {
        BootstrapPlan {
            dir_name: "leiningen",
            script_name: "lein",
            home_var: "LEIN_HOME",
            version_var: None,
            launcher: &[],
            pinned_args: &["version"],
            latest_args: &["version"],
        }
    };

    ToolDefinition {
        kind: ToolKind::Leiningen,
        supports_windows: true,
        syntax: VersionSyntax::DottedWithSuffix,
        allow_v_prefix: false,
        installer: InstallerKind::Bootstrap(plan),
        env: EnvSpec {
            search_path: SearchPath::Bin,
            home_var: Some("LEIN_HOME"),
            version_var: None,
        },
    }
}

/// Boot: a version-independent `boot.sh` pinned through `BOOT_VERSION`.
fn boot() -> ToolDefinition {
    ToolDefinition {
        kind: ToolKind::Boot,
        supports_windows: false,
        syntax: VersionSyntax::Semver,
        allow_v_prefix: false,
        installer: InstallerKind::Bootstrap(BootstrapPlan {
            dir_name: "boot",
            script_name: "boot",
            home_var: "BOOT_HOME",
            version_var: Some("BOOT_VERSION"),
            launcher: &[],
            pinned_args: &["-V"],
            latest_args: &["-u"],
        }),
        env: EnvSpec {
            search_path: SearchPath::Bin,
            home_var: Some("BOOT_HOME"),
            version_var: Some("BOOT_VERSION"),
        },
    }
}

fn clojure_cli(platform: &Platform) -> ToolDefinition {
    let (layout, search_path) = if platform.is_windows_like() {
        (ArchiveLayout::PowerShellModule, SearchPath::PowerShellModules)
    } else {
        (ArchiveLayout::ClojureTools, SearchPath::Bin)
    };

    ToolDefinition {
        kind: ToolKind::ClojureCli,
        supports_windows: true,
        syntax: VersionSyntax::FourPart,
        allow_v_prefix: false,
        installer: InstallerKind::Archive(layout),
        env: EnvSpec {
            search_path,
            ..BIN_ONLY
        },
    }
}

fn babashka(platform: &Platform) -> ToolDefinition {
    let binaries: &'static [&'static str] = if platform.is_windows_like() {
        &["bb.exe"]
    } else {
        &["bb"]
    };

    ToolDefinition {
        kind: ToolKind::Babashka,
        supports_windows: true,
        syntax: VersionSyntax::Semver,
        allow_v_prefix: true,
        installer: InstallerKind::Archive(ArchiveLayout::Executables(binaries)),
        env: BIN_ONLY,
    }
}

fn clj_kondo(platform: &Platform) -> ToolDefinition {
    let binaries: &'static [&'static str] = if platform.is_windows_like() {
        &["clj-kondo.exe"]
    } else {
        &["clj-kondo"]
    };

    ToolDefinition {
        kind: ToolKind::CljKondo,
        supports_windows: true,
        syntax: VersionSyntax::ThreePart,
        allow_v_prefix: true,
        installer: InstallerKind::Archive(ArchiveLayout::Executables(binaries)),
        env: BIN_ONLY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os};

    const LINUX: Platform = Platform {
        os: Os::Linux,
        arch: Arch::X64,
    };
    const WINDOWS: Platform = Platform {
        os: Os::Windows,
        arch: Arch::X64,
    };

    #[test]
    fn test_only_boot_refuses_windows() {
        for kind in ToolKind::all() {
            assert_eq!(kind.is_supported_on(&WINDOWS), kind != ToolKind::Boot);
            assert!(kind.is_supported_on(&LINUX));
        }
    }

    #[test]
    fn test_boot_pins_through_environment() {
        let def = ToolKind::Boot.definition(&LINUX);
        match def.installer {
            InstallerKind::Bootstrap(plan) => {
                assert_eq!(plan.version_var, Some("BOOT_VERSION"));
                assert_eq!(plan.pinned_args, &["-V"]);
                assert_eq!(plan.latest_args, &["-u"]);
            }
            other => panic!("unexpected installer {:?}", other),
        }
        assert_eq!(def.env.home_var, Some("BOOT_HOME"));
    }

    #[test]
    fn test_leiningen_uses_bat_on_windows() {
        match ToolKind::Leiningen.definition(&WINDOWS).installer {
            InstallerKind::Bootstrap(plan) => {
                assert_eq!(plan.script_name, "lein.bat");
                assert_eq!(plan.launcher, &["cmd", "/C"]);
            }
            other => panic!("unexpected installer {:?}", other),
        }
    }

    #[test]
    fn test_clojure_cli_layout_depends_on_platform() {
        let posix = ToolKind::ClojureCli.definition(&LINUX);
        assert_eq!(
            posix.installer,
            InstallerKind::Archive(ArchiveLayout::ClojureTools)
        );
        assert_eq!(posix.env.search_path, SearchPath::Bin);

        let windows = ToolKind::ClojureCli.definition(&WINDOWS);
        assert_eq!(windows.env.search_path, SearchPath::PowerShellModules);
    }

    #[test]
    fn test_executables_get_exe_suffix_on_windows() {
        assert_eq!(
            ToolKind::Babashka.definition(&WINDOWS).installer,
            InstallerKind::Archive(ArchiveLayout::Executables(&["bb.exe"]))
        );
        assert_eq!(
            ToolKind::CljKondo.definition(&LINUX).installer,
            InstallerKind::Archive(ArchiveLayout::Executables(&["clj-kondo"]))
        );
    }
}
