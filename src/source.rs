//! Source resolution: (tool, version, platform) to a concrete download.
//!
//! URLs here are versioned contracts with the upstream projects. Changing
//! one changes which artifacts existing pipelines receive.

use crate::platform::{Arch, Os, Platform};
use crate::tools::{ArchiveFormat, ToolDefinition};
use crate::{ProvisionError, ToolKind, VersionRequest};

const BOOT_SCRIPT_URL: &str =
    "https://github.com/boot-clj/boot-bin/releases/download/latest/boot.sh";

const LEIN_SCRIPT_BASE: &str = "https://raw.githubusercontent.com/technomancy/leiningen";

const CLOJURE_INSTALL_BASE: &str = "https://download.clojure.org/install";

const BABASHKA_FEED_URL: &str =
    "https://raw.githubusercontent.com/babashka/babashka/master/resources/BABASHKA_RELEASED_VERSION";

const CLJ_KONDO_FEED_URL: &str =
    "https://raw.githubusercontent.com/clj-kondo/clj-kondo/master/resources/CLJ_KONDO_RELEASED_VERSION";

/// Where a tool's artifact comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSpec {
    /// A direct archive URL for this version.
    Archive {
        /// Archive URL.
        url: String,
        /// Container format of the archive.
        format: ArchiveFormat,
    },

    /// A self-installing script. The URL may be version independent; the
    /// version is then applied when the script runs.
    BootstrapScript {
        /// Script URL.
        url: String,
    },

    /// A release feed naming the newest version, plus the platform asset to
    /// fetch once that version is known.
    ReleaseFeed {
        /// URL whose body is the newest released version.
        feed_url: String,
        /// Asset for this platform.
        asset: ReleaseAsset,
    },
}

impl DownloadSpec {
    /// The URL that is fetched first for this spec.
    pub fn url(&self) -> &str {
        match self {
            Self::Archive { url, .. } | Self::BootstrapScript { url } => url,
            Self::ReleaseFeed { feed_url, .. } => feed_url,
        }
    }
}

/// A platform-specific GitHub release asset, parameterized by version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// GitHub `owner/repo`.
    pub repo: &'static str,
    /// Asset name prefix, e.g. `babashka`.
    pub name: &'static str,
    /// OS component of the asset name.
    pub os: &'static str,
    /// Architecture component of the asset name.
    pub arch: &'static str,
    /// Container format.
    pub format: ArchiveFormat,
}

impl ReleaseAsset {
    /// Archive spec for a concrete version (without a leading `v`).
    ///
    /// # Example
    ///
    /// ```rust
    /// use clj_provision::{ArchiveFormat, DownloadSpec, ReleaseAsset};
    ///
    /// let asset = ReleaseAsset {
    ///     repo: "babashka/babashka",
    ///     name: "babashka",
    ///     os: "linux",
    ///     arch: "amd64",
    ///     format: ArchiveFormat::TarGz,
    /// };
    /// assert_eq!(
    ///     asset.for_version("1.3.186").url(),
    ///     "https://github.com/babashka/babashka/releases/download/v1.3.186/babashka-1.3.186-linux-amd64.tar.gz"
    /// );
    /// ```
    pub fn for_version(&self, version: &str) -> DownloadSpec {
        DownloadSpec::Archive {
            url: format!(
                "https://github.com/{repo}/releases/download/v{version}/{name}-{version}-{os}-{arch}.{ext}",
                repo = self.repo,
                name = self.name,
                os = self.os,
                arch = self.arch,
                ext = self.format.extension(),
            ),
            format: self.format,
        }
    }
}

/// Resolve the download source for `version` of the tool in `def`.
///
/// Fails with [`ProvisionError::SourceUnresolved`] when a pinned version is
/// not valid syntax for the tool, or when the tool publishes nothing for
/// this platform.
pub(crate) fn resolve(
    def: &ToolDefinition,
    version: &VersionRequest,
    platform: &Platform,
) -> Result<DownloadSpec, ProvisionError> {
    let pinned = match version.pinned() {
        Some(v) => Some(check_syntax(def, v)?),
        None => None,
    };

    let spec = match def.kind {
        ToolKind::Boot => DownloadSpec::BootstrapScript {
            url: BOOT_SCRIPT_URL.to_string(),
        },

        ToolKind::Leiningen => {
            let tag = pinned.unwrap_or("stable");
            let script = if platform.is_windows_like() {
                "lein.bat"
            } else {
                "lein"
            };
            DownloadSpec::BootstrapScript {
                url: format!("{LEIN_SCRIPT_BASE}/{tag}/bin/{script}"),
            }
        }

        ToolKind::ClojureCli => {
            let format = if platform.is_windows_like() {
                ArchiveFormat::Zip
            } else {
                ArchiveFormat::TarGz
            };
            let file = match pinned {
                Some(v) => format!("clojure-tools-{v}.{}", format.extension()),
                None => format!("clojure-tools.{}", format.extension()),
            };
            DownloadSpec::Archive {
                url: format!("{CLOJURE_INSTALL_BASE}/{file}"),
                format,
            }
        }

        ToolKind::Babashka => {
            let format = if platform.is_windows_like() {
                ArchiveFormat::Zip
            } else {
                ArchiveFormat::TarGz
            };
            let asset = ReleaseAsset {
                repo: "babashka/babashka",
                name: "babashka",
                os: asset_os(platform),
                arch: asset_arch(def, version, platform)?,
                format,
            };
            release_spec(asset, BABASHKA_FEED_URL, pinned)
        }

        ToolKind::CljKondo => {
            let asset = ReleaseAsset {
                repo: "clj-kondo/clj-kondo",
                name: "clj-kondo",
                os: asset_os(platform),
                arch: asset_arch(def, version, platform)?,
                format: ArchiveFormat::Zip,
            };
            release_spec(asset, CLJ_KONDO_FEED_URL, pinned)
        }
    };

    Ok(spec)
}

/// Validate a version read from a release feed.
pub(crate) fn check_feed_version<'a>(
    def: &ToolDefinition,
    feed_body: &'a str,
) -> Result<&'a str, ProvisionError> {
    check_syntax(def, feed_body.trim())
}

fn check_syntax<'a>(def: &ToolDefinition, version: &'a str) -> Result<&'a str, ProvisionError> {
    def.syntax
        .check(version, def.allow_v_prefix)
        .ok_or_else(|| ProvisionError::SourceUnresolved {
            tool: def.kind,
            version: version.to_string(),
            reason: format!("expected {}", def.syntax.describe()),
            fix: format!(
                "Set the {} input to `latest` or {}",
                def.kind.input_name(),
                def.syntax.describe()
            ),
        })
}

fn release_spec(asset: ReleaseAsset, feed_url: &str, pinned: Option<&str>) -> DownloadSpec {
    match pinned {
        Some(v) => asset.for_version(v),
        None => DownloadSpec::ReleaseFeed {
            feed_url: feed_url.to_string(),
            asset,
        },
    }
}

fn asset_os(platform: &Platform) -> &'static str {
    match platform.os {
        Os::Linux => "linux",
        Os::MacOs => "macos",
        Os::Windows => "windows",
    }
}

fn asset_arch(
    def: &ToolDefinition,
    version: &VersionRequest,
    platform: &Platform,
) -> Result<&'static str, ProvisionError> {
    match (platform.os, platform.arch) {
        (_, Arch::X64) => Ok("amd64"),
        (Os::Linux | Os::MacOs, Arch::Arm64) => Ok("aarch64"),
        _ => Err(ProvisionError::SourceUnresolved {
            tool: def.kind,
            version: version.to_string(),
            reason: format!(
                "no release asset for {:?} on {}",
                platform.os,
                platform.architecture_tag()
            ),
            fix: "Use an x64 runner".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform::new(Os::Linux, Arch::X64)
    }

    fn windows() -> Platform {
        Platform::new(Os::Windows, Arch::X64)
    }

    fn resolve_for(kind: ToolKind, version: &str, platform: Platform) -> Result<DownloadSpec, ProvisionError> {
        let def = kind.definition(&platform);
        resolve(&def, &VersionRequest::parse(version), &platform)
    }

    #[test]
    fn test_boot_url_is_version_independent() {
        let pinned = resolve_for(ToolKind::Boot, "2.8.3", linux()).unwrap();
        let latest = resolve_for(ToolKind::Boot, "latest", linux()).unwrap();
        assert_eq!(pinned, latest);
        assert_eq!(
            pinned,
            DownloadSpec::BootstrapScript {
                url: BOOT_SCRIPT_URL.to_string()
            }
        );
    }

    #[test]
    fn test_boot_rejects_malformed_version() {
        let err = resolve_for(ToolKind::Boot, "2.8", linux()).unwrap_err();
        match err {
            ProvisionError::SourceUnresolved { tool, version, .. } => {
                assert_eq!(tool, ToolKind::Boot);
                assert_eq!(version, "2.8");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_leiningen_tag() {
        let pinned = resolve_for(ToolKind::Leiningen, "2.11.2", linux()).unwrap();
        assert_eq!(
            pinned.url(),
            "https://raw.githubusercontent.com/technomancy/leiningen/2.11.2/bin/lein"
        );
        let latest = resolve_for(ToolKind::Leiningen, "latest", windows()).unwrap();
        assert_eq!(
            latest.url(),
            "https://raw.githubusercontent.com/technomancy/leiningen/stable/bin/lein.bat"
        );
    }

    #[test]
    fn test_clojure_cli_archives() {
        assert_eq!(
            resolve_for(ToolKind::ClojureCli, "1.11.1.1435", linux()).unwrap(),
            DownloadSpec::Archive {
                url: "https://download.clojure.org/install/clojure-tools-1.11.1.1435.tar.gz"
                    .to_string(),
                format: ArchiveFormat::TarGz,
            }
        );
        assert_eq!(
            resolve_for(ToolKind::ClojureCli, "latest", windows()).unwrap(),
            DownloadSpec::Archive {
                url: "https://download.clojure.org/install/clojure-tools.zip".to_string(),
                format: ArchiveFormat::Zip,
            }
        );
    }

    #[test]
    fn test_babashka_pinned_strips_v() {
        let spec = resolve_for(
            ToolKind::Babashka,
            "v1.3.186",
            Platform::new(Os::MacOs, Arch::Arm64),
        )
        .unwrap();
        assert_eq!(
            spec.url(),
            "https://github.com/babashka/babashka/releases/download/v1.3.186/babashka-1.3.186-macos-aarch64.tar.gz"
        );
    }

    #[test]
    fn test_babashka_latest_uses_feed() {
        let spec = resolve_for(ToolKind::Babashka, "latest", windows()).unwrap();
        match spec {
            DownloadSpec::ReleaseFeed { feed_url, asset } => {
                assert_eq!(feed_url, BABASHKA_FEED_URL);
                assert_eq!(asset.os, "windows");
                assert_eq!(asset.format, ArchiveFormat::Zip);
            }
            other => panic!("unexpected spec {:?}", other),
        }
    }

    #[test]
    fn test_clj_kondo_is_always_zip() {
        let spec = resolve_for(ToolKind::CljKondo, "2024.03.13", linux()).unwrap();
        assert_eq!(
            spec,
            DownloadSpec::Archive {
                url: "https://github.com/clj-kondo/clj-kondo/releases/download/v2024.03.13/clj-kondo-2024.03.13-linux-amd64.zip".to_string(),
                format: ArchiveFormat::Zip,
            }
        );
    }

    #[test]
    fn test_windows_arm_has_no_asset() {
        let err = resolve_for(
            ToolKind::CljKondo,
            "latest",
            Platform::new(Os::Windows, Arch::Arm64),
        )
        .unwrap_err();
        assert!(matches!(err, ProvisionError::SourceUnresolved { .. }));
    }

    #[test]
    fn test_feed_version_checked() {
        let def = ToolKind::Babashka.definition(&linux());
        assert_eq!(check_feed_version(&def, "1.3.186\n").unwrap(), "1.3.186");
        assert!(check_feed_version(&def, "<html>not found</html>").is_err());
    }
}
