//! Installers: turn a downloaded artifact into an installation root.
//!
//! Two installer kinds exist. Archive installers extract and arrange files
//! ([`archive`]); bootstrap installers place a script and run it once
//! ([`bootstrap`]). Which one runs is fixed by the tool's definition.

mod archive;
mod bootstrap;

pub use bootstrap::{CommandOutput, CommandRunner, ProcessRunner, ScriptCommand};

use crate::tools::{ArchiveFormat, InstallerKind, ToolDefinition};
use crate::{ProvisionError, VersionRequest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A downloaded artifact awaiting installation.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Artifact<'a> {
    /// A bootstrap script.
    Script(&'a Path),
    /// An archive in a known container format.
    Archive {
        path: &'a Path,
        format: ArchiveFormat,
    },
}

impl Artifact<'_> {
    fn path(&self) -> &Path {
        match self {
            Self::Script(path) | Self::Archive { path, .. } => path,
        }
    }
}

/// Install `artifact` into `dest` following `def`, returning the root.
///
/// `inherited` supplies values for the variables forwarded to bootstrap
/// scripts.
pub(crate) async fn install<R, F>(
    def: &ToolDefinition,
    artifact: Artifact<'_>,
    dest: &Path,
    version: &VersionRequest,
    runner: &R,
    inherited: F,
) -> Result<PathBuf, ProvisionError>
where
    R: CommandRunner + ?Sized,
    F: Fn(&str) -> Option<String>,
{
    debug!(
        tool = %def.kind,
        artifact = %artifact.path().display(),
        dest = %dest.display(),
        "Installing artifact"
    );

    match (def.installer, artifact) {
        (InstallerKind::Bootstrap(plan), Artifact::Script(script)) => {
            bootstrap::install(def.kind, &plan, script, dest, version, runner, inherited).await
        }
        (InstallerKind::Archive(layout), Artifact::Archive { path, format }) => {
            if !path.is_file() {
                return Err(ProvisionError::install(def.kind, "Not a file"));
            }
            let path = path.to_path_buf();
            let dest = dest.to_path_buf();
            tokio::task::spawn_blocking(move || archive::install(layout, &path, format, &dest))
                .await
                .map_err(|e| ProvisionError::install(def.kind, format!("extraction task failed: {e}")))?
                .map_err(|e| ProvisionError::install(def.kind, e.to_string()))
        }
        (installer, artifact) => Err(ProvisionError::install(
            def.kind,
            format!("{artifact:?} cannot be installed by {installer:?}"),
        )),
    }
}

/// Adjust the installation at `staged` for use from its final `root`.
///
/// Runs before the installation is stored, so a failure here never leaves
/// a complete cache entry behind.
pub(crate) async fn finalize(
    def: &ToolDefinition,
    staged: &Path,
    root: &Path,
) -> Result<(), ProvisionError> {
    let InstallerKind::Archive(layout) = def.installer else {
        return Ok(());
    };
    let staged = staged.to_path_buf();
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || archive::finalize(layout, &staged, &root))
        .await
        .map_err(|e| ProvisionError::install(def.kind, format!("finalize task failed: {e}")))?
        .map_err(|e| ProvisionError::install(def.kind, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, Os, Platform};
    use crate::ToolKind;
    use async_trait::async_trait;

    struct NeverRunner;

    #[async_trait]
    impl CommandRunner for NeverRunner {
        async fn run(&self, command: &ScriptCommand) -> std::io::Result<CommandOutput> {
            panic!("unexpected command {:?}", command);
        }
    }

    fn linux() -> Platform {
        Platform::new(Os::Linux, Arch::X64)
    }

    #[tokio::test]
    async fn test_archive_artifact_must_be_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let def = ToolKind::Babashka.definition(&linux());

        let err = install(
            &def,
            Artifact::Archive {
                path: &temp.path().join("missing.tar.gz"),
                format: ArchiveFormat::TarGz,
            },
            &temp.path().join("temp_1"),
            &VersionRequest::parse("1.3.186"),
            &NeverRunner,
            |_| None,
        )
        .await
        .unwrap_err();

        match err {
            ProvisionError::InstallFailed { message, .. } => assert_eq!(message, "Not a file"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extraction_failure_is_install_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("bb.tar.gz");
        std::fs::write(&archive, b"not gzip").unwrap();
        let def = ToolKind::Babashka.definition(&linux());

        let err = install(
            &def,
            Artifact::Archive {
                path: &archive,
                format: ArchiveFormat::TarGz,
            },
            &temp.path().join("temp_1"),
            &VersionRequest::parse("1.3.186"),
            &NeverRunner,
            |_| None,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::InstallFailed {
                tool: ToolKind::Babashka,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_mismatched_artifact_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("boot.sh");
        std::fs::write(&script, b"#!/bin/sh\n").unwrap();
        let def = ToolKind::ClojureCli.definition(&linux());

        let result = install(
            &def,
            Artifact::Script(&script),
            &temp.path().join("temp_1"),
            &VersionRequest::Latest,
            &NeverRunner,
            |_| None,
        )
        .await;

        assert!(matches!(result, Err(ProvisionError::InstallFailed { .. })));
    }

    #[tokio::test]
    async fn test_finalize_failure_is_install_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let def = ToolKind::ClojureCli.definition(&linux());

        // No launchers under the staged root
        let err = finalize(&def, temp.path(), &temp.path().join("cache"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::InstallFailed {
                tool: ToolKind::ClojureCli,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_finalize_is_noop_for_bootstrap_tools() {
        let temp = tempfile::TempDir::new().unwrap();
        let def = ToolKind::Leiningen.definition(&linux());
        finalize(&def, temp.path(), &temp.path().join("cache"))
            .await
            .unwrap();
    }
}
