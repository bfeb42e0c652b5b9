//! Environment publishing.
//!
//! Provisioning never touches the process environment. It returns an
//! [`EnvironmentChanges`] value that the caller inspects or applies at the
//! boundary with [`EnvironmentChanges::apply`].

use crate::tools::{EnvSpec, SearchPath};
use crate::VersionRequest;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runner file collecting `PATH` additions for later steps.
pub const GITHUB_PATH_VAR: &str = "GITHUB_PATH";

/// Runner file collecting exported variables for later steps.
pub const GITHUB_ENV_VAR: &str = "GITHUB_ENV";

/// One environment mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvChange {
    /// Put `dir` in front of the search-path variable `var`.
    Prepend {
        /// Variable name, e.g. `PATH`.
        var: String,
        /// Directory to add.
        dir: PathBuf,
    },
    /// Set `name` to `value`.
    Set {
        /// Variable name.
        name: String,
        /// Value.
        value: String,
    },
}

/// The ordered set of mutations one tool needs in the job environment.
///
/// # Example
///
/// ```rust
/// use clj_provision::EnvironmentChanges;
///
/// let mut changes = EnvironmentChanges::default();
/// changes.prepend_path("/opt/boot/bin");
/// changes.set("BOOT_HOME", "/opt/boot");
/// assert_eq!(changes.var("BOOT_HOME"), Some("/opt/boot"));
/// assert_eq!(changes.path_entries().count(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentChanges {
    changes: Vec<EnvChange>,
}

impl EnvironmentChanges {
    /// Prepend `dir` to `PATH`.
    pub fn prepend_path(&mut self, dir: impl Into<PathBuf>) {
        self.prepend("PATH", dir);
    }

    /// Prepend `dir` to an arbitrary search-path variable.
    pub fn prepend(&mut self, var: impl Into<String>, dir: impl Into<PathBuf>) {
        self.changes.push(EnvChange::Prepend {
            var: var.into(),
            dir: dir.into(),
        });
    }

    /// Export `name=value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.changes.push(EnvChange::Set {
            name: name.into(),
            value: value.into(),
        });
    }

    /// All mutations, in the order they must be applied.
    pub fn changes(&self) -> &[EnvChange] {
        &self.changes
    }

    /// Directories prepended to `PATH`.
    pub fn path_entries(&self) -> impl Iterator<Item = &Path> {
        self.changes.iter().filter_map(|c| match c {
            EnvChange::Prepend { var, dir } if var == "PATH" => Some(dir.as_path()),
            _ => None,
        })
    }

    /// The value exported for `name`, if any.
    pub fn var(&self, name: &str) -> Option<&str> {
        self.changes.iter().rev().find_map(|c| match c {
            EnvChange::Set { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Whether nothing would change.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply the changes for later pipeline steps and this process.
    ///
    /// `PATH` additions go to the file named by `GITHUB_PATH` and variables
    /// to `GITHUB_ENV` when the runner provides them. The current process
    /// environment is updated either way so tools provisioned later in the
    /// same run can see earlier ones.
    pub fn apply(&self) -> std::io::Result<()> {
        let path_file = std::env::var_os(GITHUB_PATH_VAR).filter(|v| !v.is_empty());
        let env_file = std::env::var_os(GITHUB_ENV_VAR).filter(|v| !v.is_empty());

        for change in &self.changes {
            match change {
                EnvChange::Prepend { var, dir } => {
                    let joined = prepended(dir, std::env::var_os(var))?;
                    if var == "PATH" {
                        if let Some(file) = &path_file {
                            append_line(Path::new(file), &dir.to_string_lossy())?;
                        }
                    } else if let Some(file) = &env_file {
                        append_line(
                            Path::new(file),
                            &format!("{}={}", var, joined.to_string_lossy()),
                        )?;
                    }
                    std::env::set_var(var, &joined);
                    info!(var = %var, dir = %dir.display(), "Prepended to search path");
                }
                EnvChange::Set { name, value } => {
                    if let Some(file) = &env_file {
                        append_line(Path::new(file), &format!("{name}={value}"))?;
                    }
                    std::env::set_var(name, value);
                    info!(%name, %value, "Exported variable");
                }
            }
        }
        Ok(())
    }
}

/// Build the published environment for an installation root.
///
/// The search-path entry is always present. The home variable is exported
/// whenever the tool has one; the version variable only for pinned
/// versions, so `latest` never leaves a stale pin for later steps.
pub(crate) fn publish(spec: &EnvSpec, root: &Path, version: &VersionRequest) -> EnvironmentChanges {
    let mut changes = EnvironmentChanges::default();

    match spec.search_path {
        SearchPath::Bin => changes.prepend_path(root.join("bin")),
        SearchPath::PowerShellModules => changes.prepend("PSModulePath", root),
    }

    if let Some(home) = spec.home_var {
        changes.set(home, root.to_string_lossy());
    }

    if let (Some(var), Some(pinned)) = (spec.version_var, version.pinned()) {
        changes.set(var, pinned);
    }

    debug!(?changes, "Published environment");
    changes
}

fn prepended(dir: &Path, current: Option<OsString>) -> std::io::Result<OsString> {
    let mut entries = vec![dir.to_path_buf()];
    if let Some(current) = current {
        entries.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(entries)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
}

fn append_line(file: &Path, line: &str) -> std::io::Result<()> {
    let mut handle = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)?;
    writeln!(handle, "{line}")
}
