//! Tool cache: completed installations keyed by tool, version and arch.
//!
//! The on-disk layout matches the hosted runner's tool cache so entries
//! written by other setup steps are found too:
//!
//! ```text
//! $RUNNER_TOOL_CACHE/
//! └── Boot/
//!     └── 2.8.3/
//!         ├── x64/            # installation root
//!         └── x64.complete    # written last; no marker means no entry
//! ```

use crate::platform::Platform;
use crate::{ToolKind, VersionRequest};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Runner-provided tool cache root.
pub const RUNNER_TOOL_CACHE_VAR: &str = "RUNNER_TOOL_CACHE";

/// Identifier of one cached installation.
///
/// # Example
///
/// ```rust
/// use clj_provision::{Arch, CacheKey, Os, Platform, ToolKind, VersionRequest};
///
/// let platform = Platform::new(Os::Linux, Arch::X64);
/// let key = CacheKey::new(ToolKind::Boot, &VersionRequest::parse("2.8.3"), &platform);
/// assert_eq!(key.to_string(), "Boot/2.8.3/x64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Tool cache name.
    pub tool: &'static str,
    /// Normalized version.
    pub version: String,
    /// Architecture tag.
    pub arch: String,
}

impl CacheKey {
    /// Derive the key for a request.
    pub fn new(kind: ToolKind, version: &VersionRequest, platform: &Platform) -> Self {
        Self {
            tool: kind.cache_name(),
            version: version.cache_version().to_string(),
            arch: platform.architecture_tag().to_string(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tool, self.version, self.arch)
    }
}

/// Errors arising from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The source directory to cache does not exist.
    #[error("source is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// I/O error while copying into the cache.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory cache for completed installations.
///
/// Implementations must keep stores for different keys independent.
pub trait ToolCache: Send + Sync {
    /// The cached installation root for `key`, if a complete entry exists.
    fn find(&self, key: &CacheKey) -> Option<PathBuf>;

    /// Where the installation for `key` lives once stored.
    fn entry_dir(&self, key: &CacheKey) -> PathBuf;

    /// Copy the installation at `source` into the cache under `key`,
    /// returning the cached root.
    fn store(&self, source: &Path, key: &CacheKey) -> Result<PathBuf, CacheError>;
}

/// [`ToolCache`] over a local directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    root: PathBuf,
}

impl DirectoryCache {
    /// Create a cache at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn marker_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(key.tool)
            .join(&key.version)
            .join(format!("{}.complete", key.arch))
    }
}

impl ToolCache for DirectoryCache {
    fn find(&self, key: &CacheKey) -> Option<PathBuf> {
        let dir = self.entry_dir(key);
        if dir.is_dir() && self.marker_path(key).is_file() {
            trace!(%key, path = %dir.display(), "Cache hit");
            Some(dir)
        } else {
            trace!(%key, "Cache miss");
            None
        }
    }

    fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.tool).join(&key.version).join(&key.arch)
    }

    fn store(&self, source: &Path, key: &CacheKey) -> Result<PathBuf, CacheError> {
        if !source.is_dir() {
            return Err(CacheError::NotADirectory(source.to_path_buf()));
        }

        let dest = self.entry_dir(key);
        let marker = self.marker_path(key);

        // Drop any stale entry first so a failed copy never looks complete
        if marker.exists() {
            std::fs::remove_file(&marker)?;
        }
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }

        copy_dir_all(source, &dest)?;
        std::fs::write(&marker, b"")?;
        debug!(%key, dest = %dest.display(), "Stored installation in cache");
        Ok(dest)
    }
}

/// Recursively copy a directory tree, keeping file permissions and
/// recreating symlinks on unix.
fn copy_dir_all(source: &Path, dest: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let target = dest.join(entry.file_name());

        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            copy_symlink(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let points_to = std::fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::copy(link, target).map(|_| ())
}
