//! Provisioning options configuration.
//!
//! This module provides the [`ProvisionOptions`] struct for configuring
//! where provisioning flows keep their scratch files and completed
//! installations.

use crate::cache::RUNNER_TOOL_CACHE_VAR;
use crate::platform::Platform;
use std::path::PathBuf;

/// Configuration options for provisioning.
///
/// # Default Behavior
///
/// Both roots are unset by default. The temp root then follows the
/// platform policy (`RUNNER_TEMP`, else a per-OS home location with
/// `actions/temp` appended) and the tool cache follows `RUNNER_TOOL_CACHE`,
/// falling back to a `tool-cache` directory next to the temp root.
///
/// # Example
///
/// ```rust
/// use clj_provision::ProvisionOptions;
/// use std::path::PathBuf;
///
/// // Use default options
/// let opts = ProvisionOptions::default();
/// assert!(opts.temp_root.is_none());
///
/// // Keep everything under one scratch directory
/// let opts = ProvisionOptions {
///     temp_root: Some(PathBuf::from("/tmp/ci/temp")),
///     tool_cache: Some(PathBuf::from("/tmp/ci/cache")),
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionOptions {
    /// Root for downloads and installation working directories.
    ///
    /// Each flow creates uniquely named entries below it, so several flows
    /// can share one root.
    ///
    /// Default: `None` (platform policy)
    pub temp_root: Option<PathBuf>,

    /// Root of the tool cache.
    ///
    /// Default: `None` (`RUNNER_TOOL_CACHE`)
    pub tool_cache: Option<PathBuf>,
}

impl ProvisionOptions {
    /// The effective temp root on `platform`.
    pub fn resolved_temp_root(&self, platform: &Platform) -> PathBuf {
        self.temp_root
            .clone()
            .unwrap_or_else(|| platform.default_temp_root())
    }

    /// The effective tool cache root on `platform`.
    pub fn resolved_tool_cache(&self, platform: &Platform) -> PathBuf {
        if let Some(dir) = &self.tool_cache {
            return dir.clone();
        }
        match std::env::var_os(RUNNER_TOOL_CACHE_VAR).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => self
                .resolved_temp_root(platform)
                .with_file_name("tool-cache"),
        }
    }
}
