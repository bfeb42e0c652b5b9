//! Error types for provisioning operations.
//!
//! Every variant carries an actionable `fix` suggestion. The variants form
//! the whole failure taxonomy of a provisioning flow; component errors
//! (download, extraction, cache) are converted into them at the engine
//! boundary.

use crate::ToolKind;
use thiserror::Error;

/// Errors that can end a provisioning flow.
///
/// No variant ever carries the auth token.
///
/// # Example
///
/// ```rust
/// use clj_provision::{ProvisionError, ToolKind};
///
/// let error = ProvisionError::UnsupportedPlatform {
///     tool: ToolKind::Boot,
///     fix: "Use Leiningen or the Clojure CLI on Windows runners".to_string(),
/// };
/// assert_eq!(error.to_string(), "Boot on windows is not supported yet.");
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProvisionError {
    /// The tool cannot be provisioned on this OS family.
    #[error("{tool} on windows is not supported yet.")]
    UnsupportedPlatform {
        /// The tool that was requested.
        tool: ToolKind,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// No download source exists for the requested version and platform.
    #[error("Cannot resolve a {tool} download for version '{version}': {reason}")]
    SourceUnresolved {
        /// The tool that was requested.
        tool: ToolKind,
        /// The version as requested.
        version: String,
        /// Why resolution failed.
        reason: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The artifact could not be downloaded.
    #[error("Download failed for {url}: {message}")]
    DownloadFailed {
        /// The URL that was requested.
        url: String,
        /// Description of the failure.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The downloaded artifact could not be turned into an installation.
    #[error("{tool} installation failed: {message}")]
    InstallFailed {
        /// The tool being installed.
        tool: ToolKind,
        /// Description of the failure.
        message: String,
        /// Exit code of the bootstrap script, if one ran.
        exit_code: Option<i32>,
        /// Standard error of the bootstrap script, if captured.
        stderr: Option<String>,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },

    /// The installation could not be stored in the tool cache.
    #[error("Failed to cache {key}: {message}")]
    CacheStoreFailed {
        /// The cache key, as `tool/version/arch`.
        key: String,
        /// Description of the failure.
        message: String,
        /// Actionable suggestion for resolving the issue.
        fix: String,
    },
}

impl ProvisionError {
    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::UnsupportedPlatform { fix, .. } => fix,
            Self::SourceUnresolved { fix, .. } => fix,
            Self::DownloadFailed { fix, .. } => fix,
            Self::InstallFailed { fix, .. } => fix,
            Self::CacheStoreFailed { fix, .. } => fix,
        }
    }

    /// Shorthand for an install failure that did not come from a script.
    pub(crate) fn install(tool: ToolKind, message: impl Into<String>) -> Self {
        Self::InstallFailed {
            tool,
            message: message.into(),
            exit_code: None,
            stderr: None,
            fix: format!(
                "Retry the job; if it keeps failing, pin a different {} version",
                tool.display_name()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_display() {
        let error = ProvisionError::UnsupportedPlatform {
            tool: ToolKind::Boot,
            fix: "Use a Linux or macOS runner".to_string(),
        };
        assert_eq!(error.to_string(), "Boot on windows is not supported yet.");
    }

    #[test]
    fn test_source_unresolved_display() {
        let error = ProvisionError::SourceUnresolved {
            tool: ToolKind::ClojureCli,
            version: "1.11".to_string(),
            reason: "expected a four-part version".to_string(),
            fix: "Use a version such as 1.11.1.1435".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("Clojure CLI"));
        assert!(msg.contains("'1.11'"));
    }

    #[test]
    fn test_install_shorthand() {
        let error = ProvisionError::install(ToolKind::Boot, "Not a file");
        assert_eq!(error.to_string(), "Boot installation failed: Not a file");
        assert!(matches!(
            error,
            ProvisionError::InstallFailed {
                exit_code: None,
                stderr: None,
                ..
            }
        ));
    }

    #[test]
    fn test_all_variants_have_fix() {
        let errors = vec![
            ProvisionError::UnsupportedPlatform {
                tool: ToolKind::Boot,
                fix: "Use a Linux runner".to_string(),
            },
            ProvisionError::SourceUnresolved {
                tool: ToolKind::Babashka,
                version: "x".to_string(),
                reason: "bad".to_string(),
                fix: "Use a semantic version".to_string(),
            },
            ProvisionError::DownloadFailed {
                url: "https://example.invalid/boot.sh".to_string(),
                message: "404".to_string(),
                fix: "Check the version exists".to_string(),
            },
            ProvisionError::install(ToolKind::Leiningen, "exit 1"),
            ProvisionError::CacheStoreFailed {
                key: "Boot/1.2.3/x64".to_string(),
                message: "disk full".to_string(),
                fix: "Free space on the runner".to_string(),
            },
        ];

        for error in errors {
            assert!(
                !error.fix_suggestion().is_empty(),
                "fix_suggestion() should return non-empty string for {:?}",
                error
            );
        }
    }
}
