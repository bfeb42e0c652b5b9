//! Progress reporting for provisioning flows.
//!
//! [`ProvisionStage`] mirrors the engine's state machine. Failure is not a
//! stage; it is the error returned by the flow.

use crate::ToolKind;

/// Stages of one provisioning flow, in the order they can occur.
///
/// A cache hit goes `Started → CacheLookup → CacheHit → PublishEnv →
/// Completed`; a miss goes through `Resolving`, `Downloading`, `Installing`
/// and `CacheStore` instead of `CacheHit`.
///
/// # Example
///
/// ```rust
/// use clj_provision::{ProvisionStage, ToolKind};
///
/// fn on_progress(stage: ProvisionStage) {
///     match &stage {
///         ProvisionStage::Downloading { tool, url } => {
///             println!("Downloading {} from {}", tool.display_name(), url);
///         }
///         ProvisionStage::Completed { tool } => {
///             println!("{} is ready", tool.display_name());
///         }
///         other => println!("{}", other.description()),
///     }
/// }
///
/// on_progress(ProvisionStage::Started { tool: ToolKind::Boot });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStage {
    /// The flow has started.
    Started {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// Looking the request up in the tool cache.
    CacheLookup {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// A cached installation is reused.
    CacheHit {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// Resolving the download source.
    Resolving {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// Downloading the artifact.
    Downloading {
        /// The tool being provisioned.
        tool: ToolKind,
        /// The artifact URL.
        url: String,
    },

    /// Installing the downloaded artifact.
    Installing {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// Storing the installation in the tool cache.
    CacheStore {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// Building the environment changes.
    PublishEnv {
        /// The tool being provisioned.
        tool: ToolKind,
    },

    /// The flow finished successfully.
    Completed {
        /// The tool that was provisioned.
        tool: ToolKind,
    },
}

impl ProvisionStage {
    /// Get a human-readable description of the stage.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clj_provision::{ProvisionStage, ToolKind};
    ///
    /// let stage = ProvisionStage::CacheLookup { tool: ToolKind::Babashka };
    /// assert_eq!(stage.description(), "Checking tool cache");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            Self::Started { .. } => "Starting provisioning",
            Self::CacheLookup { .. } => "Checking tool cache",
            Self::CacheHit { .. } => "Using cached installation",
            Self::Resolving { .. } => "Resolving download source",
            Self::Downloading { .. } => "Downloading",
            Self::Installing { .. } => "Installing",
            Self::CacheStore { .. } => "Storing in tool cache",
            Self::PublishEnv { .. } => "Publishing environment",
            Self::Completed { .. } => "Provisioning complete",
        }
    }

    /// The tool this stage belongs to.
    pub fn tool(&self) -> ToolKind {
        match self {
            Self::Started { tool }
            | Self::CacheLookup { tool }
            | Self::CacheHit { tool }
            | Self::Resolving { tool }
            | Self::Downloading { tool, .. }
            | Self::Installing { tool }
            | Self::CacheStore { tool }
            | Self::PublishEnv { tool }
            | Self::Completed { tool } => *tool,
        }
    }

    /// Check if this stage indicates completion.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_description() {
        let tool = ToolKind::Boot;
        assert_eq!(
            ProvisionStage::Started { tool }.description(),
            "Starting provisioning"
        );
        assert_eq!(
            ProvisionStage::CacheHit { tool }.description(),
            "Using cached installation"
        );
        assert_eq!(
            ProvisionStage::Downloading {
                tool,
                url: "https://example.invalid/boot.sh".to_string()
            }
            .description(),
            "Downloading"
        );
        assert_eq!(
            ProvisionStage::CacheStore { tool }.description(),
            "Storing in tool cache"
        );
        assert_eq!(
            ProvisionStage::Completed { tool }.description(),
            "Provisioning complete"
        );
    }

    #[test]
    fn test_stage_is_complete() {
        let tool = ToolKind::CljKondo;
        assert!(ProvisionStage::Completed { tool }.is_complete());
        assert!(!ProvisionStage::Started { tool }.is_complete());
        assert!(!ProvisionStage::PublishEnv { tool }.is_complete());
        assert!(!ProvisionStage::Installing { tool }.is_complete());
    }

    #[test]
    fn test_stage_tool() {
        let stage = ProvisionStage::Downloading {
            tool: ToolKind::ClojureCli,
            url: String::new(),
        };
        assert_eq!(stage.tool(), ToolKind::ClojureCli);
    }
}
