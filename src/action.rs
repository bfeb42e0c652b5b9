//! The action entry point: inputs to provisioning flows.
//!
//! Every requested tool gets its own flow. Flows run concurrently and
//! independently; one failing never stops the others.

use crate::cache::ToolCache;
use crate::download::{AuthToken, Downloader};
use crate::install::CommandRunner;
use crate::provision::{InstallationRecord, ProvisionError, ProvisionRequest, ProvisionStage, Provisioner};
use crate::{ToolKind, VersionRequest};
use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, error};

/// Inputs of the setup action. `None` or an empty string means the tool is
/// not requested.
///
/// # Example
///
/// ```rust
/// use clj_provision::{ActionInputs, ToolKind};
///
/// let inputs = ActionInputs {
///     bb: Some("1.3.186".to_string()),
///     github_token: Some("abc".to_string()),
///     ..Default::default()
/// };
/// let requests = inputs.requests();
/// assert_eq!(requests.len(), 1);
/// assert_eq!(requests[0].0, ToolKind::Babashka);
/// assert_eq!(requests[0].1.auth.as_ref().unwrap().expose(), "token abc");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionInputs {
    /// Leiningen version.
    pub lein: Option<String>,
    /// Boot version.
    pub boot: Option<String>,
    /// Clojure CLI version.
    pub cli: Option<String>,
    /// Deprecated alias of `cli`; ignored when `cli` is set.
    pub tools_deps: Option<String>,
    /// Babashka version.
    pub bb: Option<String>,
    /// clj-kondo version.
    pub clj_kondo: Option<String>,
    /// GitHub token for release downloads.
    pub github_token: Option<String>,
}

impl ActionInputs {
    /// One request per requested tool, in [`ToolKind::all`] order.
    ///
    /// The token is forwarded to tools fetched from GitHub. The Clojure CLI
    /// comes from its own download host and is fetched anonymously.
    pub fn requests(&self) -> Vec<(ToolKind, ProvisionRequest)> {
        let auth = self.auth_token();
        ToolKind::all()
            .filter_map(|kind| {
                let version = self.version_for(kind)?;
                let mut request = ProvisionRequest::new(VersionRequest::parse(version));
                if let Some(token) = auth.as_ref().filter(|_| kind != ToolKind::ClojureCli) {
                    request = request.with_auth(token.clone());
                }
                Some((kind, request))
            })
            .collect()
    }

    /// The `Authorization` value for the GitHub token, if one was given.
    pub fn auth_token(&self) -> Option<AuthToken> {
        non_empty(&self.github_token).map(|token| AuthToken::new(format!("token {token}")))
    }

    fn version_for(&self, kind: ToolKind) -> Option<&str> {
        match kind {
            ToolKind::Leiningen => non_empty(&self.lein),
            ToolKind::Boot => non_empty(&self.boot),
            ToolKind::ClojureCli => non_empty(&self.cli).or_else(|| non_empty(&self.tools_deps)),
            ToolKind::Babashka => non_empty(&self.bb),
            ToolKind::CljKondo => non_empty(&self.clj_kondo),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Errors reported by the action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// No tool input was set.
    #[error("You must specify at least one clojure tool.")]
    NoToolSpecified,

    /// A provisioning flow failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// Environment changes could not be written for later steps.
    #[error("Failed to publish environment: {0}")]
    Environment(#[from] std::io::Error),
}

impl ActionError {
    /// Get an actionable suggestion for fixing this error.
    pub fn fix_suggestion(&self) -> &str {
        match self {
            Self::NoToolSpecified => "Set one of the lein, boot, cli, bb or clj-kondo inputs",
            Self::Provision(e) => e.fix_suggestion(),
            Self::Environment(_) => "Check that GITHUB_PATH and GITHUB_ENV point at writable files",
        }
    }
}

/// Results of all flows of one action run, in tool order.
#[derive(Debug)]
pub struct ActionOutcome {
    /// Successful installations.
    pub records: Vec<InstallationRecord>,
    /// Failed flows.
    pub failures: Vec<(ToolKind, ProvisionError)>,
}

impl ActionOutcome {
    /// The records, or the first failure in tool order.
    pub fn into_result(self) -> Result<Vec<InstallationRecord>, ActionError> {
        match self.failures.into_iter().next() {
            Some((_, err)) => Err(err.into()),
            None => Ok(self.records),
        }
    }
}

/// Run one flow per requested tool, concurrently.
///
/// Fails only when nothing was requested; per-tool failures are collected
/// in the outcome.
pub async fn provision_all<D, C, R>(
    provisioner: &Provisioner<D, C, R>,
    inputs: &ActionInputs,
) -> Result<ActionOutcome, ActionError>
where
    D: Downloader,
    C: ToolCache,
    R: CommandRunner,
{
    let requests = inputs.requests();
    if requests.is_empty() {
        return Err(ActionError::NoToolSpecified);
    }

    let flows = requests.iter().map(|(kind, request)| async move {
        let result = provisioner
            .provision(*kind, request, |stage: ProvisionStage| {
                debug!(tool = %stage.tool(), "{}", stage.description());
            })
            .await;
        (*kind, result)
    });

    let mut outcome = ActionOutcome {
        records: Vec::new(),
        failures: Vec::new(),
    };
    for (kind, result) in join_all(flows).await {
        match result {
            Ok(record) => outcome.records.push(record),
            Err(err) => outcome.failures.push((kind, err)),
        }
    }
    Ok(outcome)
}

/// Provision every requested tool and apply the successful installations'
/// environment changes.
///
/// Every successful installation is applied even when another fails.
/// Returns the first provisioning failure in tool order, else the first
/// failure to apply an environment; the rest are logged.
pub async fn run<D, C, R>(
    provisioner: &Provisioner<D, C, R>,
    inputs: &ActionInputs,
) -> Result<Vec<InstallationRecord>, ActionError>
where
    D: Downloader,
    C: ToolCache,
    R: CommandRunner,
{
    let outcome = provision_all(provisioner, inputs).await?;
    publish(outcome, |record| record.environment.apply())
}

/// Apply every successful record with `apply`, then report.
///
/// A provisioning failure takes precedence over a failure to apply an
/// environment; everything not returned is logged.
fn publish<F>(outcome: ActionOutcome, apply: F) -> Result<Vec<InstallationRecord>, ActionError>
where
    F: Fn(&InstallationRecord) -> std::io::Result<()>,
{
    let mut apply_errors = Vec::new();
    for record in &outcome.records {
        if let Err(err) = apply(record) {
            error!(tool = %record.tool, error = %err, "Cannot publish environment");
            apply_errors.push(err);
        }
    }
    for (kind, err) in outcome.failures.iter().skip(1) {
        error!(tool = %kind, error = %err, "Provisioning failed");
    }

    let records = outcome.into_result()?;
    match apply_errors.into_iter().next() {
        Some(err) => Err(ActionError::Environment(err)),
        None => Ok(records),
    }
}
