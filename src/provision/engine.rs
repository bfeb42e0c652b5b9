//! The provisioning engine.
//!
//! One call to [`Provisioner::provision`] runs one tool's flow to
//! completion:
//!
//! ```text
//! platform gate → cache lookup ─┬─ hit ──────────────────────────────────┬→ publish
//!                               └─ miss → resolve → download → install → store ┘
//! ```
//!
//! `latest` skips the lookup. Each stage runs at most once and nothing is
//! retried.

use crate::cache::{CacheKey, DirectoryCache, ToolCache};
use crate::download::{AuthToken, DownloadError, Downloader, HttpDownloader};
use crate::environment::{self, EnvironmentChanges};
use crate::install::{self, Artifact, CommandRunner, ProcessRunner};
use crate::platform::Platform;
use crate::provision::ProvisionStage;
use crate::source::{self, DownloadSpec};
use crate::tools::ToolDefinition;
use crate::{ProvisionError, ProvisionOptions, ToolKind, VersionRequest};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What to provision for one tool.
///
/// # Example
///
/// ```rust
/// use clj_provision::{AuthToken, ProvisionRequest, VersionRequest};
///
/// let request = ProvisionRequest::new(VersionRequest::parse("2.8.3"))
///     .with_auth(AuthToken::new("token abc"));
/// assert!(request.auth.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Requested version.
    pub version: VersionRequest,
    /// Credential forwarded to downloads only.
    pub auth: Option<AuthToken>,
}

impl ProvisionRequest {
    /// An anonymous request for `version`.
    pub fn new(version: VersionRequest) -> Self {
        Self {
            version,
            auth: None,
        }
    }

    /// Attach a credential for the download step.
    pub fn with_auth(mut self, auth: AuthToken) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// A completed installation and the environment it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRecord {
    /// The tool.
    pub tool: ToolKind,
    /// The version as requested.
    pub version: VersionRequest,
    /// Installation root inside the tool cache.
    pub root: PathBuf,
    /// Whether the installation was served from the cache.
    pub from_cache: bool,
    /// Changes to apply for later steps to find the tool.
    pub environment: EnvironmentChanges,
}

/// Runs provisioning flows against a downloader, a tool cache and a
/// command runner.
///
/// Flows share nothing mutable, so one `Provisioner` can drive several
/// tools at once.
///
/// # Example
///
/// ```rust,no_run
/// use clj_provision::{
///     Platform, ProvisionOptions, ProvisionRequest, Provisioner, ToolKind, VersionRequest,
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let provisioner = Provisioner::with_defaults(Platform::current(), &ProvisionOptions::default());
///     let request = ProvisionRequest::new(VersionRequest::parse("1.11.1.1435"));
///
///     match provisioner.provision(ToolKind::ClojureCli, &request, |_| {}).await {
///         Ok(record) => record.environment.apply().unwrap(),
///         Err(e) => println!("Failed: {}. Fix: {}", e, e.fix_suggestion()),
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Provisioner<D, C, R> {
    downloader: D,
    cache: C,
    runner: R,
    platform: Platform,
    temp_root: PathBuf,
}

impl Provisioner<HttpDownloader, DirectoryCache, ProcessRunner> {
    /// A provisioner using HTTP downloads, the runner's tool cache and real
    /// processes.
    pub fn with_defaults(platform: Platform, options: &ProvisionOptions) -> Self {
        let cache = DirectoryCache::new(options.resolved_tool_cache(&platform));
        Self::new(HttpDownloader, cache, ProcessRunner, platform, options)
    }
}

impl<D, C, R> Provisioner<D, C, R>
where
    D: Downloader,
    C: ToolCache,
    R: CommandRunner,
{
    /// Create a provisioner from its collaborators.
    pub fn new(
        downloader: D,
        cache: C,
        runner: R,
        platform: Platform,
        options: &ProvisionOptions,
    ) -> Self {
        let temp_root = options.resolved_temp_root(&platform);
        Self {
            downloader,
            cache,
            runner,
            platform,
            temp_root,
        }
    }

    /// The platform flows run for.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Provision one tool.
    ///
    /// Tools that do not support the platform fail with
    /// [`ProvisionError::UnsupportedPlatform`] before any other work. A
    /// pinned version found in the cache is reused without downloading;
    /// `latest` is always downloaded and installed afresh. A failure to
    /// store the installation in the cache fails the flow.
    pub async fn provision<F>(
        &self,
        kind: ToolKind,
        request: &ProvisionRequest,
        on_progress: F,
    ) -> Result<InstallationRecord, ProvisionError>
    where
        F: Fn(ProvisionStage) + Send + Sync,
    {
        let version = &request.version;
        on_progress(ProvisionStage::Started { tool: kind });
        info!(
            tool = %kind,
            %version,
            authenticated = request.auth.is_some(),
            "Provisioning"
        );

        if !kind.is_supported_on(&self.platform) {
            warn!(tool = %kind, "Tool is not supported on this platform");
            return Err(ProvisionError::UnsupportedPlatform {
                tool: kind,
                fix: format!(
                    "Run {} on a Linux or macOS runner",
                    kind.display_name()
                ),
            });
        }

        let def = kind.definition(&self.platform);
        let key = CacheKey::new(kind, version, &self.platform);

        if !version.is_latest() {
            on_progress(ProvisionStage::CacheLookup { tool: kind });
            if let Some(root) = self.cache.find(&key) {
                info!(%key, root = %root.display(), "Using cached installation");
                on_progress(ProvisionStage::CacheHit { tool: kind });
                return Ok(finish(&def, root, version, true, &on_progress));
            }
            debug!(%key, "Not in tool cache");
        }

        on_progress(ProvisionStage::Resolving { tool: kind });
        let spec = match source::resolve(&def, version, &self.platform)? {
            DownloadSpec::ReleaseFeed { feed_url, asset } => {
                let body = self
                    .downloader
                    .fetch_text(&feed_url, request.auth.as_ref())
                    .await
                    .map_err(|e| download_failed(kind, version, &feed_url, e))?;
                let newest = source::check_feed_version(&def, &body)?;
                info!(tool = %kind, version = newest, "Resolved newest release");
                asset.for_version(newest)
            }
            spec => spec,
        };

        let suffix = Uuid::new_v4();
        let download_path = self.temp_root.join(suffix.to_string());
        let dest = self.temp_root.join(format!("temp_{suffix}"));

        on_progress(ProvisionStage::Downloading {
            tool: kind,
            url: spec.url().to_string(),
        });
        self.downloader
            .download(spec.url(), &download_path, request.auth.as_ref())
            .await
            .map_err(|e| download_failed(kind, version, spec.url(), e))?;

        let artifact = match &spec {
            DownloadSpec::Archive { format, .. } => Artifact::Archive {
                path: &download_path,
                format: *format,
            },
            DownloadSpec::BootstrapScript { .. } => Artifact::Script(&download_path),
            DownloadSpec::ReleaseFeed { feed_url, .. } => {
                return Err(ProvisionError::SourceUnresolved {
                    tool: kind,
                    version: version.to_string(),
                    reason: format!("release feed {feed_url} was not expanded"),
                    fix: "Pin a concrete version".to_string(),
                })
            }
        };

        on_progress(ProvisionStage::Installing { tool: kind });
        let installed = install::install(&def, artifact, &dest, version, &self.runner, |name| {
            std::env::var(name).ok()
        })
        .await?;
        debug!(tool = %kind, root = %installed.display(), "Installed");
        install::finalize(&def, &installed, &self.cache.entry_dir(&key)).await?;

        on_progress(ProvisionStage::CacheStore { tool: kind });
        let root = self
            .cache
            .store(&installed, &key)
            .map_err(|e| ProvisionError::CacheStoreFailed {
                key: key.to_string(),
                message: e.to_string(),
                fix: "Check free disk space and permissions of the runner's tool cache".to_string(),
            })?;
        info!(%key, root = %root.display(), "Cached installation");

        Ok(finish(&def, root, version, false, &on_progress))
    }
}

fn finish<F>(
    def: &ToolDefinition,
    root: PathBuf,
    version: &VersionRequest,
    from_cache: bool,
    on_progress: &F,
) -> InstallationRecord
where
    F: Fn(ProvisionStage),
{
    on_progress(ProvisionStage::PublishEnv { tool: def.kind });
    let environment = environment::publish(&def.env, &root, version);
    on_progress(ProvisionStage::Completed { tool: def.kind });

    InstallationRecord {
        tool: def.kind,
        version: version.clone(),
        root,
        from_cache,
        environment,
    }
}

fn download_failed(
    kind: ToolKind,
    version: &VersionRequest,
    url: &str,
    err: DownloadError,
) -> ProvisionError {
    let (message, fix) = match &err {
        DownloadError::NotFound { .. } => (
            "artifact not found (HTTP 404)".to_string(),
            format!(
                "Check that {} version {} exists",
                kind.display_name(),
                version
            ),
        ),
        DownloadError::Http { reason, .. } => (
            reason.clone(),
            "Check network access from the runner, or pass github-token to avoid rate limits"
                .to_string(),
        ),
        DownloadError::Io(e) => (
            e.to_string(),
            "Check free disk space in the runner's temp directory".to_string(),
        ),
    };

    ProvisionError::DownloadFailed {
        url: err.url().unwrap_or(url).to_string(),
        message,
        fix,
    }
}
