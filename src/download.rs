//! Artifact downloads.
//!
//! The engine only talks to the [`Downloader`] trait so tests can stand in
//! for the network. [`HttpDownloader`] is the `ureq` implementation used by
//! the binary.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// An opaque credential forwarded to downloads.
///
/// The value never appears in `Debug` or `Display` output.
///
/// # Example
///
/// ```rust
/// use clj_provision::AuthToken;
///
/// let token = AuthToken::new("token abc");
/// assert_eq!(format!("{:?}", token), "AuthToken(***)");
/// assert_eq!(token.expose(), "token abc");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a credential, sent as the `Authorization` header value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential. Only the HTTP layer should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Errors arising from downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The request failed.
    #[error("download failed for {url}: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The artifact does not exist (HTTP 404).
    #[error("artifact not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// Writing the downloaded file failed.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// The URL involved, when known.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Http { url, .. } | Self::NotFound { url } => Some(url),
            Self::Io(_) => None,
        }
    }
}

/// Fetches remote artifacts.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into the file `dest`.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        auth: Option<&AuthToken>,
    ) -> Result<(), DownloadError>;

    /// Download `url` and return its body as text.
    async fn fetch_text(&self, url: &str, auth: Option<&AuthToken>)
        -> Result<String, DownloadError>;
}

/// HTTP downloader backed by a shared `ureq` agent.
///
/// Requests run on tokio's blocking pool. No timeout is imposed here; the
/// agent's defaults apply.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        auth: Option<&AuthToken>,
    ) -> Result<(), DownloadError> {
        let url = url.to_string();
        let dest: PathBuf = dest.to_path_buf();
        let auth = auth.cloned();
        debug!(%url, dest = %dest.display(), authenticated = auth.is_some(), "Downloading");

        run_blocking(url.clone(), move || download_to_file(&url, &dest, auth.as_ref())).await
    }

    async fn fetch_text(
        &self,
        url: &str,
        auth: Option<&AuthToken>,
    ) -> Result<String, DownloadError> {
        let url = url.to_string();
        let auth = auth.cloned();
        debug!(%url, authenticated = auth.is_some(), "Fetching");

        run_blocking(url.clone(), move || download_text(&url, auth.as_ref())).await
    }
}

async fn run_blocking<T, F>(url: String, f: F) -> Result<T, DownloadError>
where
    F: FnOnce() -> Result<T, DownloadError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DownloadError::Http {
            url,
            reason: format!("download task failed: {e}"),
        })?
}

fn get(
    url: &str,
    auth: Option<&AuthToken>,
) -> Result<ureq::http::Response<ureq::Body>, DownloadError> {
    let mut request = http_agent().get(url);
    if let Some(token) = auth {
        request = request.header("Authorization", token.expose());
    }
    request.call().map_err(|e| map_ureq_error(url, &e))
}

fn download_to_file(url: &str, dest: &Path, auth: Option<&AuthToken>) -> Result<(), DownloadError> {
    let response = get(url, auth)?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(dest)?;
    std::io::copy(&mut response.into_body().into_reader(), &mut file)?;
    Ok(())
}

fn download_text(url: &str, auth: Option<&AuthToken>) -> Result<String, DownloadError> {
    let response = get(url, auth)?;
    response
        .into_body()
        .read_to_string()
        .map_err(|e| DownloadError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(ureq::Agent::new_with_defaults)
}

fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_string(),
        },
        other => DownloadError::Http {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}
