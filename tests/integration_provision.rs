//! Integration tests for provisioning flows.
//!
//! Downloads are served from memory; caches, extraction and (on unix) the
//! bootstrap scripts themselves are real.

use async_trait::async_trait;
use clj_provision::{
    provision_all, ActionInputs, Arch, AuthToken, CacheKey, DirectoryCache, DownloadError,
    Downloader, Os, Platform, ProcessRunner, ProvisionError, ProvisionOptions, ProvisionRequest,
    Provisioner, ToolCache, ToolKind, VersionRequest,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BOOT_URL: &str = "https://github.com/boot-clj/boot-bin/releases/download/latest/boot.sh";
const CLI_URL: &str = "https://download.clojure.org/install/clojure-tools-1.11.1.1435.tar.gz";

/// Stand-in for `boot.sh`: records how it was invoked under `BOOT_HOME`.
const FAKE_BOOT_SCRIPT: &str = r#"#!/bin/sh
mkdir -p "$BOOT_HOME/cache"
echo "${BOOT_VERSION:-unpinned} $*" > "$BOOT_HOME/cache/invocation"
"#;

#[derive(Default)]
struct MemoryDownloader {
    bodies: HashMap<String, Vec<u8>>,
    /// URL and whether a token was sent, per request.
    requested: Arc<Mutex<Vec<(String, bool)>>>,
}

impl MemoryDownloader {
    fn serving(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    fn body(&self, url: &str, auth: Option<&AuthToken>) -> Result<Vec<u8>, DownloadError> {
        self.requested
            .lock()
            .unwrap()
            .push((url.to_string(), auth.is_some()));
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound {
                url: url.to_string(),
            })
    }
}

#[async_trait]
impl Downloader for MemoryDownloader {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        auth: Option<&AuthToken>,
    ) -> Result<(), DownloadError> {
        let body = self.body(url, auth)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, body)?;
        Ok(())
    }

    async fn fetch_text(
        &self,
        url: &str,
        auth: Option<&AuthToken>,
    ) -> Result<String, DownloadError> {
        Ok(String::from_utf8_lossy(&self.body(url, auth)?).to_string())
    }
}

fn clojure_tools_tarball() -> Vec<u8> {
    let files: &[(&str, &[u8])] = &[
        ("clojure-tools/clojure", b"#!/bin/sh\ninstall_dir=PREFIX\n"),
        ("clojure-tools/clj", b"#!/bin/sh\nbin_dir=BINDIR\n"),
        ("clojure-tools/deps.edn", b"{:paths [\"src\"]}"),
        ("clojure-tools/example-deps.edn", b"{}"),
        ("clojure-tools/clojure-tools-1.11.1.1435.jar", b"PK"),
        ("clojure-tools/clojure.1", b".TH CLOJURE 1"),
    ];

    let mut bytes = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut bytes, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
    bytes
}

fn provisioner(
    temp: &TempDir,
    platform: Platform,
    downloader: MemoryDownloader,
) -> Provisioner<MemoryDownloader, DirectoryCache, ProcessRunner> {
    let options = ProvisionOptions {
        temp_root: Some(temp.path().join("temp")),
        tool_cache: Some(temp.path().join("toolcache")),
    };
    let cache = DirectoryCache::new(temp.path().join("toolcache"));
    Provisioner::new(downloader, cache, ProcessRunner, platform, &options)
}

fn linux() -> Platform {
    Platform::new(Os::Linux, Arch::X64)
}

#[cfg(unix)]
#[tokio::test]
async fn test_boot_script_runs_pinned_and_is_cached() {
    let temp = TempDir::new().unwrap();
    let provisioner = provisioner(
        &temp,
        linux(),
        MemoryDownloader::default().serving(BOOT_URL, FAKE_BOOT_SCRIPT),
    );
    let request = ProvisionRequest::new(VersionRequest::parse("2.8.3"))
        .with_auth(AuthToken::new("token abc"));

    let record = provisioner
        .provision(ToolKind::Boot, &request, |_| {})
        .await
        .unwrap();

    assert!(!record.from_cache);
    assert_eq!(
        record.root,
        temp.path().join("toolcache").join("Boot").join("2.8.3").join("x64")
    );
    let invocation =
        std::fs::read_to_string(record.root.join("cache").join("invocation")).unwrap();
    assert_eq!(invocation.trim(), "2.8.3 -V");
    assert!(record.root.join("bin").join("boot").is_file());
    assert_eq!(record.environment.var("BOOT_VERSION"), Some("2.8.3"));

    // Second call: served from cache, nothing downloaded
    let again = provisioner
        .provision(ToolKind::Boot, &request, |_| {})
        .await
        .unwrap();
    assert!(again.from_cache);
    assert_eq!(again.root, record.root);
}

#[cfg(unix)]
#[tokio::test]
async fn test_boot_latest_runs_unpinned() {
    let temp = TempDir::new().unwrap();
    let provisioner = provisioner(
        &temp,
        linux(),
        MemoryDownloader::default().serving(BOOT_URL, FAKE_BOOT_SCRIPT),
    );

    let record = provisioner
        .provision(
            ToolKind::Boot,
            &ProvisionRequest::new(VersionRequest::Latest),
            |_| {},
        )
        .await
        .unwrap();

    let invocation =
        std::fs::read_to_string(record.root.join("cache").join("invocation")).unwrap();
    assert_eq!(invocation.trim(), "unpinned -u");
    assert_eq!(record.environment.var("BOOT_VERSION"), None);
    assert_eq!(
        record.environment.var("BOOT_HOME"),
        Some(&*record.root.to_string_lossy())
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_boot_script_is_install_failure() {
    let temp = TempDir::new().unwrap();
    let provisioner = provisioner(
        &temp,
        linux(),
        MemoryDownloader::default().serving(BOOT_URL, "#!/bin/sh\necho no java >&2\nexit 2\n"),
    );

    let err = provisioner
        .provision(
            ToolKind::Boot,
            &ProvisionRequest::new(VersionRequest::parse("2.8.3")),
            |_| {},
        )
        .await
        .unwrap_err();

    match err {
        ProvisionError::InstallFailed {
            exit_code, stderr, ..
        } => {
            assert_eq!(exit_code, Some(2));
            assert_eq!(stderr.as_deref().map(str::trim), Some("no java"));
        }
        other => panic!("unexpected error {:?}", other),
    }

    let key = CacheKey::new(
        ToolKind::Boot,
        &VersionRequest::parse("2.8.3"),
        &linux(),
    );
    assert!(DirectoryCache::new(temp.path().join("toolcache"))
        .find(&key)
        .is_none());
}

#[tokio::test]
async fn test_clojure_cli_layout() {
    let temp = TempDir::new().unwrap();
    let provisioner = provisioner(
        &temp,
        linux(),
        MemoryDownloader::default().serving(CLI_URL, clojure_tools_tarball()),
    );

    let record = provisioner
        .provision(
            ToolKind::ClojureCli,
            &ProvisionRequest::new(VersionRequest::parse("1.11.1.1435")),
            |_| {},
        )
        .await
        .unwrap();

    let root = &record.root;
    assert_eq!(
        root,
        &temp
            .path()
            .join("toolcache")
            .join("ClojureToolsDeps")
            .join("1.11.1.1435")
            .join("x64")
    );

    // Launchers point at the cache entry they are run from
    let clojure = std::fs::read_to_string(root.join("bin").join("clojure")).unwrap();
    assert_eq!(
        clojure,
        format!(
            "#!/bin/sh\ninstall_dir={}\n",
            root.join("lib").join("clojure").display()
        )
    );
    let clj = std::fs::read_to_string(root.join("bin").join("clj")).unwrap();
    assert_eq!(
        clj,
        format!("#!/bin/sh\nbin_dir={}\n", root.join("bin").display())
    );

    assert!(root.join("lib/clojure/deps.edn").is_file());
    assert!(root.join("lib/clojure/example-deps.edn").is_file());
    assert!(root
        .join("lib/clojure/libexec/clojure-tools-1.11.1.1435.jar")
        .is_file());
    assert!(root.join("share/man/man1/clojure.1").is_file());

    assert_eq!(
        record.environment.path_entries().collect::<Vec<_>>(),
        vec![root.join("bin").as_path()]
    );
    assert_eq!(record.environment.changes().len(), 1);
}

#[tokio::test]
async fn test_clojure_cli_rejects_short_version_without_download() {
    let temp = TempDir::new().unwrap();
    let provisioner = provisioner(&temp, linux(), MemoryDownloader::default());

    let err = provisioner
        .provision(
            ToolKind::ClojureCli,
            &ProvisionRequest::new(VersionRequest::parse("1.2.3")),
            |_| {},
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::SourceUnresolved { .. }));
    assert!(!err.fix_suggestion().is_empty());
}

#[tokio::test]
async fn test_action_runs_each_requested_tool() {
    let temp = TempDir::new().unwrap();
    let downloader = MemoryDownloader::default().serving(CLI_URL, clojure_tools_tarball());
    let requested = downloader.requested.clone();
    let provisioner = provisioner(&temp, linux(), downloader);
    let inputs = ActionInputs {
        cli: Some("1.11.1.1435".to_string()),
        clj_kondo: Some("2024.03.13".to_string()),
        github_token: Some("abc".to_string()),
        ..Default::default()
    };

    let outcome = provision_all(&provisioner, &inputs).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].tool, ToolKind::ClojureCli);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, ToolKind::CljKondo);
    assert!(matches!(
        outcome.failures[0].1,
        ProvisionError::DownloadFailed { .. }
    ));

    let requested = requested.lock().unwrap();
    assert!(requested.contains(&(CLI_URL.to_string(), false)));
    assert!(requested.contains(&(
        "https://github.com/clj-kondo/clj-kondo/releases/download/v2024.03.13/clj-kondo-2024.03.13-linux-amd64.zip"
            .to_string(),
        true
    )));
}
