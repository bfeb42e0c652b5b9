//! # clj-provision
//!
//! Provisioning of Clojure tooling (Leiningen, Boot, the Clojure CLI,
//! Babashka, clj-kondo) onto CI runners.
//!
//! Each requested tool runs one provisioning flow: a pinned version already
//! in the runner's tool cache is reused; anything else is resolved,
//! downloaded, installed and stored in the cache. Every flow ends with an
//! [`EnvironmentChanges`] value describing the `PATH` entries and variables
//! later pipeline steps need.
//!
//! ## Features
//!
//! - `ToolKind` enum identifying supported tools
//! - `Provisioner` running one tool's flow with progress reporting
//! - `Downloader`, `ToolCache` and `CommandRunner` traits for the
//!   network, the tool cache and process execution
//! - `run()` provisioning every tool requested by the action inputs
//!
//! ## Example
//!
//! ```rust,no_run
//! use clj_provision::{ActionInputs, Platform, ProvisionOptions, Provisioner, run};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let provisioner = Provisioner::with_defaults(Platform::current(), &ProvisionOptions::default());
//!     let inputs = ActionInputs {
//!         cli: Some("1.11.1.1435".to_string()),
//!         bb: Some("latest".to_string()),
//!         ..Default::default()
//!     };
//!
//!     match run(&provisioner, &inputs).await {
//!         Ok(records) => {
//!             for record in records {
//!                 println!("{} at {}", record.tool.display_name(), record.root.display());
//!             }
//!         }
//!         Err(e) => println!("::error::{}", e),
//!     }
//! }
//! ```

mod action;
mod cache;
mod download;
mod environment;
mod install;
mod options;
mod platform;
mod provision;
mod source;
mod tool_kind;
mod tools;
mod version;

pub use action::{provision_all, run, ActionError, ActionInputs, ActionOutcome};
pub use cache::{CacheError, CacheKey, DirectoryCache, ToolCache, RUNNER_TOOL_CACHE_VAR};
pub use download::{AuthToken, DownloadError, Downloader, HttpDownloader};
pub use environment::{EnvChange, EnvironmentChanges, GITHUB_ENV_VAR, GITHUB_PATH_VAR};
pub use install::{CommandOutput, CommandRunner, ProcessRunner, ScriptCommand};
pub use options::ProvisionOptions;
pub use platform::{Arch, Os, Platform, RUNNER_TEMP_VAR};
pub use provision::{
    InstallationRecord, ProvisionError, ProvisionRequest, ProvisionStage, Provisioner,
};
pub use source::{DownloadSpec, ReleaseAsset};
pub use tool_kind::ToolKind;
pub use tools::ArchiveFormat;
pub use version::{normalize, VersionRequest, LATEST};
