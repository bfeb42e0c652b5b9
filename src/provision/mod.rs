//! Provisioning flows for Clojure tooling.
//!
//! This module provides the [`Provisioner`] that runs one tool's flow
//! (cache lookup, download, install, cache store, environment publish), the
//! [`ProvisionStage`] progress callback type and the [`ProvisionError`]
//! taxonomy.
//!
//! # Example
//!
//! ```rust,no_run
//! use clj_provision::{
//!     Platform, ProvisionOptions, ProvisionRequest, ProvisionStage, Provisioner, ToolKind,
//!     VersionRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let provisioner = Provisioner::with_defaults(Platform::current(), &ProvisionOptions::default());
//!     let request = ProvisionRequest::new(VersionRequest::parse("latest"));
//!
//!     let record = provisioner
//!         .provision(ToolKind::Babashka, &request, |stage: ProvisionStage| {
//!             println!("{}", stage.description());
//!         })
//!         .await;
//!
//!     if let Ok(record) = record {
//!         for dir in record.environment.path_entries() {
//!             println!("PATH += {}", dir.display());
//!         }
//!     }
//! }
//! ```

mod engine;
mod errors;
mod progress;

pub use engine::{InstallationRecord, ProvisionRequest, Provisioner};
pub use errors::ProvisionError;
pub use progress::ProvisionStage;
