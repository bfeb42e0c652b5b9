//! clj-provision - set up Clojure tooling on CI runners
//!
//! Reads the action inputs from `INPUT_*` variables (or flags), provisions
//! every requested tool and publishes the environment for later steps.

use clap::{ArgAction, Parser};
use clj_provision::{ActionInputs, Platform, ProvisionOptions, Provisioner};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Provision Leiningen, Boot, the Clojure CLI, Babashka and clj-kondo
#[derive(Parser, Debug)]
#[command(name = "clj-provision")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Leiningen version
    #[arg(long, env = "INPUT_LEIN")]
    lein: Option<String>,

    /// Boot version
    #[arg(long, env = "INPUT_BOOT")]
    boot: Option<String>,

    /// Clojure CLI version
    #[arg(long, env = "INPUT_CLI")]
    cli: Option<String>,

    /// Clojure CLI version (deprecated, use --cli)
    #[arg(long, env = "INPUT_TOOLS-DEPS", hide = true)]
    tools_deps: Option<String>,

    /// Babashka version
    #[arg(long, env = "INPUT_BB")]
    bb: Option<String>,

    /// clj-kondo version
    #[arg(long, env = "INPUT_CLJ-KONDO")]
    clj_kondo: Option<String>,

    /// Token for GitHub release downloads
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Directory for downloads and working directories
    #[arg(long, env = "RUNNER_TEMP")]
    temp_dir: Option<PathBuf>,

    /// Tool cache directory
    #[arg(long, env = "RUNNER_TOOL_CACHE")]
    tool_cache: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn inputs(&self) -> ActionInputs {
        ActionInputs {
            lein: self.lein.clone(),
            boot: self.boot.clone(),
            cli: self.cli.clone(),
            tools_deps: self.tools_deps.clone(),
            bb: self.bb.clone(),
            clj_kondo: self.clj_kondo.clone(),
            github_token: self.github_token.clone(),
        }
    }

    fn options(&self) -> ProvisionOptions {
        ProvisionOptions {
            temp_root: self.temp_dir.clone().filter(|p| !p.as_os_str().is_empty()),
            tool_cache: self.tool_cache.clone().filter(|p| !p.as_os_str().is_empty()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG overrides
    let default_filter = match cli.verbose {
        0 => "clj_provision=warn",
        1 => "clj_provision=info",
        _ => "clj_provision=debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let platform = Platform::current();
    let options = cli.options();
    debug!(?platform, ?options, "Starting");

    let provisioner = Provisioner::with_defaults(platform, &options);
    match clj_provision::run(&provisioner, &cli.inputs()).await {
        Ok(records) => {
            for record in records {
                println!(
                    "{} {} ready at {}",
                    record.tool.display_name(),
                    record.version,
                    record.root.display()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("::error::{e}");
            debug!(fix = e.fix_suggestion(), "Provisioning failed");
            ExitCode::FAILURE
        }
    }
}
