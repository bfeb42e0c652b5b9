//! Bootstrap-script installation.
//!
//! The downloaded script is placed at `<dest>/<dir>/bin/<script>`, made
//! executable and run once. Running it materializes the real installation
//! under `<dest>/<dir>`, which becomes the install root.

use crate::tools::BootstrapPlan;
use crate::{ProvisionError, ToolKind, VersionRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Variables forwarded from the provisioning process to bootstrap scripts.
const INHERITED_VARS: &[&str] = &["PATH", "JAVA_CMD"];

/// A fully specified script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments to pass.
    pub args: Vec<String>,
    /// Working directory.
    pub cwd: PathBuf,
    /// The complete environment; nothing else is inherited.
    pub env: Vec<(String, String)>,
}

impl ScriptCommand {
    /// Value of `name` in the command's environment.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs bootstrap commands to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` and wait for it to exit.
    async fn run(&self, command: &ScriptCommand) -> std::io::Result<CommandOutput>;
}

/// [`CommandRunner`] spawning real processes with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ScriptCommand) -> std::io::Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .env_clear()
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Build the invocation for a placed script.
///
/// The environment holds the home variable, the version pin (pinned
/// requests only) and whichever of `PATH` / `JAVA_CMD` `inherited` yields.
pub(crate) fn build_command<F>(
    plan: &BootstrapPlan,
    root: &Path,
    version: &VersionRequest,
    inherited: F,
) -> ScriptCommand
where
    F: Fn(&str) -> Option<String>,
{
    let bin_dir = root.join("bin");
    let script = bin_dir.join(plan.script_name);

    let mut env = vec![(plan.home_var.to_string(), root.to_string_lossy().to_string())];
    if let (Some(var), Some(pinned)) = (plan.version_var, version.pinned()) {
        env.push((var.to_string(), pinned.to_string()));
    }
    for name in INHERITED_VARS {
        if let Some(value) = inherited(name).filter(|v| !v.is_empty()) {
            env.push((name.to_string(), value));
        }
    }

    let script_args = if version.is_latest() {
        plan.latest_args
    } else {
        plan.pinned_args
    };

    let (program, mut args) = match plan.launcher.split_first() {
        Some((launcher, launcher_args)) => {
            let mut args: Vec<String> = launcher_args.iter().map(|a| a.to_string()).collect();
            args.push(script.to_string_lossy().to_string());
            (PathBuf::from(launcher), args)
        }
        None => (script, Vec::new()),
    };
    args.extend(script_args.iter().map(|a| a.to_string()));

    ScriptCommand {
        program,
        args,
        cwd: bin_dir,
        env,
    }
}

/// Install a tool from its bootstrap script.
///
/// Fails with "Not a file" before anything is placed when `artifact` is not
/// a regular file.
pub(crate) async fn install<R, F>(
    tool: ToolKind,
    plan: &BootstrapPlan,
    artifact: &Path,
    dest: &Path,
    version: &VersionRequest,
    runner: &R,
    inherited: F,
) -> Result<PathBuf, ProvisionError>
where
    R: CommandRunner + ?Sized,
    F: Fn(&str) -> Option<String>,
{
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| ProvisionError::install(tool, format!("cannot create {}: {e}", dest.display())))?;

    let is_file = tokio::fs::metadata(artifact)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(ProvisionError::install(tool, "Not a file"));
    }

    let root = dest.join(plan.dir_name);
    let bin_dir = root.join("bin");
    let script = bin_dir.join(plan.script_name);

    tokio::fs::create_dir_all(&bin_dir)
        .await
        .map_err(|e| ProvisionError::install(tool, format!("cannot create {}: {e}", bin_dir.display())))?;
    move_file(artifact, &script)
        .await
        .map_err(|e| ProvisionError::install(tool, format!("cannot place script: {e}")))?;
    make_executable(&script)
        .await
        .map_err(|e| ProvisionError::install(tool, format!("cannot mark script executable: {e}")))?;

    let command = build_command(plan, &root, version, inherited);
    info!(tool = %tool, version = %version, "Running bootstrap script");
    debug!(program = %command.program.display(), args = ?command.args, "Bootstrap command");

    let output = runner.run(&command).await.map_err(|e| {
        ProvisionError::install(tool, format!("cannot run {}: {e}", command.program.display()))
    })?;

    if !output.success() {
        return Err(ProvisionError::InstallFailed {
            tool,
            message: format!("bootstrap script exited with code {:?}", output.exit_code),
            exit_code: output.exit_code,
            stderr: Some(output.stderr),
            fix: "See the bootstrap output above; check the version exists and Java is available"
                .to_string(),
        });
    }

    Ok(root)
}

/// Rename, falling back to copy-and-remove across filesystems.
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
