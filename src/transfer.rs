// transfer module: plan assembly and the single rsync invocation
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::config::{Config, ensure_slash};
use crate::error::DeployError;
use crate::parse::{render_command, shell_quote, split_args_preserve_quotes};

pub const DEFAULT_PROGRAM: &str = "rsync";
pub const DEFAULT_INSTALL_COMMAND: &str =
    "sudo apt-get update && sudo apt-get --no-install-recommends install -y rsync";

/// Everything one rsync run needs. Built once from a resolved [`Config`].
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// Local directory, always with a trailing slash so rsync copies its contents.
    pub source: String,
    /// `user@host:/remote/path/`
    pub destination: String,
    /// Tokenized user flags.
    pub args: Vec<String>,
    pub excludes: Vec<String>,
    pub identity_file: PathBuf,
    pub port: String,
}

/// `<workspace>/<source>/`
pub fn local_source(workspace: &Path, source: &str) -> String {
    let rel = source.strip_prefix("./").unwrap_or(source);
    let rel = if rel == "." { "" } else { rel };
    ensure_slash(&workspace.join(rel).to_string_lossy())
}

impl TransferPlan {
    pub fn new(
        cfg: &Config,
        workspace: &Path,
        identity_file: PathBuf,
        excludes: Vec<String>,
    ) -> Self {
        TransferPlan {
            source: local_source(workspace, &cfg.source),
            destination: cfg.destination(),
            args: split_args_preserve_quotes(&cfg.rsync_args),
            excludes,
            identity_file,
            port: cfg.port.clone(),
        }
    }

    /// Remote shell handed to rsync via `--rsh`. Host keys are not verified:
    /// the target is never pre-registered in known_hosts on a fresh runner.
    pub fn ssh_command(&self) -> String {
        format!(
            "ssh -p {} -i {} -o StrictHostKeyChecking=no",
            shell_quote(&self.port),
            shell_quote(&self.identity_file.to_string_lossy())
        )
    }

    /// Full rsync argv (without the program name).
    ///
    /// Merged excludes come first: rsync applies the first matching rule, so
    /// they win over any `--exclude`/`--include` in the user flags.
    pub fn command_args(&self) -> Vec<String> {
        let mut out: Vec<String> =
            self.excludes.iter().map(|p| format!("--exclude={}", p)).collect();
        out.push("--recursive".to_string());
        out.extend(self.args.iter().cloned());
        out.push("--rsh".to_string());
        out.push(self.ssh_command());
        out.push(self.source.clone());
        out.push(self.destination.clone());
        out
    }

    pub fn command_line(&self, program: &str) -> String {
        render_command(program, &self.command_args())
    }
}

/// Result of running the transfer tool once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { stdout: String },
    Failure { message: String, stderr: String, command: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn into_result(self) -> Result<String, DeployError> {
        match self {
            Outcome::Success { stdout } => Ok(stdout),
            Outcome::Failure { message, stderr, command } => {
                Err(DeployError::TransferFailed { message, stderr, command })
            }
        }
    }
}

/// Locates, installs if needed, and runs the transfer tool.
#[derive(Debug, Clone)]
pub struct Executor {
    program: String,
    install_command: Option<String>,
}

impl Default for Executor {
    fn default() -> Self {
        Executor {
            program: DEFAULT_PROGRAM.to_string(),
            install_command: Some(DEFAULT_INSTALL_COMMAND.to_string()),
        }
    }
}

impl Executor {
    /// `install_command` runs through `sh -c` when `program` is not found;
    /// `None` means a missing tool fails straight away.
    pub fn new(program: impl Into<String>, install_command: Option<String>) -> Self {
        Executor { program: program.into(), install_command }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn ensure_available(&self) -> Result<(), DeployError> {
        if which::which(&self.program).is_ok() {
            return Ok(());
        }
        let Some(install) = self.install_command.as_deref() else {
            return Err(DeployError::ToolUnavailable(format!("{} not found", self.program)));
        };
        tracing::warn!("[deploy] {} not found, installing: {}", self.program, install);
        let status = Command::new("sh")
            .arg("-c")
            .arg(install)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| DeployError::ToolUnavailable(e.to_string()))?;
        if !status.success() {
            return Err(DeployError::ToolUnavailable(format!("`{}` {}", install, status)));
        }
        which::which(&self.program).map(|_| ()).map_err(|_| {
            DeployError::ToolUnavailable(format!("{} still not found after install", self.program))
        })
    }

    /// Run the plan once. No retry and no timeout.
    pub fn execute(&self, plan: &TransferPlan) -> Outcome {
        let args = plan.command_args();
        let command = render_command(&self.program, &args);
        tracing::debug!("[rsync] {}", command);

        let output = match Command::new(&self.program).args(&args).stdin(Stdio::null()).output() {
            Ok(o) => o,
            Err(e) => {
                return Outcome::Failure {
                    message: format!("failed to start {}: {}", self.program, e),
                    stderr: String::new(),
                    command,
                };
            }
        };
        if output.status.success() {
            Outcome::Success { stdout: String::from_utf8_lossy(&output.stdout).into_owned() }
        } else {
            Outcome::Failure {
                message: format!("{} {}", self.program, output.status),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                command,
            }
        }
    }
}
