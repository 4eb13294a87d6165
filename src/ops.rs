use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{self, ConfigSource};
use crate::error::DeployError;
use crate::excludes;
use crate::ssh;
use crate::transfer::{Executor, Outcome, TransferPlan};

/// Local directories a deploy run is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployEnv {
    /// Base for SOURCE and a relative EXCLUDE_FILE.
    pub workspace: PathBuf,
    /// Home directory holding `.ssh`; `None` if it cannot be determined.
    pub home: Option<PathBuf>,
}

fn non_empty<S: ConfigSource + ?Sized>(source: &S, key: &str) -> Option<String> {
    source.lookup(key).filter(|v| !v.is_empty())
}

impl DeployEnv {
    pub fn new(workspace: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        DeployEnv { workspace: workspace.into(), home: Some(home.into()) }
    }

    /// Workspace: `workspace` if given, else `GITHUB_WORKSPACE`, else the
    /// current directory. Home: `HOME`, else the platform home directory.
    pub fn detect<S: ConfigSource + ?Sized>(
        source: &S,
        workspace: Option<PathBuf>,
    ) -> Result<Self> {
        let workspace =
            workspace.or_else(|| non_empty(source, "GITHUB_WORKSPACE").map(PathBuf::from));
        let workspace = match workspace {
            Some(w) => w,
            None => std::env::current_dir().context("cannot determine the current directory")?,
        };
        let home = non_empty(source, "HOME").map(PathBuf::from).or_else(dirs::home_dir);
        Ok(DeployEnv { workspace, home })
    }

    fn home(&self) -> Result<&Path, DeployError> {
        self.home.as_deref().ok_or(DeployError::NoHomeDir)
    }
}

/// Whether [`prepare`] writes the identity file or only computes its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    Write,
    PathOnly,
}

/// Resolve inputs, merge exclusions, provision the key and build the plan.
/// Inputs are validated before anything touches the filesystem.
pub fn prepare<S: ConfigSource + ?Sized>(
    source: &S,
    env: &DeployEnv,
    key_mode: KeyMode,
) -> Result<TransferPlan> {
    let cfg = config::resolve(source)?;
    let home = env.home()?;
    let excludes = excludes::collect(&env.workspace, &cfg)?;
    let identity = match key_mode {
        KeyMode::Write => ssh::provision(home, &cfg.private_key, &cfg.key_name)?,
        KeyMode::PathOnly => ssh::key_path(home, &cfg.key_name),
    };
    let plan = TransferPlan::new(&cfg, &env.workspace, identity, excludes);

    tracing::info!("[deploy] Source → {}", plan.source);
    tracing::info!("[deploy] Dest → {}", plan.destination);
    tracing::info!("[deploy] Rsync → {}", cfg.rsync_args);
    tracing::info!("[deploy] Excludes → {}", plan.excludes.len());
    Ok(plan)
}

/// Make sure rsync is installed, then run the plan exactly once.
///
/// Only tool lookup/install problems are returned as `Err`; a failed transfer
/// comes back as [`Outcome::Failure`] so the caller decides how to die.
pub fn deploy(plan: &TransferPlan, executor: &Executor) -> Result<Outcome> {
    executor.ensure_available()?;
    let outcome = executor.execute(plan);
    match &outcome {
        Outcome::Success { stdout } => {
            for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
                tracing::info!("{}", line);
            }
        }
        Outcome::Failure { message, .. } => tracing::error!("[rsync] {}", message),
    }
    Ok(outcome)
}
