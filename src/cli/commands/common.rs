//! cli::commands::common
//!
//! Shared setup used by nearly every command handler: open the repository,
//! load the config store and topology, and resolve the default remote.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::config::ConfigStore;
use crate::core::error::GitFlowError;
use crate::core::topology::Topology;
use crate::engine::Context;
use crate::git::Git;

/// Everything a command handler needs to act on the current repository.
pub struct Workspace {
    /// The Git driver, opened at the resolved working directory.
    pub git: Git,
    /// The config store backing `gitflow.*` keys.
    pub config: ConfigStore,
    /// The branch-type topology, loaded from config.
    pub topology: Topology,
    /// The main worktree's working directory.
    pub repo_root: PathBuf,
    /// The repository's common `.git` directory (shared across worktrees).
    pub common_dir: PathBuf,
}

impl Workspace {
    /// Open the repository at `ctx.cwd` (or the current directory), and load
    /// its config and topology. Does not require `gitflow init` to have run.
    pub fn open(ctx: &Context) -> Result<Self> {
        let cwd = ctx
            .cwd
            .clone()
            .unwrap_or_else(|| std::env::current_dir().expect("current directory must exist"));
        let git = Git::open(&cwd).context("failed to open git repository")?;
        let common_dir = git.get_git_common_dir();
        let repo_root = git.info().context("repository has no working directory")?.work_dir;
        let config = ConfigStore::new(&common_dir);
        let topology = config.load_topology().context("failed to load branch topology")?;

        Ok(Self {
            git,
            config,
            topology,
            repo_root,
            common_dir,
        })
    }

    /// Open the repository and require that `gitflow init` has already run.
    pub fn open_initialized(ctx: &Context) -> Result<Self> {
        let workspace = Self::open(ctx)?;
        let (initialized, _scope) = workspace.config.is_initialized()?;
        if !initialized {
            return Err(GitFlowError::NotInitialized.into());
        }
        Ok(workspace)
    }

    /// The default remote name, falling back to `"origin"` if none is configured.
    pub fn default_remote(&self) -> Result<String> {
        Ok(self.git.default_remote()?.unwrap_or_else(|| "origin".to_string()))
    }

    /// Resolve the hooks directory for this repository.
    pub fn hooks_dir(&self) -> Result<PathBuf> {
        Ok(crate::core::config::resolve_hooks_dir(
            &self.config,
            &self.repo_root,
            &self.common_dir,
        )?)
    }
}
