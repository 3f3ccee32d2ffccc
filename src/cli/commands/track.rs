//! track command - Start tracking an existing remote branch locally

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::types::BranchName;
use crate::engine::Context;

/// Point a local branch's upstream at `remote`, creating the local branch
/// from `<remote>/<name>` if it doesn't already exist.
pub fn track(ctx: &Context, name: &str, remote: Option<&str>) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let remote = match remote {
        Some(r) => r.to_string(),
        None => workspace.default_remote()?,
    };

    let branch = BranchName::new(name).context("invalid branch name")?;
    if !workspace.git.remote_branch_exists(&remote, &branch) {
        bail!(GitFlowError::RemoteBranchNotFound(name.to_string()));
    }

    if !workspace.git.branch_exists(&branch) {
        let start_point = format!("{remote}/{name}");
        workspace.git.create_branch(&branch, &start_point)?;
    }

    workspace.git.set_config(&format!("branch.{name}.remote"), &remote)?;
    workspace
        .git
        .set_config(&format!("branch.{name}.merge"), &format!("refs/heads/{name}"))?;

    if !ctx.quiet {
        println!("Now tracking {name} from {remote}");
    }
    Ok(())
}
