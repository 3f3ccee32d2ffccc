//! rename command - Rename a branch

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::types::BranchName;
use crate::engine::Context;

pub fn rename(ctx: &Context, old: &str, new: &str) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let old_branch = BranchName::new(old).context("invalid branch name")?;
    let new_branch = BranchName::new(new).context("invalid branch name")?;

    if !workspace.git.branch_exists(&old_branch) {
        bail!(GitFlowError::BranchNotFound(old.to_string()));
    }
    if workspace.git.branch_exists(&new_branch) {
        bail!(GitFlowError::BranchExists(new.to_string()));
    }

    workspace.git.rename_branch(&old_branch, &new_branch)?;

    if !ctx.quiet {
        println!("Renamed {old} to {new}");
    }
    Ok(())
}
