//! delete command - Delete a topic branch and its remote counterpart

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::types::BranchName;
use crate::engine::Context;

/// The parent branch name for a topic branch, resolved by matching its
/// type's prefix (falls back to `None` for base branches or unknown prefixes).
fn parent_of(workspace: &Workspace, name: &str) -> Option<String> {
    for type_name in workspace.topology.names() {
        let bt = workspace.topology.get(type_name)?;
        let matches = match &bt.prefix {
            Some(prefix) => name.starts_with(prefix.as_str()),
            None => bt.name == name,
        };
        if matches {
            return bt.parent.clone();
        }
    }
    None
}

pub fn delete(ctx: &Context, name: &str, force: bool, keepremote: bool) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let branch = BranchName::new(name).context("invalid branch name")?;

    if !workspace.git.branch_exists(&branch) {
        bail!(GitFlowError::BranchNotFound(name.to_string()));
    }

    if !force {
        if let Some(parent) = parent_of(&workspace, name) {
            if workspace.git.branch_exists(&BranchName::new(parent.clone())?) {
                let branch_oid = workspace.git.resolve_ref(name)?;
                let parent_oid = workspace.git.resolve_ref(&parent)?;
                let merged = workspace.git.is_ancestor(&branch_oid, &parent_oid)?;
                if !merged {
                    bail!(GitFlowError::BranchHasDependents(format!(
                        "{name} is not fully merged into {parent}; use --force to delete anyway"
                    )));
                }
            }
        }
    }

    workspace.git.delete_branch(&branch, force)?;

    if !keepremote {
        let remote = workspace.default_remote()?;
        if workspace.git.remote_branch_exists(&remote, &branch) {
            workspace.git.delete_remote_branch(&remote, &branch)?;
        }
    }

    if !ctx.quiet {
        println!("Deleted {name}");
    }
    Ok(())
}
