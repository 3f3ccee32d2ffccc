//! publish command - Push a branch to the remote and start tracking it

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::types::BranchName;
use crate::engine::Context;

pub fn publish(ctx: &Context, name: &str) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let branch = BranchName::new(name).context("invalid branch name")?;

    if !workspace.git.branch_exists(&branch) {
        bail!(GitFlowError::BranchNotFound(name.to_string()));
    }

    let remote = workspace.default_remote()?;
    workspace.git.push_branch(&remote, &branch)?;
    workspace.git.set_config(&format!("branch.{name}.remote"), &remote)?;
    workspace
        .git
        .set_config(&format!("branch.{name}.merge"), &format!("refs/heads/{name}"))?;

    if !ctx.quiet {
        println!("Published {name} to {remote}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_rejects_unknown_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_oid = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();

        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        assert!(publish(&ctx, "feature/nope").is_err());
    }
}
