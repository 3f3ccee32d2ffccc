//! checkout command - Check out a tracked branch

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::types::BranchName;
use crate::engine::Context;

pub fn checkout(ctx: &Context, name: &str) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let branch = BranchName::new(name).context("invalid branch name")?;

    if !workspace.git.branch_exists(&branch) {
        bail!(GitFlowError::BranchNotFound(name.to_string()));
    }

    workspace.git.checkout(branch.as_str())?;

    if !ctx.quiet {
        println!("Switched to {name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_rejects_unknown_branch() {
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
        assert!(checkout(&ctx, "nope").is_err());
    }

    #[test]
    fn checkout_switches_branch() {
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
        let workspace = Workspace::open(&ctx).unwrap();
        workspace
            .git
            .create_branch(&BranchName::new("develop").unwrap(), "main")
            .unwrap();

        checkout(&ctx, "develop").unwrap();
        let current = workspace.git.current_branch().unwrap().unwrap();
        assert_eq!(current.as_str(), "develop");
    }
}
