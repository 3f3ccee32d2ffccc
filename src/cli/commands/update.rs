//! update command - Merge or rebase a tracked base branch onto its parent

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::merge_state::MergeState;
use crate::core::ops::journal::Journal;
use crate::core::ops::lock;
use crate::core::topology::{BranchType, DownstreamStrategy};
use crate::core::types::BranchName;
use crate::engine::hooks::{self, FilterContext};
use crate::engine::update::{self, UpdateOutcome};
use crate::engine::Context;

fn resolve_branch_type<'a>(workspace: &'a Workspace, name: &str) -> Option<&'a BranchType> {
    for type_name in workspace.topology.names() {
        let bt = workspace.topology.get(type_name)?;
        if bt.name == name {
            return Some(bt);
        }
    }
    None
}

fn resolved_strategy(bt: &BranchType, merge_flag: bool, rebase_flag: bool) -> DownstreamStrategy {
    if merge_flag {
        DownstreamStrategy::Merge
    } else if rebase_flag {
        DownstreamStrategy::Rebase
    } else {
        bt.downstream_strategy
    }
}

pub fn update(ctx: &Context, name: Option<&str>, merge_flag: bool, rebase_flag: bool) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;

    if MergeState::is_in_progress(&workspace.common_dir) {
        bail!(GitFlowError::MergeInProgress);
    }

    let _lock = lock::RepoLock::acquire(&workspace.common_dir).map_err(GitFlowError::from)?;

    let branch_name = match name {
        Some(n) => n.to_string(),
        None => workspace
            .git
            .current_branch()?
            .context("not on any branch; specify a branch name")?
            .into_string(),
    };

    let bt = resolve_branch_type(&workspace, &branch_name)
        .ok_or_else(|| GitFlowError::InvalidBranchType(branch_name.clone()))?
        .clone();

    let parent = bt
        .parent
        .clone()
        .ok_or_else(|| GitFlowError::InvalidBranchType(format!("{branch_name} has no parent to update from")))?;

    let strategy = resolved_strategy(&bt, merge_flag, rebase_flag);
    if strategy == DownstreamStrategy::None {
        bail!("{branch_name} does not support downstream updates (configure --merge or --rebase)");
    }

    let branch = BranchName::new(branch_name.clone()).context("invalid branch name")?;
    if !workspace.git.branch_exists(&branch) {
        bail!(GitFlowError::BranchNotFound(branch_name));
    }

    let hooks_dir = workspace.hooks_dir()?;
    let filter_ctx = FilterContext {
        branch_type: bt.name.clone(),
        branch_name: branch_name.clone(),
        full_branch: branch_name.clone(),
        base_branch: parent.clone(),
        origin: workspace.default_remote().unwrap_or_default(),
        version: None,
        tag_message: None,
    };

    let mut journal = Journal::new(format!("{} update", bt.name));
    journal.record_checkpoint("strategy_resolved");
    journal.write(&workspace.common_dir).map_err(GitFlowError::from)?;

    let outcome = hooks::with_hooks(&hooks_dir, "update", &filter_ctx, || {
        update::apply_update(&workspace.git, &branch, &parent, strategy, None, ctx.no_verify)
    });

    match outcome {
        Ok(UpdateOutcome::Updated) => {
            journal.commit();
            let _ = journal.write(&workspace.common_dir);
            if !ctx.quiet {
                println!("Updated {branch_name} from {parent}");
            }
            Ok(())
        }
        Ok(UpdateOutcome::AlreadyUpToDate) => {
            journal.commit();
            let _ = journal.write(&workspace.common_dir);
            if !ctx.quiet {
                println!("{branch_name} is already up to date with {parent}");
            }
            Ok(())
        }
        Err(hooks::HookError::HookFailed(msg)) if msg.contains("unresolved conflicts") => {
            journal.record_conflict_paused(branch_name.clone(), "update");
            let _ = journal.write(&workspace.common_dir);
            if !ctx.quiet {
                let verb = if strategy == DownstreamStrategy::Rebase { "rebase" } else { "merge" };
                println!(
                    "Update of {branch_name} left unresolved conflicts. Resolve them, then `git {verb} --continue` (or `--abort`)."
                );
            }
            bail!(GitFlowError::UnresolvedConflicts)
        }
        Err(e) => {
            journal.rollback();
            let _ = journal.write(&workspace.common_dir);
            Err(GitFlowError::from(e).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_oid = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
        dir
    }

    #[test]
    fn update_rejects_branch_with_no_parent() {
        let dir = init_repo();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        let result = update(&ctx, Some("main"), false, false);
        assert!(result.is_err());
    }

    #[test]
    fn update_merges_parent_into_develop() {
        let dir = init_repo();
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

        // Advance main so develop has something to merge.
        workspace.git.checkout("main").unwrap();
        std::fs::write(dir.path().join("a.txt"), "hi").unwrap();
        let repo = git2::Repository::open(dir.path()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(std::path::Path::new("a.txt")).unwrap();
        index.write().unwrap();
        let tree_oid = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        let parent = repo.head().unwrap().peel_to_commit().unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "add a", &tree, &[&parent]).unwrap();

        update(&ctx, Some("develop"), true, false).unwrap();
    }
}
