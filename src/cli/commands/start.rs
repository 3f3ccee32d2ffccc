//! start command - Create a new topic branch of a given type

use anyhow::{bail, Context as _, Result};

use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::ops::journal::Journal;
use crate::core::ops::lock;
use crate::core::resolver;
use crate::core::types::BranchName;
use crate::engine::hooks::{self, FilterContext};
use crate::engine::Context;

/// Create a new topic branch of `branch_type` named `name`.
pub fn start(
    ctx: &Context,
    branch_type: &str,
    name: &str,
    start_point_override: Option<&str>,
    fetch_flag: Option<bool>,
) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let bt = workspace
        .topology
        .get(branch_type)
        .ok_or_else(|| GitFlowError::InvalidBranchType(branch_type.to_string()))?;

    let prefix = bt.prefix.clone().unwrap_or_default();

    let start_point = start_point_override
        .map(str::to_string)
        .or_else(|| bt.effective_start_point().map(str::to_string))
        .ok_or_else(|| GitFlowError::InvalidBranchType(format!("{branch_type} has no start point")))?;

    let should_fetch =
        resolver::resolve_should_fetch(branch_type, &workspace.config, "start", fetch_flag)?;
    if should_fetch {
        let remote = workspace.default_remote()?;
        let _ = workspace.git.fetch(&remote);
    }

    if !workspace.git.ref_or_commit_exists(&start_point) {
        bail!("start point '{start_point}' does not exist");
    }

    let hooks_dir = workspace.hooks_dir()?;
    let origin = workspace.default_remote().unwrap_or_default();

    // The branch-name filter may rewrite the short name before it's used
    // anywhere, so every name-exists check runs against its final value.
    let name_filter_ctx = FilterContext {
        branch_type: branch_type.to_string(),
        branch_name: name.to_string(),
        full_branch: format!("{prefix}{name}"),
        base_branch: start_point.clone(),
        origin: origin.clone(),
        version: None,
        tag_message: None,
    };
    let name = hooks::run_filter(&hooks_dir, "start", "name", &name_filter_ctx, &[], name)
        .map_err(GitFlowError::from)?;

    let full_name = format!("{prefix}{name}");
    let branch = BranchName::new(full_name.clone()).context("invalid branch name")?;

    if workspace.git.branch_exists(&branch) {
        bail!(GitFlowError::BranchExists(full_name));
    }

    let filter_ctx = FilterContext {
        branch_type: branch_type.to_string(),
        branch_name: name.clone(),
        full_branch: full_name.clone(),
        base_branch: start_point.clone(),
        origin,
        version: None,
        tag_message: None,
    };

    let _lock = lock::RepoLock::acquire(&workspace.common_dir).map_err(GitFlowError::from)?;
    let mut journal = Journal::new(format!("{branch_type} start"));
    journal.record_checkpoint("name_resolved");
    journal.write(&workspace.common_dir).map_err(GitFlowError::from)?;

    let result = hooks::with_hooks(&hooks_dir, "start", &filter_ctx, || -> Result<()> {
        workspace.git.create_branch(&branch, &start_point)?;
        workspace.git.checkout(branch.as_str())?;
        Ok(())
    });

    match &result {
        Ok(()) => journal.commit(),
        Err(_) => journal.rollback(),
    }
    let _ = journal.write(&workspace.common_dir);
    result.map_err(GitFlowError::from)?;

    if !ctx.quiet {
        println!("Created {full_name} from {start_point}");
    }

    Ok(())
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
        repo.branch("main", &repo.head().unwrap().peel_to_commit().unwrap(), false).unwrap();
        repo.branch("develop", &repo.head().unwrap().peel_to_commit().unwrap(), false).unwrap();
        dir
    }

    #[test]
    fn start_unknown_branch_type_errors() {
        let dir = init_repo();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        let result = start(&ctx, "nonexistent", "x", None, Some(false));
        assert!(result.is_err());
    }

    #[test]
    fn start_creates_branch_from_parent() {
        let dir = init_repo();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        start(&ctx, "feature", "login", None, Some(false)).unwrap();

        let workspace = Workspace::open(&ctx).unwrap();
        assert!(workspace
            .git
            .branch_exists(&BranchName::new("feature/login").unwrap()));
    }

    #[test]
    fn start_refuses_existing_branch() {
        let dir = init_repo();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        start(&ctx, "feature", "login", None, Some(false)).unwrap();
        assert!(start(&ctx, "feature", "login", None, Some(false)).is_err());
    }
}
