//! finish command - Merge a topic branch back into its parent, tag, and clean up

use std::collections::BTreeMap;

use anyhow::{bail, Context as _, Result};

use crate::cli::args::StrategyArgs;
use crate::cli::commands::common::Workspace;
use crate::core::error::GitFlowError;
use crate::core::merge_state::{Action, FinishStep, MergeState};
use crate::core::ops::journal::Journal;
use crate::core::ops::lock;
use crate::core::resolver::{self, InvocationFlags, StrategyFlags};
use crate::core::types::BranchName;
use crate::engine::finish as finish_engine;
use crate::engine::hooks::{self, FilterContext};
use crate::engine::Context;

/// All flags `finish` accepts, already converted into their `Option`/bool shape.
#[allow(clippy::too_many_arguments)]
pub struct FinishArgs<'a> {
    pub branch_type: Option<&'a str>,
    pub name: Option<&'a str>,
    pub continue_: bool,
    pub abort: bool,
    pub strategy: &'a StrategyArgs,
    pub no_ff: bool,
    pub ff: bool,
    pub tag: bool,
    pub notag: bool,
    pub tagname: Option<&'a str>,
    pub message: Option<&'a str>,
    pub message_file: Option<&'a std::path::Path>,
    pub sign: bool,
    pub signingkey: Option<&'a str>,
    pub keep: bool,
    pub keeplocal: bool,
    pub keepremote: bool,
    pub force_delete: bool,
    pub fetch: bool,
    pub no_fetch: bool,
}

fn strategy_flags(args: &StrategyArgs) -> StrategyFlags {
    StrategyFlags {
        squash: args.squash,
        no_squash: args.no_squash,
        rebase: args.rebase,
        no_rebase: args.no_rebase,
        preserve_merges: args.preserve_merges,
    }
}

fn optional_flag(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

pub fn finish(ctx: &Context, args: FinishArgs) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let common_dir = workspace.common_dir.clone();

    if args.continue_ {
        if args.abort {
            bail!("--continue and --abort are mutually exclusive");
        }
        return run_continue(&workspace, ctx);
    }
    if args.abort {
        return run_abort(&workspace, ctx);
    }

    if MergeState::is_in_progress(&common_dir) {
        bail!(GitFlowError::MergeInProgress);
    }

    let _lock = lock::RepoLock::acquire(&common_dir).map_err(GitFlowError::from)?;

    let (branch_type, short_name) = resolve_target(&workspace, args.branch_type, args.name)?;
    let bt = workspace
        .topology
        .require(&branch_type)
        .map_err(GitFlowError::from)?
        .clone();

    let flags = InvocationFlags {
        strategy: strategy_flags(args.strategy),
        no_ff: args.no_ff,
        ff: args.ff,
        tag: optional_flag(args.tag, args.notag),
        tag_name: args.tagname.map(str::to_string),
        message: args.message.map(str::to_string),
        message_file: args.message_file.map(std::path::PathBuf::from),
        sign: args.sign,
        signing_key: args.signingkey.map(str::to_string),
        keep: args.keep,
        keep_local: args.keeplocal,
        keep_remote: args.keepremote,
        force_delete: args.force_delete,
        fetch: optional_flag(args.fetch, args.no_fetch),
        no_verify: ctx.no_verify,
        force: ctx.force,
    };

    let plan = resolver::resolve_finish_plan(
        &workspace.topology,
        &branch_type,
        &short_name,
        &workspace.config,
        &flags,
    )
    .map_err(GitFlowError::from)?;

    let branch = BranchName::new(plan.full_branch_name.clone()).context("invalid branch name")?;
    if !workspace.git.branch_exists(&branch) {
        bail!(GitFlowError::BranchNotFound(plan.full_branch_name.clone()));
    }

    let remote = workspace.default_remote()?;
    if plan.should_fetch {
        let _ = workspace.git.fetch(&remote);
    }

    let (status, count) = workspace.git.compare_with_remote(&branch)?;
    resolver::check_remote_sync_gate(&short_name, status, count, &remote, ctx.force)
        .map_err(GitFlowError::from)?;

    let (child_branches, child_strategies) = collect_children(&workspace, &branch_type);

    let hooks_dir = workspace.hooks_dir()?;
    let origin = remote.clone();
    let tag_message = if plan.should_tag {
        let tag_filter_ctx = FilterContext {
            branch_type: branch_type.clone(),
            branch_name: short_name.clone(),
            full_branch: plan.full_branch_name.clone(),
            base_branch: plan.parent_branch.clone(),
            origin: origin.clone(),
            version: Some(plan.tag_name.clone()),
            tag_message: Some(plan.tag_message.clone()),
        };
        hooks::run_filter(
            &hooks_dir,
            "finish",
            "tagmessage",
            &tag_filter_ctx,
            &[],
            &plan.tag_message,
        )
        .map_err(GitFlowError::from)?
    } else {
        plan.tag_message.clone()
    };

    let state = MergeState {
        action: Action::Finish,
        branch_type: branch_type.clone(),
        branch_name: short_name.clone(),
        full_branch_name: plan.full_branch_name.clone(),
        parent_branch: plan.parent_branch.clone(),
        current_step: FinishStep::Merge,
        merge_strategy: plan.merge_strategy,
        child_branches,
        child_strategies,
        updated_branches: Default::default(),
        current_child_branch: None,
        squash_message: plan.squash_message.clone(),
        merge_message: plan.merge_message.clone(),
        update_message: plan.update_message.clone(),
        no_verify: plan.no_verify,
        preserve_merges: plan.preserve_merges,
        no_fast_forward: plan.no_fast_forward,
        should_tag: plan.should_tag,
        tag_name: plan.tag_name.clone(),
        tag_message,
        message_file: plan.message_file.clone(),
        should_sign: plan.should_sign,
        signing_key: plan.signing_key.clone(),
        keep_local: plan.keep_local,
        keep_remote: plan.keep_remote,
        force_delete: plan.force_delete,
        remote,
    };

    let filter_ctx = FilterContext {
        branch_type: branch_type.clone(),
        branch_name: short_name.clone(),
        full_branch: plan.full_branch_name.clone(),
        base_branch: plan.parent_branch.clone(),
        origin: state.remote.clone(),
        version: if plan.should_tag { Some(plan.tag_name.clone()) } else { None },
        tag_message: if plan.should_tag { Some(state.tag_message.clone()) } else { None },
    };

    let mut journal = Journal::new(format!("{branch_type} finish"));
    journal.record_checkpoint("plan_resolved");
    journal.write(&common_dir).map_err(GitFlowError::from)?;

    let result = hooks::with_hooks(&hooks_dir, "finish", &filter_ctx, || {
        finish_engine::start_finish(&workspace.git, &common_dir, state)
    });

    match result {
        Ok(()) => {
            journal.commit();
            let _ = journal.write(&common_dir);
            if !ctx.quiet {
                println!("Finished {} into {}", plan.full_branch_name, plan.parent_branch);
                if plan.should_tag {
                    println!("Tagged {}", plan.tag_name);
                }
            }
            Ok(())
        }
        Err(hooks::HookError::HookFailed(msg)) if msg.contains("unresolved conflicts") => {
            journal.record_conflict_paused(plan.full_branch_name.clone(), "finish");
            let _ = journal.write(&common_dir);
            bail!(GitFlowError::UnresolvedConflicts)
        }
        Err(e) => {
            journal.rollback();
            let _ = journal.write(&common_dir);
            Err(GitFlowError::from(e).into())
        }
    }
}

fn run_continue(workspace: &Workspace, ctx: &Context) -> Result<()> {
    let _lock = lock::RepoLock::acquire(&workspace.common_dir).map_err(GitFlowError::from)?;

    let result = finish_engine::continue_finish(&workspace.git, &workspace.common_dir);
    if let Some(mut journal) = Journal::most_recent(&workspace.common_dir).unwrap_or(None) {
        match &result {
            Ok(()) => journal.commit(),
            Err(finish_engine::FinishError::Conflicted { branch, .. }) => {
                journal.record_conflict_paused(branch.clone(), "finish --continue")
            }
            Err(_) => journal.rollback(),
        }
        let _ = journal.write(&workspace.common_dir);
    }

    match result {
        Ok(()) => {
            if !ctx.quiet {
                println!("Finish resumed and completed.");
            }
            Ok(())
        }
        Err(finish_engine::FinishError::NoFinishInProgress) => {
            bail!(GitFlowError::NoMergeInProgress)
        }
        Err(finish_engine::FinishError::Conflicted { .. }) => {
            bail!(GitFlowError::UnresolvedConflicts)
        }
        Err(e) => bail!(e),
    }
}

fn run_abort(workspace: &Workspace, ctx: &Context) -> Result<()> {
    let _lock = lock::RepoLock::acquire(&workspace.common_dir).map_err(GitFlowError::from)?;

    let result = finish_engine::abort_finish(&workspace.git, &workspace.common_dir);
    if let Some(mut journal) = Journal::most_recent(&workspace.common_dir).unwrap_or(None) {
        journal.rollback();
        let _ = journal.write(&workspace.common_dir);
    }

    match result {
        Ok(()) => {
            if !ctx.quiet {
                println!("Finish aborted.");
            }
            Ok(())
        }
        Err(finish_engine::FinishError::NoFinishInProgress) => {
            bail!(GitFlowError::NoMergeInProgress)
        }
        Err(e) => bail!(e),
    }
}

/// Resolve the branch type and short name to finish, defaulting to the
/// current branch when either is omitted (`--continue`/`--abort` never reach
/// here, so both are required once we get this far unless inferred).
fn resolve_target(
    workspace: &Workspace,
    branch_type: Option<&str>,
    name: Option<&str>,
) -> Result<(String, String)> {
    if let (Some(bt), Some(n)) = (branch_type, name) {
        return Ok((bt.to_string(), n.to_string()));
    }

    let current = workspace
        .git
        .current_branch()?
        .context("not on any branch; specify a branch type and name")?;

    for type_name in workspace.topology.names() {
        let bt = workspace.topology.get(type_name).unwrap();
        if let Some(prefix) = &bt.prefix {
            if let Some(short) = current.as_str().strip_prefix(prefix.as_str()) {
                return Ok((type_name.to_string(), short.to_string()));
            }
        }
    }

    bail!("could not infer branch type for '{}'; specify it explicitly", current.as_str())
}

/// Base branch types downstream of `branch_type`'s parent that should be
/// auto-updated once the finish's merge step lands, paired with each child's
/// resolved downstream strategy. A base type's branch is assumed to share its
/// name (e.g. type `develop` lives on branch `develop`).
fn collect_children(
    workspace: &Workspace,
    branch_type: &str,
) -> (Vec<String>, BTreeMap<String, crate::core::topology::DownstreamStrategy>) {
    let Some(bt) = workspace.topology.get(branch_type) else {
        return (Vec::new(), BTreeMap::new());
    };
    let Some(parent) = &bt.parent else {
        return (Vec::new(), BTreeMap::new());
    };

    let mut branches = Vec::new();
    let mut strategies = BTreeMap::new();
    for child_name in workspace.topology.children_of(parent) {
        if let Some(child_bt) = workspace.topology.get(child_name) {
            if child_bt.auto_update && workspace.git.branch_exists(&BranchName::new(child_name.clone()).unwrap()) {
                branches.push(child_name.clone());
                strategies.insert(
                    child_name.clone(),
                    resolver::child_downstream_strategy(child_bt),
                );
            }
        }
    }
    (branches, strategies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::StrategyArgs;

    fn default_strategy_args() -> StrategyArgs {
        StrategyArgs {
            squash: false,
            no_squash: false,
            rebase: false,
            no_rebase: false,
            preserve_merges: false,
        }
    }

    fn init_repo_with_feature() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let repo = git2::Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_oid = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        let workspace = Workspace::open(&ctx).unwrap();
        workspace.git.create_branch(&BranchName::new("develop").unwrap(), "main").unwrap();
        crate::cli::commands::start::start(&ctx, "feature", "login", None, Some(false)).unwrap();
        dir
    }

    #[test]
    fn finish_rejects_concurrent_run() {
        let dir = init_repo_with_feature();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let workspace = Workspace::open(&ctx).unwrap();
        let state = MergeState {
            action: Action::Finish,
            branch_type: "feature".to_string(),
            branch_name: "login".to_string(),
            full_branch_name: "feature/login".to_string(),
            parent_branch: "develop".to_string(),
            current_step: FinishStep::Merge,
            merge_strategy: crate::core::topology::UpstreamStrategy::Merge,
            child_branches: vec![],
            child_strategies: Default::default(),
            updated_branches: Default::default(),
            current_child_branch: None,
            squash_message: None,
            merge_message: None,
            update_message: None,
            no_verify: false,
            preserve_merges: false,
            no_fast_forward: false,
            should_tag: false,
            tag_name: String::new(),
            tag_message: String::new(),
            message_file: None,
            should_sign: false,
            signing_key: None,
            keep_local: false,
            keep_remote: false,
            force_delete: false,
            remote: "origin".to_string(),
        };
        state.save(&workspace.common_dir).unwrap();

        let args = FinishArgs {
            branch_type: Some("feature"),
            name: Some("login"),
            continue_: false,
            abort: false,
            strategy: &default_strategy_args(),
            no_ff: false,
            ff: false,
            tag: false,
            notag: false,
            tagname: None,
            message: None,
            message_file: None,
            sign: false,
            signingkey: None,
            keep: false,
            keeplocal: false,
            keepremote: false,
            force_delete: false,
            fetch: false,
            no_fetch: true,
        };
        assert!(finish(&ctx, args).is_err());
    }

    #[test]
    fn finish_completes_clean_merge() {
        let dir = init_repo_with_feature();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let args = FinishArgs {
            branch_type: Some("feature"),
            name: Some("login"),
            continue_: false,
            abort: false,
            strategy: &default_strategy_args(),
            no_ff: false,
            ff: false,
            tag: false,
            notag: false,
            tagname: None,
            message: None,
            message_file: None,
            sign: false,
            signingkey: None,
            keep: false,
            keeplocal: false,
            keepremote: false,
            force_delete: false,
            fetch: false,
            no_fetch: true,
        };
        finish(&ctx, args).unwrap();

        let workspace = Workspace::open(&ctx).unwrap();
        assert!(!workspace.git.branch_exists(&BranchName::new("feature/login").unwrap()));
    }
}
