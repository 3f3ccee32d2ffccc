//! engine::finish
//!
//! The crash-safe, resumable finish state machine. Drives a topic branch
//! through [`FinishStep::Merge`] -> [`FinishStep::CreateTag`] ->
//! [`FinishStep::UpdateChildren`] -> [`FinishStep::DeleteBranch`], persisting
//! [`MergeState`] before every step that could leave the working tree
//! conflicted so a crash or a conflict can always be resumed with
//! `--continue` or undone with `--abort`.

use std::path::Path;

use thiserror::Error;

use crate::core::merge_state::{FinishStep, MergeState, MergeStateError};
use crate::core::topology::UpstreamStrategy;
use crate::core::types::BranchName;
use crate::engine::update::{self, UpdateError};
use crate::git::{Git, GitError, MergeOutcome};

/// Errors from driving the finish state machine.
#[derive(Debug, Error)]
pub enum FinishError {
    /// A merge, rebase, or squash step left unresolved conflicts. The
    /// caller should report this to the user and leave the persisted
    /// [`MergeState`] in place for `--continue`/`--abort`.
    #[error("finish of '{branch}' paused at step '{step:?}' with unresolved conflicts")]
    Conflicted {
        /// The topic branch being finished.
        branch: String,
        /// The step that produced the conflict.
        step: FinishStep,
    },

    /// `finish` was invoked but a finish/update is already in progress.
    #[error("a finish is already in progress")]
    AlreadyInProgress,

    /// `--continue`/`--abort` was invoked but no finish is in progress.
    #[error("no finish is in progress")]
    NoFinishInProgress,

    /// The underlying Git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The update engine reported a failure while cascading to child branches.
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Failed to read or write the persisted merge state.
    #[error(transparent)]
    MergeState(#[from] MergeStateError),
}

/// Start a new finish run: persist the initial [`MergeState`] and drive it
/// to completion (or to the first conflict).
///
/// Fails with [`FinishError::AlreadyInProgress`] if a finish or update is
/// already in progress for this repository.
pub fn start_finish(
    git: &Git,
    git_common_dir: &Path,
    state: MergeState,
) -> Result<(), FinishError> {
    if MergeState::is_in_progress(git_common_dir) {
        return Err(FinishError::AlreadyInProgress);
    }

    let mut state = state;
    state.save(git_common_dir)?;
    drive(git, git_common_dir, &mut state)
}

/// Resume a finish after the user has resolved conflicts (and, for a merge
/// or squash step, staged the result).
pub fn continue_finish(git: &Git, git_common_dir: &Path) -> Result<(), FinishError> {
    let mut state =
        MergeState::load(git_common_dir)?.ok_or(FinishError::NoFinishInProgress)?;

    if git.has_conflicts().unwrap_or(false) {
        return Err(FinishError::Conflicted {
            branch: state.full_branch_name.clone(),
            step: state.current_step,
        });
    }

    if state.current_step == FinishStep::Merge && git.state().is_in_progress() {
        let outcome = match state.merge_strategy {
            UpstreamStrategy::Rebase => git.rebase_continue()?,
            UpstreamStrategy::Merge | UpstreamStrategy::Squash | UpstreamStrategy::None => {
                let message = state
                    .merge_message
                    .clone()
                    .unwrap_or_else(|| format!("Merge branch '{}'", state.full_branch_name));
                git.commit(&message, state.no_verify)?;
                MergeOutcome::Completed
            }
        };
        if outcome == MergeOutcome::Conflicted {
            return Err(FinishError::Conflicted {
                branch: state.full_branch_name.clone(),
                step: state.current_step,
            });
        }
        advance(&mut state);
        state.save(git_common_dir)?;
    } else if state.current_step == FinishStep::UpdateChildren && git.state().is_in_progress() {
        if let Some(child) = state.current_child_branch.clone() {
            let branch = BranchName::new(child.clone())
                .map_err(|e| FinishError::Git(GitError::InvalidRefName { message: e.to_string() }))?;
            let strategy = state
                .child_strategies
                .get(&child)
                .copied()
                .unwrap_or(crate::core::topology::DownstreamStrategy::None);

            match update::continue_update(git, &branch, strategy) {
                Ok(_) => {
                    state.complete_child(&child);
                    state.save(git_common_dir)?;
                }
                Err(UpdateError::Conflicted { .. }) => {
                    return Err(FinishError::Conflicted {
                        branch: child,
                        step: FinishStep::UpdateChildren,
                    });
                }
                Err(e) => return Err(FinishError::Update(e)),
            }
        }
    }

    drive(git, git_common_dir, &mut state)
}

/// Abort an in-progress finish: undo the in-flight merge/rebase, return to
/// the topic branch, and clear the persisted state. Steps already committed
/// (tag creation, child updates, branch deletion) are not undone.
pub fn abort_finish(git: &Git, git_common_dir: &Path) -> Result<(), FinishError> {
    let state = MergeState::load(git_common_dir)?.ok_or(FinishError::NoFinishInProgress)?;

    if state.current_step == FinishStep::Merge && git.state().is_in_progress() {
        match state.merge_strategy {
            UpstreamStrategy::Rebase => git.rebase_abort()?,
            _ => git.merge_abort()?,
        }
    }

    let _ = git.checkout(&state.full_branch_name);
    MergeState::clear(git_common_dir)?;
    Ok(())
}

fn advance(state: &mut MergeState) {
    state.current_step = match state.current_step {
        FinishStep::Merge => FinishStep::CreateTag,
        FinishStep::CreateTag => FinishStep::UpdateChildren,
        FinishStep::UpdateChildren => FinishStep::DeleteBranch,
        FinishStep::DeleteBranch => FinishStep::DeleteBranch,
    };
}

/// Drive `state` forward from `state.current_step` through to completion,
/// persisting after every step transition.
fn drive(git: &Git, git_common_dir: &Path, state: &mut MergeState) -> Result<(), FinishError> {
    loop {
        match state.current_step {
            FinishStep::Merge => {
                if run_merge_step(git, state)? == MergeOutcome::Conflicted {
                    state.save(git_common_dir)?;
                    return Err(FinishError::Conflicted {
                        branch: state.full_branch_name.clone(),
                        step: FinishStep::Merge,
                    });
                }
                advance(state);
                state.save(git_common_dir)?;
            }
            FinishStep::CreateTag => {
                run_create_tag_step(git, state)?;
                advance(state);
                state.save(git_common_dir)?;
            }
            FinishStep::UpdateChildren => {
                update::run_child_cascade(git, git_common_dir, state)?;
                advance(state);
                state.save(git_common_dir)?;
            }
            FinishStep::DeleteBranch => {
                run_delete_branch_step(git, state)?;
                MergeState::clear(git_common_dir)?;
                return Ok(());
            }
        }
    }
}

/// Check out the parent and merge, rebase, or squash the topic into it.
fn run_merge_step(git: &Git, state: &MergeState) -> Result<MergeOutcome, FinishError> {
    match state.merge_strategy {
        UpstreamStrategy::Merge | UpstreamStrategy::None => {
            git.checkout(&state.parent_branch)?;
            let message = state
                .merge_message
                .clone()
                .unwrap_or_else(|| format!("Merge branch '{}'", state.full_branch_name));
            Ok(git.merge_with_message(
                &state.full_branch_name,
                &message,
                state.no_fast_forward,
                state.no_verify,
            )?)
        }
        UpstreamStrategy::Squash => {
            git.checkout(&state.parent_branch)?;
            let message = state
                .squash_message
                .clone()
                .unwrap_or_else(|| format!("Squash merge branch '{}'", state.full_branch_name));
            Ok(git.merge_squash_with_message(&state.full_branch_name, &message, state.no_verify)?)
        }
        UpstreamStrategy::Rebase => {
            git.checkout(&state.full_branch_name)?;
            let outcome = git.rebase(&state.parent_branch, state.preserve_merges)?;
            if outcome == MergeOutcome::Conflicted {
                return Ok(outcome);
            }
            git.checkout(&state.parent_branch)?;
            Ok(git.merge(&state.full_branch_name, state.no_fast_forward, state.no_verify)?)
        }
    }
}

fn run_create_tag_step(git: &Git, state: &MergeState) -> Result<(), FinishError> {
    if !state.should_tag {
        return Ok(());
    }
    git.create_tag(
        &state.tag_name,
        Some(&state.tag_message),
        state.message_file.as_deref(),
        state.should_sign,
        state.signing_key.as_deref(),
    )?;
    Ok(())
}

fn run_delete_branch_step(git: &Git, state: &MergeState) -> Result<(), FinishError> {
    let branch = BranchName::new(state.full_branch_name.clone())
        .map_err(|e| FinishError::Git(GitError::InvalidRefName { message: e.to_string() }))?;

    if !state.keep_local {
        git.delete_branch(&branch, state.force_delete)?;
    }
    if !state.keep_remote && git.remote_branch_exists(&state.remote, &branch) {
        git.delete_remote_branch(&state.remote, &branch)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merge_state::Action;
    use std::collections::{BTreeMap, BTreeSet};

    fn sample_state() -> MergeState {
        MergeState {
            action: Action::Finish,
            branch_type: "feature".to_string(),
            branch_name: "login".to_string(),
            full_branch_name: "feature/login".to_string(),
            parent_branch: "develop".to_string(),
            current_step: FinishStep::Merge,
            merge_strategy: UpstreamStrategy::Merge,
            child_branches: vec![],
            child_strategies: BTreeMap::new(),
            updated_branches: BTreeSet::new(),
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
            keep_remote: true,
            force_delete: false,
            remote: "origin".to_string(),
        }
    }

    fn init_repo_with_branches() -> (tempfile::TempDir, Git) {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        {
            let sig = git2::Signature::now("Test", "test@example.com").unwrap();
            let tree_oid = {
                let mut index = repo.index().unwrap();
                index.write_tree().unwrap()
            };
            let tree = repo.find_tree(tree_oid).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
                .unwrap();
        }
        repo.branch(
            "develop",
            &repo.head().unwrap().peel_to_commit().unwrap(),
            false,
        )
        .unwrap();
        repo.branch(
            "feature/login",
            &repo.head().unwrap().peel_to_commit().unwrap(),
            false,
        )
        .unwrap();
        let git = Git::open(dir.path()).unwrap();
        (dir, git)
    }

    #[test]
    fn start_finish_rejects_existing_state() {
        let (dir, git) = init_repo_with_branches();
        let state = sample_state();
        state.save(git.get_git_common_dir().as_path()).unwrap();

        let result = start_finish(&git, &git.get_git_common_dir(), sample_state());
        assert!(matches!(result, Err(FinishError::AlreadyInProgress)));
    }

    #[test]
    fn continue_without_state_errors() {
        let (_dir, git) = init_repo_with_branches();
        let result = continue_finish(&git, &git.get_git_common_dir());
        assert!(matches!(result, Err(FinishError::NoFinishInProgress)));
    }

    #[test]
    fn abort_without_state_errors() {
        let (_dir, git) = init_repo_with_branches();
        let result = abort_finish(&git, &git.get_git_common_dir());
        assert!(matches!(result, Err(FinishError::NoFinishInProgress)));
    }

    #[test]
    fn clean_finish_runs_to_completion_and_clears_state() {
        let (_dir, git) = init_repo_with_branches();
        let common_dir = git.get_git_common_dir();
        let result = start_finish(&git, &common_dir, sample_state());
        assert!(result.is_ok(), "{:?}", result);
        assert!(!MergeState::is_in_progress(&common_dir));
        assert!(!git.branch_exists(&BranchName::new("feature/login").unwrap()));
    }

    #[test]
    fn advance_walks_steps_in_order() {
        let mut state = sample_state();
        advance(&mut state);
        assert_eq!(state.current_step, FinishStep::CreateTag);
        advance(&mut state);
        assert_eq!(state.current_step, FinishStep::UpdateChildren);
        advance(&mut state);
        assert_eq!(state.current_step, FinishStep::DeleteBranch);
        advance(&mut state);
        assert_eq!(state.current_step, FinishStep::DeleteBranch);
    }
}
