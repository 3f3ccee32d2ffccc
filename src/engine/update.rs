//! engine::update
//!
//! Updates one branch from its parent using the branch's resolved downstream
//! strategy (merge or rebase). Used both by the standalone `update` command
//! and by the finish state machine's child-update cascade.

use thiserror::Error;

use crate::core::merge_state::MergeState;
use crate::core::topology::DownstreamStrategy;
use crate::core::types::BranchName;
use crate::git::{Git, GitError, MergeOutcome};

/// Errors from running an update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The branch has unresolved merge/rebase conflicts; resolve and
    /// `--continue`, or `--abort`.
    #[error("update of '{branch}' left unresolved conflicts")]
    Conflicted {
        /// The branch being updated.
        branch: String,
    },

    /// `DownstreamStrategy::None` was passed; there is nothing to do.
    #[error("branch type does not support downstream updates")]
    NotUpdatable,

    /// The underlying Git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// The outcome of a single, successfully-applied update step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The branch was already up to date with its parent.
    AlreadyUpToDate,
    /// The update completed cleanly.
    Updated,
}

/// Update `branch` from `parent` in the working repository, using `strategy`.
///
/// On conflict, returns [`UpdateError::Conflicted`] without attempting any
/// cleanup: the caller is responsible for persisting a [`MergeState`] before
/// calling this (so a crash mid-conflict is still resumable) and for
/// resolving the conflict via `--continue`/`--abort` afterward.
pub fn apply_update(
    git: &Git,
    branch: &BranchName,
    parent: &str,
    strategy: DownstreamStrategy,
    message: Option<&str>,
    no_verify: bool,
) -> Result<UpdateOutcome, UpdateError> {
    if strategy == DownstreamStrategy::None {
        return Err(UpdateError::NotUpdatable);
    }

    git.checkout(branch.as_str())?;

    let branch_oid = git.resolve_ref(branch.as_str())?;
    let parent_oid = git.resolve_ref(parent)?;
    if git.is_ancestor(&parent_oid, &branch_oid)? {
        return Ok(UpdateOutcome::AlreadyUpToDate);
    }

    let outcome = match strategy {
        DownstreamStrategy::Merge => {
            let default_message = format!("Merge '{parent}' into '{}'", branch.as_str());
            let message = message.unwrap_or(&default_message);
            git.merge_with_message(parent, message, false, no_verify)?
        }
        DownstreamStrategy::Rebase => git.rebase(parent, false)?,
        DownstreamStrategy::None => unreachable!("checked above"),
    };

    match outcome {
        MergeOutcome::Completed => Ok(UpdateOutcome::Updated),
        MergeOutcome::Conflicted => Err(UpdateError::Conflicted {
            branch: branch.as_str().to_string(),
        }),
    }
}

/// Resume an update after the user has resolved conflicts and staged the result.
pub fn continue_update(
    git: &Git,
    branch: &BranchName,
    strategy: DownstreamStrategy,
) -> Result<UpdateOutcome, UpdateError> {
    let outcome = match strategy {
        DownstreamStrategy::Rebase => git.rebase_continue()?,
        DownstreamStrategy::Merge => {
            // A merge conflict is continued by committing the now-resolved index.
            let message = format!("Merge into '{}'", branch.as_str());
            git.commit(&message, false)?;
            MergeOutcome::Completed
        }
        DownstreamStrategy::None => return Err(UpdateError::NotUpdatable),
    };

    match outcome {
        MergeOutcome::Completed => Ok(UpdateOutcome::Updated),
        MergeOutcome::Conflicted => Err(UpdateError::Conflicted {
            branch: branch.as_str().to_string(),
        }),
    }
}

/// Abort an in-progress update, restoring the pre-update working tree.
pub fn abort_update(
    git: &Git,
    strategy: DownstreamStrategy,
) -> Result<(), UpdateError> {
    match strategy {
        DownstreamStrategy::Rebase => git.rebase_abort()?,
        DownstreamStrategy::Merge => git.merge_abort()?,
        DownstreamStrategy::None => {}
    }
    Ok(())
}

/// Cascade an update to every child base branch frozen in `state`, skipping
/// children already recorded as updated. Persists `state` after each child
/// completes so a crash mid-cascade resumes at the next pending child.
///
/// Stops and returns [`UpdateError::Conflicted`] on the first conflicting
/// child, leaving `state.current_child_branch` set so the caller can report
/// which branch needs attention.
pub fn run_child_cascade(
    git: &Git,
    git_common_dir: &std::path::Path,
    state: &mut MergeState,
) -> Result<(), UpdateError> {
    while let Some(child) = state.next_pending_child().map(str::to_string) {
        let branch = BranchName::new(child.clone())
            .map_err(|e| UpdateError::Git(GitError::Internal { message: e.to_string() }))?;
        let strategy = state
            .child_strategies
            .get(&child)
            .copied()
            .unwrap_or(DownstreamStrategy::None);

        if strategy == DownstreamStrategy::None {
            state.complete_child(&child);
            state
                .save(git_common_dir)
                .map_err(|e| UpdateError::Git(GitError::Internal { message: e.to_string() }))?;
            continue;
        }

        state.current_child_branch = Some(child.clone());
        state
            .save(git_common_dir)
            .map_err(|e| UpdateError::Git(GitError::Internal { message: e.to_string() }))?;

        let message = state.update_message.as_deref();
        apply_update(git, &branch, &state.parent_branch, strategy, message, state.no_verify)?;

        state.complete_child(&child);
        state
            .save(git_common_dir)
            .map_err(|e| UpdateError::Git(GitError::Internal { message: e.to_string() }))?;
    }

    Ok(())
}
