//! core::error
//!
//! The sealed, top-level error enum every command ultimately returns, and the
//! single function mapping it to a process exit code.

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::ops::{JournalError, LockError};
use crate::core::resolver::ResolverError;
use crate::core::topology::TopologyError;
use crate::engine::hooks::HookError;
use crate::git::GitError;

/// The sealed set of domain errors a command can return, each mapped to a
/// stable exit code by [`exit_code`].
#[derive(Debug, Error)]
pub enum GitFlowError {
    /// `gitflow init` has never been run (no `gitflow.initialized` marker).
    #[error("repository is not initialized for gitflow; run `gitflow init` first")]
    NotInitialized,

    /// `gitflow init` was run against an already-initialized repository.
    #[error("repository is already initialized for gitflow")]
    AlreadyInitialized,

    /// The named branch type does not exist in the topology.
    #[error("invalid branch type: {0}")]
    InvalidBranchType(String),

    /// The supplied branch name failed validation.
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    /// The named branch does not exist.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// A branch with the target name already exists.
    #[error("branch already exists: {0}")]
    BranchExists(String),

    /// The named remote branch does not exist.
    #[error("remote branch not found: {0}")]
    RemoteBranchNotFound(String),

    /// The named remote branch already exists (publish refuses to overwrite).
    #[error("remote branch already exists: {0}")]
    RemoteBranchExists(String),

    /// The named local branch does not exist.
    #[error("local branch not found: {0}")]
    LocalBranchNotFound(String),

    /// The branch topology's parent relation contains a cycle.
    #[error("circular dependency in branch topology: {0}")]
    CircularDependency(String),

    /// The branch being deleted still has dependent branches.
    #[error("branch '{0}' has dependent branches")]
    BranchHasDependents(String),

    /// The requested merge strategy is not valid in this context.
    #[error("invalid merge strategy: {0}")]
    InvalidMergeStrategy(String),

    /// A `finish`/`update` is already in progress; only `--continue`/`--abort` are accepted.
    #[error("a merge is already in progress; run with --continue or --abort")]
    MergeInProgress,

    /// `--continue`/`--abort` was invoked but no merge is in progress.
    #[error("no merge is in progress")]
    NoMergeInProgress,

    /// The working tree has unresolved conflicts.
    #[error("unresolved conflicts; resolve them and run --continue, or run --abort")]
    UnresolvedConflicts,

    /// The local branch is behind or diverged from its remote and `--force` was not given.
    #[error("branch '{branch}' is behind remote '{remote}' by {count} commit(s)")]
    BranchBehindRemote {
        /// The local branch short name.
        branch: String,
        /// The remote tracking branch's remote name.
        remote: String,
        /// How many commits behind/diverged.
        count: usize,
    },

    /// A filter script exited non-zero.
    #[error("filter failed: {0}")]
    FilterFailed(String),

    /// A pre-hook exited non-zero.
    #[error("hook failed: {0}")]
    HookFailed(String),

    /// The underlying Git operation failed.
    #[error("git operation '{operation}' failed: {cause}")]
    GitError {
        /// The operation that was attempted.
        operation: String,
        /// The underlying failure.
        cause: String,
    },

    /// An empty branch short name was supplied.
    #[error("branch name must not be empty")]
    EmptyBranchName,
}

impl From<GitError> for GitFlowError {
    fn from(err: GitError) -> Self {
        GitFlowError::GitError {
            operation: "git".to_string(),
            cause: err.to_string(),
        }
    }
}

impl From<ConfigError> for GitFlowError {
    fn from(err: ConfigError) -> Self {
        GitFlowError::GitError {
            operation: "config".to_string(),
            cause: err.to_string(),
        }
    }
}

impl From<JournalError> for GitFlowError {
    fn from(err: JournalError) -> Self {
        GitFlowError::GitError {
            operation: "journal".to_string(),
            cause: err.to_string(),
        }
    }
}

impl From<LockError> for GitFlowError {
    fn from(err: LockError) -> Self {
        GitFlowError::GitError {
            operation: "lock".to_string(),
            cause: err.to_string(),
        }
    }
}

impl From<TopologyError> for GitFlowError {
    fn from(err: TopologyError) -> Self {
        match err {
            TopologyError::CycleError(at) => GitFlowError::CircularDependency(at),
            other => GitFlowError::InvalidBranchType(other.to_string()),
        }
    }
}

impl From<ResolverError> for GitFlowError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::BranchBehindRemote {
                branch,
                remote,
                count,
                ..
            } => GitFlowError::BranchBehindRemote {
                branch,
                remote,
                count,
            },
            ResolverError::UnknownBranchType(name) => GitFlowError::InvalidBranchType(name),
            ResolverError::Config(e) => e.into(),
        }
    }
}

impl From<HookError> for GitFlowError {
    fn from(err: HookError) -> Self {
        match err {
            HookError::FilterFailed(msg) => GitFlowError::FilterFailed(msg),
            HookError::HookFailed(msg) => GitFlowError::HookFailed(msg),
            HookError::Io(e) => GitFlowError::GitError {
                operation: "hook".to_string(),
                cause: e.to_string(),
            },
        }
    }
}

/// Map a [`GitFlowError`] to its stable process exit code.
///
/// Centralized so the mapping cannot drift from the error enum: 0 = success
/// (handled by the caller, not represented here); 1 = generic/anyhow-wrapped
/// failure; 2 = merge-in-progress family ("run `--continue` or `--abort`");
/// 3 = branch behind remote; 4 = configuration/input errors; 5 = the
/// underlying Git operation itself failed.
pub fn exit_code(err: &GitFlowError) -> i32 {
    match err {
        GitFlowError::UnresolvedConflicts
        | GitFlowError::MergeInProgress
        | GitFlowError::NoMergeInProgress => 2,
        GitFlowError::BranchBehindRemote { .. } => 3,
        GitFlowError::InvalidBranchType(_)
        | GitFlowError::InvalidBranchName(_)
        | GitFlowError::EmptyBranchName
        | GitFlowError::CircularDependency(_)
        | GitFlowError::InvalidMergeStrategy(_) => 4,
        GitFlowError::GitError { .. } => 5,
        _ => 1,
    }
}
