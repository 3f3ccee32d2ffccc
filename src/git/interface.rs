//! git::interface
//!
//! Git interface implementation, primarily on git2 with a small subprocess
//! escape hatch.
//!
//! This module provides the **single doorway** to all Git operations in
//! gitflow. All Git interactions flow through this interface, which provides
//! structured results and normalizes errors into typed failure categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only way to interact with a Git repository.
//! No other module should import `git2` directly, nor spawn a `git`
//! subprocess directly. This ensures:
//!
//! - Consistent error handling across all Git operations
//! - Strong type guarantees at the boundary
//! - CAS (compare-and-swap) semantics for all ref mutations
//!
//! git2's porcelain handles ref CAS, ancestry, blob/commit reads, and config
//! scopes cleanly and is used directly for those. A few operations — true
//! interactive rebase with conflict resumption, `git merge --squash`, and
//! signed tag creation — are awkward or incomplete against git2's mid-level
//! APIs. For exactly these, this module shells out to the `git` binary via
//! `std::process::Command`; every other component still only ever calls this
//! module's typed methods.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed
//! - [`GitError::OperationInProgress`]: Rebase/merge/cherry-pick in progress
//! - [`GitError::DirtyWorktree`]: Working tree has uncommitted changes
//! - [`GitError::MergeConflict`]: A merge/squash-merge left conflicts
//! - [`GitError::RebaseConflict`]: A rebase step left conflicts
//! - [`GitError::ProcessFailed`]: The subprocess escape hatch returned non-zero
//!
//! # Example
//!
//! ```ignore
//! use gitflow::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let oid = git.resolve_ref("refs/heads/main")?;
//! println!("main is at {}", oid.short(7));
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::core::types::{BranchName, Oid, RefName, TypeError};

/// Errors from Git operations.
///
/// These error types cover all categories of Git failures that gitflow
/// needs to handle distinctly.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    ///
    /// This occurs when attempting to update a ref but its current value
    /// doesn't match the expected value. This is critical for correctness -
    /// it prevents applying changes to a repository that has changed since
    /// planning.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// Git operation in progress (rebase, merge, etc.).
    #[error("{operation} in progress")]
    OperationInProgress {
        /// The type of operation in progress
        operation: GitState,
    },

    /// Working tree has uncommitted changes.
    #[error("working tree is dirty: {details}")]
    DirtyWorktree {
        /// Description of what's dirty
        details: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Blob content is not valid UTF-8.
    #[error("blob is not valid UTF-8: {oid}")]
    InvalidUtf8 {
        /// The OID of the blob
        oid: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },

    /// A merge (or squash-merge) left unresolved conflicts.
    #[error("merge of {reference} produced conflicts")]
    MergeConflict {
        /// The ref that was being merged.
        reference: String,
    },

    /// A rebase step left unresolved conflicts.
    #[error("rebase onto {onto} produced conflicts")]
    RebaseConflict {
        /// The branch the rebase was replaying onto.
        onto: String,
    },

    /// `rebase_continue`/`rebase_abort` was invoked with no rebase in progress.
    #[error("no rebase is in progress")]
    NoRebaseInProgress,

    /// A subprocess invocation of `git` exited non-zero.
    #[error("git subprocess failed (exit {code:?}): {stderr}")]
    ProcessFailed {
        /// The process's exit code, if the process terminated normally.
        code: Option<i32>,
        /// Captured stderr output.
        stderr: String,
    },

    /// Failed to spawn the `git` subprocess at all.
    #[error("failed to spawn git subprocess: {message}")]
    ProcessSpawnFailed {
        /// The underlying I/O error message.
        message: String,
    },
}

/// The sync relationship between a local branch and its remote tracking branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Local and remote point at the same commit.
    Equal,
    /// Local has commits the remote doesn't (remote is a strict ancestor of local).
    Ahead,
    /// Remote has commits the local doesn't (local is a strict ancestor of remote).
    Behind,
    /// Local and remote have each moved independently.
    Diverged,
    /// The local branch has no tracking branch configured, or it doesn't exist remotely.
    NoTracking,
}

/// The outcome of attempting a merge, rebase, or squash-merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The operation completed and produced (or fast-forwarded to) a commit.
    Completed,
    /// The operation left unresolved conflicts; the caller must resolve and
    /// call the matching `*_continue` method, or `*_abort`.
    Conflicted,
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("repository is locked: {}", err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: err.message().to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: err.message().to_string(),
            },
            _ => GitError::Internal {
                message: err.message().to_string(),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
            TypeError::InvalidBranchName(msg) => GitError::InvalidRefName { message: msg },
        }
    }
}

/// Information about a Git repository.
#[derive(Debug, Clone)]
pub struct RepoInfo {
    /// Path to .git directory
    pub git_dir: PathBuf,
    /// Path to working directory
    pub work_dir: PathBuf,
}

/// State of in-progress Git operations.
///
/// This enum represents the various states a Git repository can be in
/// when an operation is paused (usually due to conflicts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,

    /// Rebase in progress.
    Rebase {
        /// Current step in the rebase (1-indexed), if available.
        current: Option<usize>,
        /// Total steps in the rebase, if available.
        total: Option<usize>,
    },

    /// Merge in progress.
    Merge,

    /// Cherry-pick in progress.
    CherryPick,

    /// Revert in progress.
    Revert,

    /// Bisect in progress.
    Bisect,

    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use gitflow::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Get a human-readable description of the state.
    ///
    /// # Example
    ///
    /// ```
    /// use gitflow::git::GitState;
    ///
    /// assert_eq!(GitState::Clean.description(), "clean");
    /// assert_eq!(GitState::Merge.description(), "merge");
    /// ```
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase { .. } => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            _ => write!(f, "{}", self.description()),
        }
    }
}

/// A ref with its name and target OID.
///
/// Used when enumerating refs in a namespace.
#[derive(Debug, Clone)]
pub struct RefEntry {
    /// The full ref name
    pub name: RefName,
    /// The OID the ref points to
    pub oid: Oid,
}

/// Summary of working tree status.
///
/// Provides counts of different types of changes in the working tree,
/// useful for pre-command checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files (if requested)
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree is completely clean (no changes at all).
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }

    /// Check if there are any staged changes ready to commit.
    pub fn has_staged(&self) -> bool {
        self.staged > 0
    }
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author timestamp
    pub author_time: chrono::DateTime<chrono::Utc>,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All repository
/// reads and writes flow through this interface. No other module should
/// import `git2` directly.
///
/// # CAS Semantics
///
/// All ref mutation operations use compare-and-swap (CAS) semantics.
/// This means updates only succeed if the ref's current value matches
/// an expected value. This is critical for correctness - it prevents
/// the executor from applying changes to a repository that has been
/// modified since planning.
///
/// # Example
///
/// ```ignore
/// use gitflow::git::Git;
/// use std::path::Path;
///
/// let git = Git::open(Path::new("."))?;
///
/// // Read operations
/// let oid = git.resolve_ref("refs/heads/main")?;
/// let branches = git.list_branches()?;
///
/// // CAS update (fails if ref changed)
/// git.update_ref_cas(
///     "refs/heads/feature",
///     &new_oid,
///     Some(&old_oid),
///     "gitflow: restack"
/// )?;
/// ```
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    ///
    /// # Example
    ///
    /// ```ignore
    /// use gitflow::git::Git;
    /// use std::path::Path;
    ///
    /// let git = Git::open(Path::new("./src"))?;  // Works from subdirectory
    /// ```
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        // Ensure it's not a bare repository
        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Get repository information (git_dir and work_dir paths).
    pub fn info(&self) -> Result<RepoInfo, GitError> {
        let git_dir = self.repo.path().to_path_buf();
        let work_dir = self.repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(RepoInfo { git_dir, work_dir })
    }

    /// Get direct access to the .git directory path.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // State Detection
    // =========================================================================

    /// Get the current Git state (rebase, merge, etc.).
    ///
    /// This detects in-progress operations that require user intervention
    /// (usually conflict resolution).
    ///
    /// # Example
    ///
    /// ```ignore
    /// use gitflow::git::{Git, GitState};
    ///
    /// let git = Git::open(Path::new("."))?;
    /// if git.state().is_in_progress() {
    ///     println!("Operation in progress: {}", git.state());
    /// }
    /// ```
    pub fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => {
                // Try to read rebase progress
                let (current, total) = self.read_rebase_progress();
                GitState::Rebase { current, total }
            }
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    /// Read rebase progress from .git/rebase-merge or .git/rebase-apply.
    fn read_rebase_progress(&self) -> (Option<usize>, Option<usize>) {
        let git_dir = self.repo.path();

        // Try rebase-merge first (interactive rebase)
        let rebase_merge = git_dir.join("rebase-merge");
        if rebase_merge.exists() {
            let current = std::fs::read_to_string(rebase_merge.join("msgnum"))
                .ok()
                .and_then(|s| s.trim().parse().ok());
            let total = std::fs::read_to_string(rebase_merge.join("end"))
                .ok()
                .and_then(|s| s.trim().parse().ok());
            return (current, total);
        }

        // Try rebase-apply (non-interactive rebase)
        let rebase_apply = git_dir.join("rebase-apply");
        if rebase_apply.exists() {
            let current = std::fs::read_to_string(rebase_apply.join("next"))
                .ok()
                .and_then(|s| s.trim().parse().ok());
            let total = std::fs::read_to_string(rebase_apply.join("last"))
                .ok()
                .and_then(|s| s.trim().parse().ok());
            return (current, total);
        }

        (None, None)
    }

    /// Check if there are unresolved conflicts in the index.
    pub fn has_conflicts(&self) -> Result<bool, GitError> {
        let index = self.repo.index().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        Ok(index.has_conflicts())
    }

    // =========================================================================
    // Working Tree Status
    // =========================================================================

    /// Get working tree status summary.
    ///
    /// If `include_untracked` is false, untracked files are not counted.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let status = git.worktree_status(false)?;
    /// if !status.is_clean() {
    ///     println!("Working tree has changes");
    /// }
    /// ```
    pub fn worktree_status(&self, include_untracked: bool) -> Result<WorktreeStatus, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(include_untracked)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        let mut result = WorktreeStatus::default();

        for entry in statuses.iter() {
            let status = entry.status();

            // Check for conflicts
            if status.is_conflicted() {
                result.has_conflicts = true;
            }

            // Count staged changes
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }

            // Count unstaged changes
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }

            // Count untracked
            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    /// Check if working tree is clean (no staged or unstaged changes).
    ///
    /// Does not consider untracked files.
    pub fn is_worktree_clean(&self) -> Result<bool, GitError> {
        let status = self.worktree_status(false)?;
        Ok(status.is_clean())
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to its target OID.
    ///
    /// This peels through symbolic refs and tags to get the commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    ///
    /// # Example
    ///
    /// ```ignore
    /// let oid = git.resolve_ref("refs/heads/main")?;
    /// println!("main is at {}", oid.short(7));
    /// ```
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        let reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        let oid = reference
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, refname))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Resolve a ref, returning None if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```ignore
    /// if let Some(oid) = git.try_resolve_ref("refs/heads/feature")? {
    ///     println!("feature branch exists at {}", oid.short(7));
    /// }
    /// ```
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.resolve_ref(refname) {
            Ok(oid) => Ok(Some(oid)),
            Err(GitError::RefNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get HEAD commit OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (new repository)
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Check if a ref exists.
    pub fn ref_exists(&self, refname: &str) -> bool {
        self.repo.find_reference(refname).is_ok()
    }

    /// Get the current branch name, if on a branch.
    ///
    /// Returns `None` if HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None) // Detached HEAD
    }

    // =========================================================================
    // Ref Enumeration
    // =========================================================================

    /// List all refs matching a prefix.
    ///
    /// # Example
    ///
    /// ```ignore
    /// // List all tag refs
    /// let tags = git.list_refs_by_prefix("refs/tags/")?;
    /// for entry in tags {
    ///     println!("{} -> {}", entry.name, entry.oid.short(7));
    /// }
    /// ```
    pub fn list_refs_by_prefix(&self, prefix: &str) -> Result<Vec<RefEntry>, GitError> {
        let pattern = format!("{}*", prefix);
        let refs = self
            .repo
            .references_glob(&pattern)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        let mut entries = Vec::new();
        for reference in refs {
            let reference = reference.map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

            // Get ref name
            let name = match reference.name() {
                Some(n) => n,
                None => continue, // Skip refs with non-UTF8 names
            };

            // Skip invalid ref names
            let ref_name = match RefName::new(name) {
                Ok(r) => r,
                Err(_) => continue,
            };

            // Resolve to OID
            let oid = match reference.peel_to_commit() {
                Ok(commit) => commit.id(),
                Err(_) => {
                    // For non-commit refs (like metadata blobs), get direct target
                    match reference.target() {
                        Some(oid) => oid,
                        None => continue,
                    }
                }
            };

            let oid = match Oid::new(oid.to_string()) {
                Ok(o) => o,
                Err(_) => continue,
            };

            entries.push(RefEntry {
                name: ref_name,
                oid,
            });
        }

        Ok(entries)
    }

    /// List all local branches.
    ///
    /// Returns validated `BranchName` instances.
    pub fn list_branches(&self) -> Result<Vec<BranchName>, GitError> {
        let branches = self
            .repo
            .branches(Some(git2::BranchType::Local))
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        let mut names = Vec::new();
        for branch in branches {
            let (branch, _) = branch.map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
            if let Some(name) = branch.name().ok().flatten() {
                // Skip invalid branch names
                if let Ok(branch_name) = BranchName::new(name) {
                    names.push(branch_name);
                }
            }
        }

        Ok(names)
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, name: &BranchName) -> bool {
        self.repo
            .find_branch(name.as_str(), git2::BranchType::Local)
            .is_ok()
    }

    /// Check whether a remote branch exists.
    pub fn remote_branch_exists(&self, remote: &str, name: &BranchName) -> bool {
        let full = format!("{remote}/{}", name.as_str());
        self.repo
            .find_branch(&full, git2::BranchType::Remote)
            .is_ok()
    }

    /// Check whether `spec` resolves to anything git can check out: a branch,
    /// tag, or raw commit-ish.
    pub fn ref_or_commit_exists(&self, spec: &str) -> bool {
        self.repo.revparse_single(spec).is_ok()
    }

    // =========================================================================
    // Checkout, Branch Creation, Deletion
    // =========================================================================

    /// Check out a branch, tag, or commit-ish, updating HEAD and the working tree.
    pub fn checkout(&self, spec: &str) -> Result<(), GitError> {
        let object = self
            .repo
            .revparse_single(spec)
            .map_err(|e| GitError::from_git2(e, spec))?;

        let mut opts = git2::build::CheckoutBuilder::new();
        opts.safe();
        self.repo
            .checkout_tree(&object, Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, spec))?;

        if self.repo.find_branch(spec, git2::BranchType::Local).is_ok() {
            self.repo
                .set_head(&format!("refs/heads/{spec}"))
                .map_err(|e| GitError::from_git2(e, spec))?;
        } else {
            self.repo
                .set_head_detached(object.id())
                .map_err(|e| GitError::from_git2(e, spec))?;
        }

        Ok(())
    }

    /// Create a new local branch from a start point (branch, tag, or commit-ish).
    pub fn create_branch(&self, name: &BranchName, start_point: &str) -> Result<(), GitError> {
        let object = self
            .repo
            .revparse_single(start_point)
            .map_err(|e| GitError::from_git2(e, start_point))?;
        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, start_point))?;

        self.repo
            .branch(name.as_str(), &commit, false)
            .map_err(|e| GitError::from_git2(e, name.as_str()))?;

        Ok(())
    }

    /// Rename a local branch.
    pub fn rename_branch(&self, old: &BranchName, new: &BranchName) -> Result<(), GitError> {
        let mut branch = self
            .repo
            .find_branch(old.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, old.as_str()))?;

        branch
            .rename(new.as_str(), false)
            .map_err(|e| GitError::from_git2(e, new.as_str()))?;

        Ok(())
    }

    /// Delete a local branch.
    ///
    /// If `force` is false, git2 still allows deleting a branch regardless of
    /// merge status (unlike the `git branch -d` porcelain); callers enforce
    /// the "unmerged" safety check themselves via [`Git::is_ancestor`] before
    /// calling this when `force` is false.
    pub fn delete_branch(&self, name: &BranchName, _force: bool) -> Result<(), GitError> {
        let mut branch = self
            .repo
            .find_branch(name.as_str(), git2::BranchType::Local)
            .map_err(|e| GitError::from_git2(e, name.as_str()))?;

        branch
            .delete()
            .map_err(|e| GitError::from_git2(e, name.as_str()))?;

        Ok(())
    }

    /// Delete a branch on a remote by pushing a delete refspec.
    pub fn delete_remote_branch(&self, remote: &str, name: &BranchName) -> Result<(), GitError> {
        let refspec = format!(":refs/heads/{}", name.as_str());
        self.run_git(
            &["push", remote, &refspec],
            &format!("delete remote branch {remote}/{}", name.as_str()),
        )?;
        Ok(())
    }

    // =========================================================================
    // Merging
    // =========================================================================

    /// Merge `reference` into HEAD, using the default merge commit message,
    /// honoring `no_ff` (always create a merge commit even if fast-forward is
    /// possible) and `no_verify` (bypass commit hooks).
    pub fn merge(
        &self,
        reference: &str,
        no_ff: bool,
        no_verify: bool,
    ) -> Result<MergeOutcome, GitError> {
        let default_message = format!("Merge branch '{reference}'");
        self.merge_with_message(reference, &default_message, no_ff, no_verify)
    }

    /// Merge `reference` into HEAD with an explicit commit message.
    pub fn merge_with_message(
        &self,
        reference: &str,
        message: &str,
        no_ff: bool,
        no_verify: bool,
    ) -> Result<MergeOutcome, GitError> {
        let annotated = self
            .repo
            .find_annotated_commit(
                self.repo
                    .revparse_single(reference)
                    .map_err(|e| GitError::from_git2(e, reference))?
                    .id(),
            )
            .map_err(|e| GitError::from_git2(e, reference))?;

        let (analysis, _) = self
            .repo
            .merge_analysis(&[&annotated])
            .map_err(|e| GitError::from_git2(e, reference))?;

        if analysis.is_up_to_date() {
            return Ok(MergeOutcome::Completed);
        }

        if analysis.is_fast_forward() && !no_ff {
            let target_oid = annotated.id();
            let mut head_ref = self
                .repo
                .head()
                .map_err(|e| GitError::from_git2(e, "HEAD"))?;
            head_ref
                .set_target(target_oid, "gitflow: fast-forward merge")
                .map_err(|e| GitError::from_git2(e, reference))?;
            let mut opts = git2::build::CheckoutBuilder::new();
            opts.force();
            self.repo
                .checkout_head(Some(&mut opts))
                .map_err(|e| GitError::from_git2(e, reference))?;
            return Ok(MergeOutcome::Completed);
        }

        self.repo
            .merge(&[&annotated], None, None)
            .map_err(|e| GitError::from_git2(e, reference))?;

        if self.has_conflicts()? {
            return Ok(MergeOutcome::Conflicted);
        }

        self.commit(message, no_verify)?;
        self.repo
            .cleanup_state()
            .map_err(|e| GitError::from_git2(e, reference))?;

        Ok(MergeOutcome::Completed)
    }

    /// Squash-merge `reference` into HEAD with an explicit commit message.
    ///
    /// Uses the `git` subprocess: git2 has no porcelain equivalent of
    /// `git merge --squash`, which stages the diff without recording parentage.
    pub fn merge_squash_with_message(
        &self,
        reference: &str,
        message: &str,
        no_verify: bool,
    ) -> Result<MergeOutcome, GitError> {
        let status = self.run_git_status(&["merge", "--squash", reference])?;

        if !status.success() {
            if self.has_conflicts().unwrap_or(false) {
                return Ok(MergeOutcome::Conflicted);
            }
            return Err(GitError::MergeConflict {
                reference: reference.to_string(),
            });
        }

        let mut args = vec!["commit", "-m", message];
        if no_verify {
            args.push("--no-verify");
        }
        self.run_git(&args, "squash merge commit")?;

        Ok(MergeOutcome::Completed)
    }

    /// Abort an in-progress merge, restoring the pre-merge working tree.
    pub fn merge_abort(&self) -> Result<(), GitError> {
        match self.run_git_status(&["merge", "--abort"]) {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(GitError::ProcessFailed {
                code: status.code(),
                stderr: "merge --abort failed".to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Rebasing
    // =========================================================================

    /// Rebase HEAD onto `onto`, optionally preserving merge commits.
    ///
    /// Implemented via subprocess: resumable interactive-style rebase with
    /// typed conflict reporting is awkward to drive correctly through git2's
    /// mid-level rebase API.
    pub fn rebase(&self, onto: &str, preserve_merges: bool) -> Result<MergeOutcome, GitError> {
        let mut args = vec!["rebase".to_string()];
        if preserve_merges {
            args.push("--rebase-merges".to_string());
        }
        args.push(onto.to_string());

        let status = self.run_git_status(&args.iter().map(String::as_str).collect::<Vec<_>>())?;

        if status.success() {
            return Ok(MergeOutcome::Completed);
        }
        if matches!(self.state(), GitState::Rebase { .. }) || self.has_conflicts().unwrap_or(false)
        {
            return Ok(MergeOutcome::Conflicted);
        }
        Err(GitError::RebaseConflict {
            onto: onto.to_string(),
        })
    }

    /// Continue an in-progress rebase after conflicts have been resolved and staged.
    pub fn rebase_continue(&self) -> Result<MergeOutcome, GitError> {
        if !self.state().is_in_progress() {
            return Err(GitError::NoRebaseInProgress);
        }

        let status = self.run_git_status(&["rebase", "--continue"])?;
        if status.success() {
            return Ok(MergeOutcome::Completed);
        }
        if self.has_conflicts().unwrap_or(false) {
            return Ok(MergeOutcome::Conflicted);
        }
        Err(GitError::ProcessFailed {
            code: status.code(),
            stderr: "rebase --continue failed".to_string(),
        })
    }

    /// Abort an in-progress rebase, restoring the pre-rebase branch tip.
    pub fn rebase_abort(&self) -> Result<(), GitError> {
        if !self.state().is_in_progress() {
            return Err(GitError::NoRebaseInProgress);
        }

        let status = self.run_git_status(&["rebase", "--abort"])?;
        if status.success() {
            Ok(())
        } else {
            Err(GitError::ProcessFailed {
                code: status.code(),
                stderr: "rebase --abort failed".to_string(),
            })
        }
    }

    // =========================================================================
    // Commits
    // =========================================================================

    /// Commit the current index against HEAD with the given message.
    pub fn commit(&self, message: &str, no_verify: bool) -> Result<Oid, GitError> {
        if !no_verify {
            self.run_pre_commit_hook()?;
        }

        let mut index = self.repo.index().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        let tree_oid = index.write_tree().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        let tree = self.repo.find_tree(tree_oid).map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let signature = self.repo.signature().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let parent_commit = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Run the repository's `pre-commit` hook, if present and executable.
    /// `no_verify=true` callers should not call this at all; kept private so
    /// the bypass is only ever expressed at the `commit` call site.
    fn run_pre_commit_hook(&self) -> Result<(), GitError> {
        let Some(workdir) = self.repo.workdir() else {
            return Ok(());
        };
        let hook = self.repo.path().join("hooks").join("pre-commit");
        if !is_executable(&hook) {
            return Ok(());
        }
        let status = Command::new(&hook)
            .current_dir(workdir)
            .status()
            .map_err(|e| GitError::ProcessSpawnFailed {
                message: e.to_string(),
            })?;
        if !status.success() {
            return Err(GitError::ProcessFailed {
                code: status.code(),
                stderr: "pre-commit hook failed".to_string(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Tagging
    // =========================================================================

    /// Create an annotated tag, optionally GPG-signed.
    ///
    /// Signing is implemented via subprocess since git2 does not itself
    /// perform GPG signing (it would require embedding a GPG client).
    pub fn create_tag(
        &self,
        name: &str,
        message: Option<&str>,
        message_file: Option<&Path>,
        sign: bool,
        signing_key: Option<&str>,
    ) -> Result<Oid, GitError> {
        if sign {
            let mut args = vec!["tag".to_string(), "-s".to_string()];
            if let Some(key) = signing_key {
                args.push("-u".to_string());
                args.push(key.to_string());
            }
            if let Some(path) = message_file {
                args.push("-F".to_string());
                args.push(path.display().to_string());
            } else if let Some(msg) = message {
                args.push("-m".to_string());
                args.push(msg.to_string());
            }
            args.push(name.to_string());
            self.run_git(&args.iter().map(String::as_str).collect::<Vec<_>>(), "signed tag")?;
            return self.resolve_ref(&format!("refs/tags/{name}"));
        }

        let message = if let Some(path) = message_file {
            std::fs::read_to_string(path).map_err(|e| GitError::AccessError {
                message: e.to_string(),
            })?
        } else {
            message.unwrap_or_default().to_string()
        };

        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let signature = self.repo.signature().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let oid = self
            .repo
            .tag(name, head.as_object(), &signature, &message, false)
            .map_err(|e| GitError::from_git2(e, name))?;

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    // =========================================================================
    // Remote Sync
    // =========================================================================

    /// Fetch all refs from a remote.
    pub fn fetch(&self, remote: &str) -> Result<(), GitError> {
        self.run_git(&["fetch", remote], &format!("fetch {remote}"))?;
        Ok(())
    }

    /// Fetch a single branch from a remote. Non-fatal if the branch doesn't
    /// exist on the remote.
    pub fn fetch_branch(&self, remote: &str, name: &BranchName) -> Result<(), GitError> {
        let refspec = format!("{0}:{0}", name.as_str());
        let _ = self.run_git(&["fetch", remote, &refspec], "fetch branch");
        Ok(())
    }

    /// Push a local branch to a remote.
    pub fn push_branch(&self, remote: &str, name: &BranchName) -> Result<(), GitError> {
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", name.as_str());
        self.run_git(&["push", remote, &refspec], "push branch")?;
        Ok(())
    }

    /// The name of the remote tracking branch for a local branch, if configured.
    pub fn get_tracking_branch(&self, name: &BranchName) -> Result<Option<String>, GitError> {
        let branch = match self.repo.find_branch(name.as_str(), git2::BranchType::Local) {
            Ok(b) => b,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match branch.upstream() {
            Ok(upstream) => Ok(upstream.name().ok().flatten().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Compare a local branch against its tracking branch.
    ///
    /// Returns [`SyncStatus::NoTracking`] if there is no tracking branch, and
    /// otherwise the relationship plus how many commits separate them (the
    /// larger of ahead/behind counts for `Diverged`).
    pub fn compare_with_remote(&self, name: &BranchName) -> Result<(SyncStatus, usize), GitError> {
        let Some(upstream_name) = self.get_tracking_branch(name)? else {
            return Ok((SyncStatus::NoTracking, 0));
        };

        let local_oid = self.resolve_ref(&format!("refs/heads/{}", name.as_str()))?;
        let Some(upstream_oid) = self.try_resolve_ref(&format!("refs/remotes/{upstream_name}"))?
        else {
            return Ok((SyncStatus::NoTracking, 0));
        };

        if local_oid == upstream_oid {
            return Ok((SyncStatus::Equal, 0));
        }

        let local_g = git2::Oid::from_str(local_oid.as_str())?;
        let upstream_g = git2::Oid::from_str(upstream_oid.as_str())?;
        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(local_g, upstream_g)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;

        match (ahead, behind) {
            (0, 0) => Ok((SyncStatus::Equal, 0)),
            (a, 0) => Ok((SyncStatus::Ahead, a)),
            (0, b) => Ok((SyncStatus::Behind, b)),
            (a, b) => Ok((SyncStatus::Diverged, a.max(b))),
        }
    }

    // =========================================================================
    // Config
    // =========================================================================

    /// Read a config value through git2's default merged view.
    pub fn get_config(&self, key: &str) -> Result<Option<String>, GitError> {
        let config = self.repo.config().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        match config.get_string(key) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a config value in the repository's local config.
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        let mut config = self.repo.config().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        config.set_str(key, value).map_err(|e| e.into())
    }

    /// Unset a single config key.
    pub fn unset_config(&self, key: &str) -> Result<(), GitError> {
        let mut config = self.repo.config().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        match config.remove(key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Unset every key under a `prefix.` section. Absence of the section is not an error.
    pub fn unset_config_section(&self, prefix: &str) -> Result<(), GitError> {
        let mut config = self.repo.config().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        let glob = format!("^{}\\..*", regex_lite_escape(prefix));
        match config.remove_multivar(prefix, &glob) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// The repository's common git directory (the main repo's `.git`, even
    /// from within a linked worktree).
    pub fn get_git_common_dir(&self) -> PathBuf {
        self.repo.commondir().to_path_buf()
    }

    // =========================================================================
    // Subprocess Escape Hatch
    // =========================================================================

    /// Run `git <args>` in the working directory, returning an error on non-zero exit.
    fn run_git(&self, args: &[&str], description: &str) -> Result<String, GitError> {
        let workdir = self.repo.workdir().ok_or(GitError::BareRepo)?;
        let output = Command::new("git")
            .args(args)
            .current_dir(workdir)
            .output()
            .map_err(|e| GitError::ProcessSpawnFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(GitError::ProcessFailed {
                code: output.status.code(),
                stderr: format!(
                    "{description}: {}",
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run `git <args>`, returning the exit status regardless of success so
    /// the caller can distinguish "conflicted" from "hard failure."
    fn run_git_status(&self, args: &[&str]) -> Result<std::process::ExitStatus, GitError> {
        let workdir = self.repo.workdir().ok_or(GitError::BareRepo)?;
        Command::new("git")
            .args(args)
            .current_dir(workdir)
            .status()
            .map_err(|e| GitError::ProcessSpawnFailed {
                message: e.to_string(),
            })
    }

    // =========================================================================
    // CAS Ref Operations
    // =========================================================================

    /// Update a ref with compare-and-swap semantics.
    ///
    /// The update only succeeds if the ref's current value matches `expected_old`.
    /// If `expected_old` is `None`, the ref must not exist (create case).
    ///
    /// This is the **only** way to update refs in gitflow, ensuring correctness
    /// even when the repository is modified externally.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    ///
    /// # Example
    ///
    /// ```ignore
    /// // Create a new ref (must not exist)
    /// git.update_ref_cas(
    ///     "refs/heads/feature/login",
    ///     &new_oid,
    ///     None,  // Must not exist
    ///     "gitflow: create branch"
    /// )?;
    ///
    /// // Update existing ref (must match expected)
    /// git.update_ref_cas(
    ///     "refs/heads/develop",
    ///     &new_oid,
    ///     Some(&old_oid),
    ///     "gitflow: fast-forward"
    /// )?;
    /// ```
    pub fn update_ref_cas(
        &self,
        refname: &str,
        new_oid: &Oid,
        expected_old: Option<&Oid>,
        message: &str,
    ) -> Result<(), GitError> {
        // Check current value
        let current = self.try_resolve_ref_raw(refname)?;

        // Verify CAS precondition
        match (expected_old, current.as_ref()) {
            (Some(expected), Some(actual)) if expected.as_str() != actual => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected.to_string(),
                    actual: actual.clone(),
                });
            }
            (Some(expected), None) => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected.to_string(),
                    actual: "<none>".to_string(),
                });
            }
            (None, Some(actual)) => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: "<none>".to_string(),
                    actual: actual.clone(),
                });
            }
            _ => {} // Precondition satisfied
        }

        // Perform the update
        let oid = git2::Oid::from_str(new_oid.as_str())
            .map_err(|e| GitError::from_git2(e, new_oid.as_str()))?;

        self.repo
            .reference(refname, oid, true, message)
            .map_err(|e| GitError::from_git2(e, refname))?;

        Ok(())
    }

    /// Delete a ref with compare-and-swap semantics.
    ///
    /// The delete only succeeds if the ref's current value matches `expected_old`.
    ///
    /// # Errors
    ///
    /// - [`GitError::CasFailed`] if the current value doesn't match expected
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn delete_ref_cas(&self, refname: &str, expected_old: &Oid) -> Result<(), GitError> {
        // Check current value
        let current = self.try_resolve_ref_raw(refname)?;

        match current {
            None => {
                return Err(GitError::RefNotFound {
                    refname: refname.to_string(),
                });
            }
            Some(actual) if actual != expected_old.as_str() => {
                return Err(GitError::CasFailed {
                    refname: refname.to_string(),
                    expected: expected_old.to_string(),
                    actual,
                });
            }
            _ => {} // Precondition satisfied
        }

        // Find and delete the reference
        let mut reference = self
            .repo
            .find_reference(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;

        reference
            .delete()
            .map_err(|e| GitError::from_git2(e, refname))?;

        Ok(())
    }

    /// Resolve a ref to its target OID without peeling to commit.
    ///
    /// Unlike `resolve_ref` which peels through tags to commits, this method
    /// returns the direct target of the ref.
    ///
    /// Returns `Ok(None)` if the ref doesn't exist.
    ///
    /// # Example
    ///
    /// ```ignore
    /// if let Some(oid) = git.try_resolve_ref_to_object("refs/tags/v1.0.0")? {
    ///     println!("tag points at {}", oid.short(7));
    /// }
    /// ```
    pub fn try_resolve_ref_to_object(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                // Resolve symbolic refs to final target
                let resolved = reference.resolve().unwrap_or(reference);
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(Oid::new(oid.to_string())?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Try to resolve a ref to its raw OID string (without validation).
    ///
    /// Used internally for CAS operations where we need the raw value.
    fn try_resolve_ref_raw(&self, refname: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                // Get the target OID - for symbolic refs, resolve to final target
                let resolved = reference.resolve().unwrap_or(reference);
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(oid.to_string()))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    // =========================================================================
    // Ancestry Queries
    // =========================================================================

    /// Find the merge base (common ancestor) of two commits.
    ///
    /// Returns `None` if there is no common ancestor.
    ///
    /// # Example
    ///
    /// ```ignore
    /// if let Some(base) = git.merge_base(&oid1, &oid2)? {
    ///     println!("Common ancestor: {}", base.short(7));
    /// }
    /// ```
    pub fn merge_base(&self, oid1: &Oid, oid2: &Oid) -> Result<Option<Oid>, GitError> {
        let git_oid1 = git2::Oid::from_str(oid1.as_str())
            .map_err(|e| GitError::from_git2(e, oid1.as_str()))?;
        let git_oid2 = git2::Oid::from_str(oid2.as_str())
            .map_err(|e| GitError::from_git2(e, oid2.as_str()))?;

        match self.repo.merge_base(git_oid1, git_oid2) {
            Ok(oid) => Ok(Some(Oid::new(oid.to_string())?)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant (a commit is its own ancestor).
    ///
    /// # Example
    ///
    /// ```ignore
    /// if git.is_ancestor(&base_oid, &tip_oid)? {
    ///     println!("base is an ancestor of tip");
    /// }
    /// ```
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        // A commit is its own ancestor
        if ancestor == descendant {
            return Ok(true);
        }

        let ancestor_oid = git2::Oid::from_str(ancestor.as_str())
            .map_err(|e| GitError::from_git2(e, ancestor.as_str()))?;
        let descendant_oid = git2::Oid::from_str(descendant.as_str())
            .map_err(|e| GitError::from_git2(e, descendant.as_str()))?;

        self.repo
            .graph_descendant_of(descendant_oid, ancestor_oid)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })
    }

    /// Count commits between two OIDs.
    ///
    /// Counts commits reachable from `tip` but not from `base`.
    /// Useful for determining if a branch has commits beyond its base.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let count = git.commit_count(&base, &tip)?;
    /// if count == 0 {
    ///     println!("Branch has no unique commits");
    /// }
    /// ```
    pub fn commit_count(&self, base: &Oid, tip: &Oid) -> Result<usize, GitError> {
        let base_oid = git2::Oid::from_str(base.as_str())
            .map_err(|e| GitError::from_git2(e, base.as_str()))?;
        let tip_oid =
            git2::Oid::from_str(tip.as_str()).map_err(|e| GitError::from_git2(e, tip.as_str()))?;

        let mut revwalk = self.repo.revwalk().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        revwalk.push(tip_oid).map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        revwalk.hide(base_oid).map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        let count = revwalk.count();
        Ok(count)
    }

    // =========================================================================
    // Blob Operations
    // =========================================================================

    /// Write content as a blob and return its OID.
    ///
    /// Used for storing metadata as Git objects.
    pub fn write_blob(&self, content: &[u8]) -> Result<Oid, GitError> {
        let oid = self.repo.blob(content).map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        Oid::new(oid.to_string()).map_err(|e| e.into())
    }

    /// Read a blob by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the blob doesn't exist
    pub fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let blob = self
            .repo
            .find_blob(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        Ok(blob.content().to_vec())
    }

    /// Read a blob as UTF-8 string.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the blob doesn't exist
    /// - [`GitError::InvalidUtf8`] if the blob is not valid UTF-8
    pub fn read_blob_as_string(&self, oid: &Oid) -> Result<String, GitError> {
        let content = self.read_blob(oid)?;
        String::from_utf8(content).map_err(|_| GitError::InvalidUtf8 {
            oid: oid.to_string(),
        })
    }

    // =========================================================================
    // Commit Information
    // =========================================================================

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let author = commit.author();
        let author_time = chrono::DateTime::from_timestamp(author.when().seconds(), 0)
            .unwrap_or(chrono::DateTime::UNIX_EPOCH)
            .with_timezone(&chrono::Utc);

        Ok(CommitInfo {
            oid: oid.clone(),
            summary: commit.summary().unwrap_or("").to_string(),
            message: commit.message().unwrap_or("").to_string(),
            author_name: author.name().unwrap_or("").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            author_time,
        })
    }

    /// Get the parent OIDs of a commit.
    ///
    /// Returns empty vec for root commits, multiple OIDs for merge commits.
    pub fn commit_parents(&self, oid: &Oid) -> Result<Vec<Oid>, GitError> {
        let git_oid =
            git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let commit = self
            .repo
            .find_commit(git_oid)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let mut parents = Vec::new();
        for parent in commit.parents() {
            parents.push(Oid::new(parent.id().to_string())?);
        }

        Ok(parents)
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::Internal {
                message: e.message().to_string(),
            }),
        }
    }

    /// Get the default remote name (usually "origin").
    ///
    /// Returns the first remote found, or `None` if no remotes exist.
    pub fn default_remote(&self) -> Result<Option<String>, GitError> {
        let remotes = self.repo.remotes().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;

        // Prefer "origin" if it exists
        for name in remotes.iter().flatten() {
            if name == "origin" {
                return Ok(Some(name.to_string()));
            }
        }

        // Otherwise return first remote
        Ok(remotes.iter().flatten().next().map(String::from))
    }

}

/// Whether a path exists and has at least one execute bit set.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.exists()
}

/// Escape the handful of regex metacharacters that can appear in a config
/// key prefix, so `remove_multivar`'s glob argument matches it literally.
fn regex_lite_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
