//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and writes
//! flow through this interface. Direct parsing of `.git` internal files
//! outside this module is prohibited, and no other module should import `git2`
//! or spawn a `git` subprocess directly.
//!
//! Most operations go through `git2` directly: ref CAS, ancestry, blob/commit
//! reads, and config scopes. A small number of operations — interactive
//! rebase with conflict resumption, `git merge --squash`, and GPG-signed tag
//! creation — shell out to the `git` binary from inside this module, since
//! git2's mid-level APIs don't cleanly cover them. That subprocess use is an
//! implementation detail of this module, not a hole in the "single doorway"
//! boundary: every other component still only calls [`Git`]'s typed methods.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Ref operations (read, CAS update, delete)
//! - Branch operations (create, rename, delete, checkout)
//! - Merge, squash-merge, and rebase, with typed conflict reporting
//! - Tagging, including GPG signing
//! - Remote sync (fetch, push, tracking-branch comparison)
//! - Config reads/writes across scopes
//! - Object operations (read blob, write blob)
//! - Ancestry queries (merge-base, is-ancestor)
//! - Status and state detection
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - No other module calls git2 or spawns `git` directly
//! - All operations return strong types (Oid, BranchName, RefName)
//!
//! # Example
//!
//! ```ignore
//! use gitflow::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//!
//! // Query operations
//! let oid = git.resolve_ref("refs/heads/main")?;
//! let branches = git.list_branches()?;
//!
//! // CAS update (fails if ref changed since read)
//! git.update_ref_cas(
//!     "refs/heads/develop",
//!     &new_oid,
//!     Some(&old_oid),
//!     "gitflow: fast-forward"
//! )?;
//! ```

mod interface;

pub use interface::{
    CommitInfo, Git, GitError, GitState, MergeOutcome, RefEntry, RepoInfo, SyncStatus,
    WorktreeStatus,
};
