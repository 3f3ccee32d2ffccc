//! core::ops
//!
//! Operation journaling and locking.
//!
//! # Modules
//!
//! - [`journal`] - Operation journal for crash safety and forensic auditing
//! - [`lock`] - Exclusive repository lock
//!
//! # Architecture
//!
//! Every mutating command:
//! 1. Acquires the exclusive repo lock
//! 2. Creates an operation journal before any irreversible step
//! 3. Records each step (ref update, tag creation, config write, subprocess call)
//! 4. On success: marks the journal committed
//! 5. On a merge/rebase conflict: records a `ConflictPaused` step and leaves
//!    the durable [`crate::core::merge_state::MergeState`] in place for
//!    `--continue`/`--abort` to resume from
//!
//! # Example
//!
//! ```ignore
//! use gitflow::core::ops::lock::RepoLock;
//! use gitflow::core::ops::journal::{Journal, OpState};
//!
//! // Acquire lock
//! let lock = RepoLock::acquire(git_dir)?;
//!
//! // Create journal
//! let mut journal = Journal::new("feature finish");
//!
//! // Write op-state marker
//! let op_state = OpState::from_journal(&journal);
//! op_state.write(git_dir)?;
//!
//! // Record steps as you go
//! journal.record_ref_update("refs/heads/develop", old_oid, new_oid);
//! journal.write(git_dir)?;
//!
//! // Commit on success
//! journal.commit();
//! journal.write(git_dir)?;
//! OpState::remove(git_dir)?;
//! ```

pub mod journal;
pub mod lock;

// Re-export main types for convenience
pub use journal::{Journal, JournalError, OpId, OpPhase, OpState, StepKind};
pub use lock::{LockError, RepoLock};
