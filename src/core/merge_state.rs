//! core::merge_state
//!
//! Durable state for an in-progress `finish` or `update`, making the state
//! machine crash-safe and resumable across process invocations.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::topology::{DownstreamStrategy, UpstreamStrategy};

/// Errors from the merge-state store.
#[derive(Debug, Error)]
pub enum MergeStateError {
    /// Filesystem error reading or writing the state file.
    #[error("merge-state I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted state file was not valid JSON or did not match the schema.
    #[error("corrupt merge-state file at {path}: {source}")]
    Corrupt {
        /// The path that failed to parse.
        path: PathBuf,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Which top-level command created this state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// A `finish` run.
    Finish,
    /// An `update` run.
    Update,
}

/// A step in the finish state machine. Serialized as a string; in-memory
/// comparisons are total over this closed sum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FinishStep {
    /// Merge, rebase, or squash the topic into its parent.
    Merge,
    /// Create the release/feature tag, if configured.
    CreateTag,
    /// Cascade the update to dependent base branches.
    UpdateChildren,
    /// Delete the finished topic branch.
    DeleteBranch,
}

impl FinishStep {
    /// All steps in their fixed order, used by the progress renderer.
    pub const ALL: [FinishStep; 4] = [
        FinishStep::Merge,
        FinishStep::CreateTag,
        FinishStep::UpdateChildren,
        FinishStep::DeleteBranch,
    ];

    /// A short, human-readable label for the progress diagram.
    pub fn label(&self) -> &'static str {
        match self {
            FinishStep::Merge => "merge topic into parent",
            FinishStep::CreateTag => "create tag",
            FinishStep::UpdateChildren => "update dependent branches",
            FinishStep::DeleteBranch => "delete topic branch",
        }
    }
}

/// The durable, resumable state of an in-progress `finish` or `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeState {
    /// Which command created this state.
    pub action: Action,
    /// The branch type name (e.g. `feature`).
    pub branch_type: String,
    /// The short branch name (e.g. `login`).
    pub branch_name: String,
    /// The full branch name (`prefix + branch_name`).
    pub full_branch_name: String,
    /// The parent branch this run merges into.
    pub parent_branch: String,
    /// The step currently in flight or about to run next.
    pub current_step: FinishStep,
    /// The merge strategy in force for the current step.
    pub merge_strategy: UpstreamStrategy,
    /// Base branches pending auto-update, frozen at finish start.
    pub child_branches: Vec<String>,
    /// Each child's downstream strategy, frozen at finish start.
    pub child_strategies: BTreeMap<String, DownstreamStrategy>,
    /// Children whose update has already completed.
    pub updated_branches: BTreeSet<String>,
    /// The child currently mid-update, if any.
    pub current_child_branch: Option<String>,
    /// Captured squash commit message template.
    pub squash_message: Option<String>,
    /// Captured merge commit message template.
    pub merge_message: Option<String>,
    /// Captured child-update commit message template.
    pub update_message: Option<String>,
    /// Whether commit hooks should be bypassed, captured at finish start.
    pub no_verify: bool,
    /// Whether merge commits within the topic should be preserved (rebase only).
    pub preserve_merges: bool,
    /// Whether to force a merge commit even when a fast-forward is possible.
    pub no_fast_forward: bool,
    /// Whether a tag should be created once the merge step completes.
    pub should_tag: bool,
    /// The tag name to use if `should_tag`.
    pub tag_name: String,
    /// The tag message to use if `should_tag`.
    pub tag_message: String,
    /// An optional file containing the tag message.
    pub message_file: Option<PathBuf>,
    /// Whether the tag should be GPG-signed.
    pub should_sign: bool,
    /// The signing key to use, if any.
    pub signing_key: Option<String>,
    /// Keep the local topic branch after finish.
    pub keep_local: bool,
    /// Keep the remote topic branch after finish.
    pub keep_remote: bool,
    /// Force-delete even if not fully merged.
    pub force_delete: bool,
    /// The remote to delete the topic branch from, if `!keep_remote`.
    pub remote: String,
}

impl MergeState {
    /// The path this state is persisted at, given the repository's common git dir.
    pub fn path(git_common_dir: &Path) -> PathBuf {
        git_common_dir.join("gitflow").join("state").join("merge.json")
    }

    /// Whether a merge state is currently persisted for this repository.
    pub fn is_in_progress(git_common_dir: &Path) -> bool {
        Self::path(git_common_dir).exists()
    }

    /// Load the persisted state, if any.
    pub fn load(git_common_dir: &Path) -> Result<Option<MergeState>, MergeStateError> {
        let path = Self::path(git_common_dir);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let state = serde_json::from_str(&content).map_err(|source| MergeStateError::Corrupt {
            path: path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Persist this state atomically (write to a temp file, then rename).
    pub fn save(&self, git_common_dir: &Path) -> Result<(), MergeStateError> {
        let path = Self::path(git_common_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).expect("MergeState always serializes");
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Remove the persisted state, if present.
    pub fn clear(git_common_dir: &Path) -> Result<(), MergeStateError> {
        let path = Self::path(git_common_dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark a child as updated and clear `current_child_branch`.
    pub fn complete_child(&mut self, child: &str) {
        self.updated_branches.insert(child.to_string());
        if self.current_child_branch.as_deref() == Some(child) {
            self.current_child_branch = None;
        }
    }

    /// The next child pending update, if any.
    pub fn next_pending_child(&self) -> Option<&str> {
        self.child_branches
            .iter()
            .find(|c| !self.updated_branches.contains(*c))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> MergeState {
        let mut child_strategies = BTreeMap::new();
        child_strategies.insert("develop".to_string(), DownstreamStrategy::Merge);

        MergeState {
            action: Action::Finish,
            branch_type: "feature".to_string(),
            branch_name: "login".to_string(),
            full_branch_name: "feature/login".to_string(),
            parent_branch: "develop".to_string(),
            current_step: FinishStep::Merge,
            merge_strategy: UpstreamStrategy::Merge,
            child_branches: vec!["develop".to_string()],
            child_strategies,
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
            keep_remote: false,
            force_delete: false,
            remote: "origin".to_string(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state();
        state.save(dir.path()).unwrap();

        assert!(MergeState::is_in_progress(dir.path()));
        let loaded = MergeState::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = sample_state();
        state.save(dir.path()).unwrap();
        MergeState::clear(dir.path()).unwrap();
        assert!(!MergeState::is_in_progress(dir.path()));
        assert!(MergeState::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn clear_on_absent_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MergeState::clear(dir.path()).is_ok());
    }

    #[test]
    fn complete_child_updates_sets() {
        let mut state = sample_state();
        state.current_child_branch = Some("develop".to_string());
        state.complete_child("develop");
        assert!(state.updated_branches.contains("develop"));
        assert_eq!(state.current_child_branch, None);
        assert_eq!(state.next_pending_child(), None);
    }

    #[test]
    fn next_pending_child_skips_completed() {
        let mut state = sample_state();
        state.child_branches = vec!["a".to_string(), "b".to_string()];
        state.updated_branches.insert("a".to_string());
        assert_eq!(state.next_pending_child(), Some("b"));
    }

    #[test]
    fn finish_step_ordering_is_total() {
        assert!(FinishStep::Merge < FinishStep::CreateTag);
        assert!(FinishStep::CreateTag < FinishStep::UpdateChildren);
        assert!(FinishStep::UpdateChildren < FinishStep::DeleteBranch);
    }

    #[test]
    fn corrupt_state_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = MergeState::path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            MergeState::load(dir.path()),
            Err(MergeStateError::Corrupt { .. })
        ));
    }
}
