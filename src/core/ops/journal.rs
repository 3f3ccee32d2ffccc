//! core::ops::journal
//!
//! A durable, append-only record of the ref updates, tag creations, config
//! writes, and git subprocess calls a single command invocation makes. This
//! exists so that a crash or Ctrl-C mid-operation leaves behind a trail an
//! operator (or a future `gitflow` invocation) can inspect, even though the
//! actual crash-resume logic for `finish`/`update` lives in
//! [`crate::core::merge_state`]. The journal is a forensic log, not a
//! transaction log: nothing here is replayed automatically.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::UtcTimestamp;

/// Errors from reading or writing the operation journal.
#[derive(Debug, Error)]
pub enum JournalError {
    /// Filesystem error reading or writing a journal file.
    #[error("journal I/O error: {0}")]
    Io(#[from] io::Error),

    /// A journal file existed but was not valid JSON for its expected schema.
    #[error("journal JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No journal entry exists for the given operation id.
    #[error("no journal entry found for operation {0}")]
    NotFound(String),

    /// The journal was asked to transition into an invalid state.
    #[error("invalid journal state transition: {0}")]
    InvalidState(String),
}

/// A unique identifier for one command invocation's journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId(String);

impl OpId {
    /// Generate a fresh, random operation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an already-known id string (e.g. read back from disk).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The id as a plain string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle phase of a journaled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpPhase {
    /// Steps are actively being recorded.
    InProgress,
    /// The operation stopped on a conflict and is waiting for `--continue`/`--abort`.
    Paused,
    /// The operation finished successfully.
    Committed,
    /// The operation was aborted and any partial state was discarded.
    RolledBack,
}

impl OpPhase {
    /// Whether this phase represents a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, OpPhase::Committed | OpPhase::RolledBack)
    }

    /// Whether a `--continue`/`--abort` can legally act on this phase.
    pub fn is_resumable(&self) -> bool {
        matches!(self, OpPhase::Paused)
    }

    /// Whether steps can still be appended to this phase.
    pub fn is_active(&self) -> bool {
        matches!(self, OpPhase::InProgress | OpPhase::Paused)
    }
}

/// One recorded step within a journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalStep {
    /// The step's payload.
    pub kind: StepKind,
    /// When the step was recorded.
    pub timestamp: UtcTimestamp,
}

/// The kind of a single journaled step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// A ref was moved via compare-and-swap.
    RefUpdate {
        /// The full ref name that was updated.
        refname: String,
        /// The ref's previous target, if it existed.
        old_oid: Option<String>,
        /// The ref's new target.
        new_oid: String,
    },
    /// A tag was created.
    TagCreate {
        /// The tag's full ref name.
        name: String,
        /// The object the tag points at.
        oid: String,
    },
    /// A config key was set, recording its prior value for diagnostics.
    ConfigWrite {
        /// The config key written.
        key: String,
        /// The key's previous value, if any.
        old_value: Option<String>,
        /// The value written.
        new_value: String,
    },
    /// A config key was removed.
    ConfigDelete {
        /// The config key removed.
        key: String,
        /// The key's value before removal, if known.
        old_value: Option<String>,
    },
    /// A named checkpoint, marking a point the operation can be reasoned about from.
    Checkpoint {
        /// The checkpoint's name.
        name: String,
    },
    /// A git subprocess was invoked (the hybrid-driver escape hatch).
    GitProcess {
        /// The argv passed to `git`.
        args: Vec<String>,
        /// A human-readable description of why.
        description: String,
    },
    /// The operation paused on an unresolved merge/rebase conflict.
    ConflictPaused {
        /// The branch being merged/rebased when the conflict occurred.
        branch: String,
        /// A description of the git state at the time (e.g. "rebase 2/5").
        git_state: String,
    },
}

/// A single command invocation's durable operation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    /// This journal entry's unique id.
    pub op_id: OpId,
    /// The command that created this entry (e.g. `"feature finish"`).
    pub command: String,
    /// When the operation started.
    pub started_at: UtcTimestamp,
    /// When the operation reached a terminal phase, if it has.
    pub finished_at: Option<UtcTimestamp>,
    /// The operation's current lifecycle phase.
    pub phase: OpPhase,
    /// The steps recorded so far, in order.
    pub steps: Vec<JournalStep>,
}

impl Journal {
    /// Start a new, empty journal entry for the given command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            op_id: OpId::new(),
            command: command.into(),
            started_at: UtcTimestamp::now(),
            finished_at: None,
            phase: OpPhase::InProgress,
            steps: Vec::new(),
        }
    }

    /// The directory journal entries are stored under, given the repository's
    /// common git dir.
    pub fn ops_dir(git_dir: &Path) -> PathBuf {
        git_dir.join("gitflow").join("ops")
    }

    /// The file path this entry is (or would be) persisted at.
    pub fn file_path(&self, git_dir: &Path) -> PathBuf {
        Self::ops_dir(git_dir).join(format!("{}.json", self.op_id))
    }

    /// Append a step, stamping it with the current time.
    pub fn add_step(&mut self, kind: StepKind) {
        self.steps.push(JournalStep {
            kind,
            timestamp: UtcTimestamp::now(),
        });
    }

    /// Record a ref compare-and-swap update.
    pub fn record_ref_update(
        &mut self,
        refname: impl Into<String>,
        old_oid: Option<String>,
        new_oid: impl Into<String>,
    ) {
        self.add_step(StepKind::RefUpdate {
            refname: refname.into(),
            old_oid,
            new_oid: new_oid.into(),
        });
    }

    /// Record a tag creation.
    pub fn record_tag_create(&mut self, name: impl Into<String>, oid: impl Into<String>) {
        self.add_step(StepKind::TagCreate {
            name: name.into(),
            oid: oid.into(),
        });
    }

    /// Record a config key write.
    pub fn record_config_write(
        &mut self,
        key: impl Into<String>,
        old_value: Option<String>,
        new_value: impl Into<String>,
    ) {
        self.add_step(StepKind::ConfigWrite {
            key: key.into(),
            old_value,
            new_value: new_value.into(),
        });
    }

    /// Record a config key deletion.
    pub fn record_config_delete(&mut self, key: impl Into<String>, old_value: Option<String>) {
        self.add_step(StepKind::ConfigDelete {
            key: key.into(),
            old_value,
        });
    }

    /// Record a named checkpoint.
    pub fn record_checkpoint(&mut self, name: impl Into<String>) {
        self.add_step(StepKind::Checkpoint { name: name.into() });
    }

    /// Record a git subprocess invocation.
    pub fn record_git_process(&mut self, args: Vec<String>, description: impl Into<String>) {
        self.add_step(StepKind::GitProcess {
            args,
            description: description.into(),
        });
    }

    /// Record that the operation paused on a conflict, and move the phase to
    /// [`OpPhase::Paused`].
    pub fn record_conflict_paused(&mut self, branch: impl Into<String>, git_state: impl Into<String>) {
        self.add_step(StepKind::ConflictPaused {
            branch: branch.into(),
            git_state: git_state.into(),
        });
        self.phase = OpPhase::Paused;
    }

    /// Mark the operation as successfully completed.
    pub fn commit(&mut self) {
        self.phase = OpPhase::Committed;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Mark the operation as aborted.
    pub fn rollback(&mut self) {
        self.phase = OpPhase::RolledBack;
        self.finished_at = Some(UtcTimestamp::now());
    }

    /// Persist this entry, fsyncing the file so it survives a crash immediately after.
    pub fn write(&self, git_dir: &Path) -> Result<(), JournalError> {
        let dir = Self::ops_dir(git_dir);
        fs::create_dir_all(&dir)?;
        let path = self.file_path(git_dir);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, &json)?;
        let file = File::open(&path)?;
        file.sync_all()?;
        Ok(())
    }

    /// Read back a previously written entry by id.
    pub fn read(git_dir: &Path, op_id: &OpId) -> Result<Journal, JournalError> {
        let path = Self::ops_dir(git_dir).join(format!("{op_id}.json"));
        if !path.exists() {
            return Err(JournalError::NotFound(op_id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// List all journal entries, newest (by mtime) first.
    pub fn list(git_dir: &Path) -> Result<Vec<Journal>, JournalError> {
        let dir = Self::ops_dir(git_dir);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let content = fs::read_to_string(&path)?;
            let journal: Journal = serde_json::from_str(&content)?;
            entries.push((modified, journal));
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries.into_iter().map(|(_, j)| j).collect())
    }

    /// The most recently written entry, if any.
    pub fn most_recent(git_dir: &Path) -> Result<Option<Journal>, JournalError> {
        Ok(Self::list(git_dir)?.into_iter().next())
    }

    /// Delete a journal entry's file.
    pub fn delete(git_dir: &Path, op_id: &OpId) -> Result<(), JournalError> {
        let path = Self::ops_dir(git_dir).join(format!("{op_id}.json"));
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A small, frequently-read projection of a [`Journal`], used so commands
/// can cheaply check "is something in progress" without deserializing full
/// step histories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpState {
    /// The operation this state tracks.
    pub op_id: OpId,
    /// The command that created it.
    pub command: String,
    /// Its current phase.
    pub phase: OpPhase,
    /// When this projection was last written.
    pub updated_at: UtcTimestamp,
}

impl OpState {
    /// Build a projection from a full journal entry.
    pub fn from_journal(journal: &Journal) -> Self {
        Self {
            op_id: journal.op_id.clone(),
            command: journal.command.clone(),
            phase: journal.phase,
            updated_at: UtcTimestamp::now(),
        }
    }

    /// The path this projection is persisted at.
    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join("gitflow").join("op-state.json")
    }

    /// Persist this projection.
    pub fn write(&self, git_dir: &Path) -> Result<(), JournalError> {
        let path = Self::path(git_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(())
    }

    /// Read back the persisted projection, if any.
    pub fn read(git_dir: &Path) -> Result<Option<OpState>, JournalError> {
        let path = Self::path(git_dir);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Remove the persisted projection.
    pub fn remove(git_dir: &Path) -> Result<(), JournalError> {
        let path = Self::path(git_dir);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a projection file currently exists.
    pub fn exists(git_dir: &Path) -> bool {
        Self::path(git_dir).exists()
    }

    /// Update the phase in place and re-persist.
    pub fn update_phase(&mut self, git_dir: &Path, phase: OpPhase) -> Result<(), JournalError> {
        self.phase = phase;
        self.updated_at = UtcTimestamp::now();
        self.write(git_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_journal() -> Journal {
        let mut journal = Journal::new("feature finish");
        journal.record_ref_update("refs/heads/develop", Some("aaa".to_string()), "bbb");
        journal
    }

    #[test]
    fn new_journal_is_in_progress() {
        let journal = Journal::new("feature start");
        assert_eq!(journal.phase, OpPhase::InProgress);
        assert!(journal.steps.is_empty());
        assert!(journal.finished_at.is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let journal = sample_journal();
        journal.write(dir.path()).unwrap();

        let loaded = Journal::read(dir.path(), &journal.op_id).unwrap();
        assert_eq!(loaded.op_id, journal.op_id);
        assert_eq!(loaded.steps.len(), 1);
    }

    #[test]
    fn read_missing_entry_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = Journal::read(dir.path(), &OpId::from_string("nonexistent"));
        assert!(matches!(result, Err(JournalError::NotFound(_))));
    }

    #[test]
    fn list_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let first = Journal::new("feature start");
        first.write(dir.path()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = Journal::new("feature finish");
        second.write(dir.path()).unwrap();

        let listed = Journal::list(dir.path()).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].op_id, second.op_id);
    }

    #[test]
    fn most_recent_returns_none_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Journal::most_recent(dir.path()).unwrap().is_none());
    }

    #[test]
    fn delete_removes_entry() {
        let dir = tempfile::tempdir().unwrap();
        let journal = sample_journal();
        journal.write(dir.path()).unwrap();
        Journal::delete(dir.path(), &journal.op_id).unwrap();
        assert!(matches!(
            Journal::read(dir.path(), &journal.op_id),
            Err(JournalError::NotFound(_))
        ));
    }

    #[test]
    fn delete_missing_entry_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Journal::delete(dir.path(), &OpId::from_string("ghost")).is_ok());
    }

    #[test]
    fn commit_sets_phase_and_finished_at() {
        let mut journal = sample_journal();
        journal.commit();
        assert_eq!(journal.phase, OpPhase::Committed);
        assert!(journal.finished_at.is_some());
        assert!(journal.phase.is_finished());
    }

    #[test]
    fn rollback_sets_phase_and_finished_at() {
        let mut journal = sample_journal();
        journal.rollback();
        assert_eq!(journal.phase, OpPhase::RolledBack);
        assert!(journal.phase.is_finished());
    }

    #[test]
    fn conflict_paused_sets_phase() {
        let mut journal = sample_journal();
        journal.record_conflict_paused("feature/login", "rebase 2/5");
        assert_eq!(journal.phase, OpPhase::Paused);
        assert!(journal.phase.is_resumable());
        match &journal.steps.last().unwrap().kind {
            StepKind::ConflictPaused { branch, git_state } => {
                assert_eq!(branch, "feature/login");
                assert_eq!(git_state, "rebase 2/5");
            }
            other => panic!("unexpected step kind: {other:?}"),
        }
    }

    #[test]
    fn record_tag_create_appends_step() {
        let mut journal = sample_journal();
        journal.record_tag_create("refs/tags/v1.0.0", "ccc");
        match &journal.steps.last().unwrap().kind {
            StepKind::TagCreate { name, oid } => {
                assert_eq!(name, "refs/tags/v1.0.0");
                assert_eq!(oid, "ccc");
            }
            other => panic!("unexpected step kind: {other:?}"),
        }
    }

    #[test]
    fn record_config_write_and_delete_append_steps() {
        let mut journal = sample_journal();
        journal.record_config_write("gitflow.branch.feature.prefix", None, "feature/");
        journal.record_config_delete(
            "gitflow.branch.feature.prefix",
            Some("feature/".to_string()),
        );
        assert_eq!(journal.steps.len(), 3);
        assert!(matches!(
            journal.steps[1].kind,
            StepKind::ConfigWrite { .. }
        ));
        assert!(matches!(
            journal.steps[2].kind,
            StepKind::ConfigDelete { .. }
        ));
    }

    #[test]
    fn op_state_write_read_remove_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let journal = sample_journal();
        let state = OpState::from_journal(&journal);
        state.write(dir.path()).unwrap();

        assert!(OpState::exists(dir.path()));
        let loaded = OpState::read(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.op_id, journal.op_id);

        OpState::remove(dir.path()).unwrap();
        assert!(!OpState::exists(dir.path()));
    }

    #[test]
    fn op_state_update_phase_persists() {
        let dir = tempfile::tempdir().unwrap();
        let journal = sample_journal();
        let mut state = OpState::from_journal(&journal);
        state.write(dir.path()).unwrap();
        state.update_phase(dir.path(), OpPhase::Paused).unwrap();

        let loaded = OpState::read(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.phase, OpPhase::Paused);
    }

    #[test]
    fn ops_dir_and_paths_use_gitflow_segment() {
        let git_dir = PathBuf::from("/repo/.git");
        assert_eq!(Journal::ops_dir(&git_dir), git_dir.join("gitflow").join("ops"));
        assert_eq!(
            OpState::path(&git_dir),
            git_dir.join("gitflow").join("op-state.json")
        );
    }
}
