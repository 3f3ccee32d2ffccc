//! ui::progress
//!
//! Renders the finish state machine's progress as a small diagram: completed
//! steps marked done, the current step marked in-flight, and the literal
//! `--continue`/`--abort` instruction a paused run should show the user.

use std::fmt::Write as _;

use crate::core::merge_state::{FinishStep, MergeState};

/// Render the fixed [`FinishStep::ALL`] sequence against a [`MergeState`],
/// marking each step done, in-flight, or pending.
pub fn render_finish_progress(state: &MergeState) -> String {
    let mut out = String::new();
    for step in FinishStep::ALL {
        let marker = if step < state.current_step {
            "[x]"
        } else if step == state.current_step {
            "[>]"
        } else {
            "[ ]"
        };
        let _ = writeln!(out, "{marker} {}", step.label());
    }
    out
}

/// The instruction line shown when a finish is paused on conflicts.
pub fn continue_or_abort_hint(branch: &str) -> String {
    format!("Resolve the conflicts in '{branch}', then run `gitflow finish --continue` (or `--abort`).")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::merge_state::{Action, MergeState};
    use std::collections::{BTreeMap, BTreeSet};

    fn sample_state(step: FinishStep) -> MergeState {
        MergeState {
            action: Action::Finish,
            branch_type: "feature".to_string(),
            branch_name: "login".to_string(),
            full_branch_name: "feature/login".to_string(),
            parent_branch: "develop".to_string(),
            current_step: step,
            merge_strategy: crate::core::topology::UpstreamStrategy::Merge,
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
            keep_remote: false,
            force_delete: false,
            remote: "origin".to_string(),
        }
    }

    #[test]
    fn marks_earlier_steps_done_and_current_in_flight() {
        let rendered = render_finish_progress(&sample_state(FinishStep::UpdateChildren));
        assert!(rendered.contains("[x] merge topic into parent"));
        assert!(rendered.contains("[x] create tag"));
        assert!(rendered.contains("[>] update dependent branches"));
        assert!(rendered.contains("[ ] delete topic branch"));
    }

    #[test]
    fn hint_names_the_branch_and_both_verbs() {
        let hint = continue_or_abort_hint("feature/login");
        assert!(hint.contains("feature/login"));
        assert!(hint.contains("--continue"));
        assert!(hint.contains("--abort"));
    }
}
