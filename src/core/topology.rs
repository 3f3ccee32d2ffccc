//! core::topology
//!
//! The branch topology: a typed DAG of branch types describing how base and
//! topic branches relate to one another, loaded once per command invocation
//! from the config store and never mutated during a run except by the
//! `config branch-type` family of commands.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating or querying a [`Topology`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// The parent relation contains a cycle.
    #[error("cycle detected in branch topology at '{0}'")]
    CycleError(String),

    /// A branch type's `parent` field names a type that does not exist.
    #[error("branch type '{branch_type}' has unknown parent '{parent}'")]
    UnknownParentError {
        /// The branch type whose parent is unknown.
        branch_type: String,
        /// The unknown parent name.
        parent: String,
    },

    /// Two topic branch types share the same `prefix`.
    #[error("duplicate prefix '{prefix}' used by '{first}' and '{second}'")]
    DuplicatePrefixError {
        /// The shared prefix.
        prefix: String,
        /// The first branch type using it.
        first: String,
        /// The second branch type using it.
        second: String,
    },

    /// A branch type's strategy configuration violates the invariants.
    #[error("invalid strategy for branch type '{branch_type}': {reason}")]
    InvalidStrategyError {
        /// The offending branch type.
        branch_type: String,
        /// Why the strategy is invalid.
        reason: String,
    },

    /// No branch type with the given name exists in the topology.
    #[error("unknown branch type: {0}")]
    NotFound(String),
}

/// Whether a branch type is a long-lived base or a short-lived topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// A long-lived branch (e.g. `main`, `develop`).
    Base,
    /// A short-lived branch created from, and merged back into, a base (e.g. `feature`).
    Topic,
}

/// How changes flow *to* the parent when a branch of this type is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamStrategy {
    /// No upstream merge is performed (only valid for parentless types).
    None,
    /// Merge the topic into the parent.
    Merge,
    /// Rebase the topic onto the parent, then fast-forward merge.
    Rebase,
    /// Squash the topic's commits into a single commit on the parent.
    Squash,
}

/// How changes flow *from* the parent to this branch type on `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownstreamStrategy {
    /// This branch type is never auto-updated from its parent.
    None,
    /// Merge the parent into this branch.
    Merge,
    /// Rebase this branch onto the parent.
    Rebase,
}

/// A single node in the branch topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchType {
    /// Unique identifier within the topology (e.g. `feature`, `develop`).
    pub name: String,
    /// Base or topic.
    pub kind: Kind,
    /// The parent branch type's name, if any.
    pub parent: Option<String>,
    /// Topic only: the ref new instances are created from. Defaults to `parent`.
    pub start_point: Option<String>,
    /// Topic only: non-empty prefix ending in `/` (e.g. `feature/`).
    pub prefix: Option<String>,
    /// How this type's instances merge upstream on finish.
    pub upstream_strategy: UpstreamStrategy,
    /// How this type's instances receive changes from their parent on update.
    pub downstream_strategy: DownstreamStrategy,
    /// Topic only: whether finishing this type produces a tag.
    pub tag: bool,
    /// Topic only: prefix prepended to the short name to form the tag name.
    pub tag_prefix: Option<String>,
    /// Base only: whether this type is updated when its parent receives an upstream merge.
    pub auto_update: bool,
    /// Topic only: default for post-finish remote branch cleanup.
    pub delete_remote: bool,
}

impl BranchType {
    /// The effective start point for new instances: `start_point` if set, else `parent`.
    pub fn effective_start_point(&self) -> Option<&str> {
        self.start_point
            .as_deref()
            .or(self.parent.as_deref())
    }
}

/// The in-memory branch topology: a DAG of [`BranchType`]s keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: HashMap<String, BranchType>,
    children: HashMap<String, Vec<String>>,
}

impl Topology {
    /// Build a topology from a flat list of branch types, computing reverse
    /// (`children_of`) indexes. Does not validate; call [`Topology::validate`]
    /// separately, as loaders may want to report validation errors distinctly
    /// from construction errors.
    pub fn new(types: Vec<BranchType>) -> Self {
        let mut nodes = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();

        for bt in &types {
            if let Some(parent) = &bt.parent {
                children.entry(parent.clone()).or_default().push(bt.name.clone());
            }
        }

        for bt in types {
            nodes.insert(bt.name.clone(), bt);
        }

        Self { nodes, children }
    }

    /// Look up a branch type by name.
    pub fn get(&self, name: &str) -> Option<&BranchType> {
        self.nodes.get(name)
    }

    /// Look up a branch type by name, returning a [`TopologyError::NotFound`] if absent.
    pub fn require(&self, name: &str) -> Result<&BranchType, TopologyError> {
        self.get(name)
            .ok_or_else(|| TopologyError::NotFound(name.to_string()))
    }

    /// All branch type names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// The direct children of a branch type (names whose `parent == name`).
    pub fn children_of(&self, name: &str) -> &[String] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The ordered chain of ancestors from `name` up to (and including) its trunk.
    ///
    /// Returns an empty vec if `name` is itself a trunk or unknown.
    pub fn upstream_path(&self, name: &str) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = match self.nodes.get(name).and_then(|n| n.parent.clone()) {
            Some(p) => Some(p),
            None => None,
        };
        let mut seen = HashSet::new();
        while let Some(p) = current {
            if !seen.insert(p.clone()) {
                break; // defensive: validate() should already reject cycles
            }
            path.push(p.clone());
            current = self.nodes.get(&p).and_then(|n| n.parent.clone());
        }
        path
    }

    /// Validate all six invariants from the topology's data model.
    ///
    /// Checked on load and whenever `config branch-type` mutates the topology.
    pub fn validate(&self) -> Result<(), TopologyError> {
        // 3: every non-None parent references an existing node.
        for bt in self.nodes.values() {
            if let Some(parent) = &bt.parent {
                if !self.nodes.contains_key(parent) {
                    return Err(TopologyError::UnknownParentError {
                        branch_type: bt.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        // 4: topic nodes cannot be parents of other nodes.
        for bt in self.nodes.values() {
            if let Some(parent) = &bt.parent {
                if let Some(parent_bt) = self.nodes.get(parent) {
                    if parent_bt.kind == Kind::Topic {
                        return Err(TopologyError::InvalidStrategyError {
                            branch_type: bt.name.clone(),
                            reason: format!("parent '{}' is a topic type, not a base", parent),
                        });
                    }
                }
            }
        }

        // 2: the parent relation must form a DAG.
        for name in self.nodes.keys() {
            if let Some(cycle_at) = self.find_cycle_from(name) {
                return Err(TopologyError::CycleError(cycle_at));
            }
        }

        // 5: prefix uniqueness across topic nodes.
        let mut seen_prefixes: HashMap<&str, &str> = HashMap::new();
        for bt in self.nodes.values() {
            if bt.kind != Kind::Topic {
                continue;
            }
            if let Some(prefix) = &bt.prefix {
                if let Some(first) = seen_prefixes.get(prefix.as_str()) {
                    return Err(TopologyError::DuplicatePrefixError {
                        prefix: prefix.clone(),
                        first: first.to_string(),
                        second: bt.name.clone(),
                    });
                }
                seen_prefixes.insert(prefix.as_str(), &bt.name);
            }
        }

        // 6: upstream_strategy = None only for parentless nodes.
        for bt in self.nodes.values() {
            if bt.upstream_strategy == UpstreamStrategy::None && bt.parent.is_some() {
                return Err(TopologyError::InvalidStrategyError {
                    branch_type: bt.name.clone(),
                    reason: "upstreamStrategy=none is only valid for parentless (trunk) types"
                        .to_string(),
                });
            }
        }

        Ok(())
    }

    /// DFS cycle detection starting from `start`. Returns the name at which a
    /// cycle was detected, if any.
    fn find_cycle_from(&self, start: &str) -> Option<String> {
        let mut visited = HashSet::new();
        let mut current = start.to_string();
        visited.insert(current.clone());

        loop {
            let parent = match self.nodes.get(&current).and_then(|n| n.parent.clone()) {
                Some(p) => p,
                None => return None,
            };
            if !self.nodes.contains_key(&parent) {
                // Dangling parent is reported separately by the unknown-parent check.
                return None;
            }
            if !visited.insert(parent.clone()) {
                return Some(parent);
            }
            current = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(name: &str, parent: Option<&str>, auto_update: bool) -> BranchType {
        BranchType {
            name: name.to_string(),
            kind: Kind::Base,
            parent: parent.map(str::to_string),
            start_point: None,
            prefix: None,
            upstream_strategy: if parent.is_some() {
                UpstreamStrategy::Merge
            } else {
                UpstreamStrategy::None
            },
            downstream_strategy: DownstreamStrategy::None,
            tag: false,
            tag_prefix: None,
            auto_update,
            delete_remote: false,
        }
    }

    fn topic(name: &str, parent: &str, prefix: &str) -> BranchType {
        BranchType {
            name: name.to_string(),
            kind: Kind::Topic,
            parent: Some(parent.to_string()),
            start_point: None,
            prefix: Some(prefix.to_string()),
            upstream_strategy: UpstreamStrategy::Merge,
            downstream_strategy: DownstreamStrategy::None,
            tag: false,
            tag_prefix: None,
            auto_update: false,
            delete_remote: true,
        }
    }

    fn simple_topology() -> Topology {
        Topology::new(vec![
            base("main", None, false),
            base("develop", Some("main"), true),
            topic("feature", "develop", "feature/"),
        ])
    }

    #[test]
    fn validates_clean_topology() {
        assert!(simple_topology().validate().is_ok());
    }

    #[test]
    fn children_of_returns_direct_children() {
        let topo = simple_topology();
        assert_eq!(topo.children_of("main"), &["develop".to_string()]);
        assert_eq!(topo.children_of("develop"), &["feature".to_string()]);
        assert!(topo.children_of("feature").is_empty());
    }

    #[test]
    fn upstream_path_walks_to_trunk() {
        let topo = simple_topology();
        assert_eq!(
            topo.upstream_path("feature"),
            vec!["develop".to_string(), "main".to_string()]
        );
        assert!(topo.upstream_path("main").is_empty());
    }

    #[test]
    fn detects_unknown_parent() {
        let topo = Topology::new(vec![base("develop", Some("missing"), false)]);
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::UnknownParentError { .. })
        ));
    }

    #[test]
    fn detects_cycle() {
        let topo = Topology::new(vec![
            base("a", Some("b"), false),
            base("b", Some("a"), false),
        ]);
        assert!(matches!(topo.validate(), Err(TopologyError::CycleError(_))));
    }

    #[test]
    fn detects_topic_as_parent() {
        let topo = Topology::new(vec![
            base("main", None, false),
            topic("feature", "main", "feature/"),
            base("bad", Some("feature"), false),
        ]);
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::InvalidStrategyError { .. })
        ));
    }

    #[test]
    fn detects_duplicate_prefix() {
        let topo = Topology::new(vec![
            base("main", None, false),
            topic("feature", "main", "shared/"),
            topic("bugfix", "main", "shared/"),
        ]);
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::DuplicatePrefixError { .. })
        ));
    }

    #[test]
    fn detects_invalid_none_strategy_with_parent() {
        let mut develop = base("develop", Some("main"), false);
        develop.upstream_strategy = UpstreamStrategy::None;
        let topo = Topology::new(vec![base("main", None, false), develop]);
        assert!(matches!(
            topo.validate(),
            Err(TopologyError::InvalidStrategyError { .. })
        ));
    }

    #[test]
    fn trunk_with_none_strategy_is_valid() {
        let topo = Topology::new(vec![base("main", None, false)]);
        assert!(topo.validate().is_ok());
    }

    #[test]
    fn effective_start_point_falls_back_to_parent() {
        let t = topic("feature", "develop", "feature/");
        assert_eq!(t.effective_start_point(), Some("develop"));
    }

    #[test]
    fn effective_start_point_honors_explicit_value() {
        let mut t = topic("release", "main", "release/");
        t.start_point = Some("develop".to_string());
        assert_eq!(t.effective_start_point(), Some("develop"));
    }

    #[test]
    fn require_errors_on_missing() {
        let topo = simple_topology();
        assert!(matches!(
            topo.require("nonexistent"),
            Err(TopologyError::NotFound(_))
        ));
    }
}
