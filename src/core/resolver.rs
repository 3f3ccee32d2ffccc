//! core::resolver
//!
//! The three-layer option resolver: merges branch-type defaults, per-command
//! config, and per-invocation flags into a single immutable [`ResolvedPlan`].

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigStore;
use crate::core::topology::{BranchType, DownstreamStrategy, Topology, UpstreamStrategy};
use crate::git::SyncStatus;

/// Errors raised while resolving a plan.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The named branch type does not exist in the topology.
    #[error("unknown branch type: {0}")]
    UnknownBranchType(String),

    /// The branch is behind or diverged from its remote tracking branch and
    /// `--force` was not given.
    #[error("branch '{branch}' is {status} its remote '{remote}' ({count} commit(s))")]
    BranchBehindRemote {
        /// The local branch short name.
        branch: String,
        /// The tracking remote name.
        remote: String,
        /// How many commits apart.
        count: usize,
        /// Human-readable relation ("behind" or "diverged from").
        status: String,
    },

    /// The config store returned an error while reading overrides.
    #[error(transparent)]
    Config(#[from] crate::core::config::ConfigError),
}

/// Whether a merge-strategy flag was explicitly set, and in which direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyFlags {
    /// `--squash` was given.
    pub squash: bool,
    /// `--no-squash` was given.
    pub no_squash: bool,
    /// `--rebase` was given.
    pub rebase: bool,
    /// `--no-rebase` was given.
    pub no_rebase: bool,
    /// `--preserve-merges` was given.
    pub preserve_merges: bool,
}

/// Per-invocation overrides supplied on the command line. All fields are
/// `Option`/bool-default-false so that "not given" is distinguishable from
/// "given as false" wherever the distinction matters.
#[derive(Debug, Clone, Default)]
pub struct InvocationFlags {
    /// Merge-strategy flags (`--squash`/`--rebase`/etc).
    pub strategy: StrategyFlags,
    /// `--no-ff` was given.
    pub no_ff: bool,
    /// `--ff` was given.
    pub ff: bool,
    /// `--tag` was given.
    pub tag: Option<bool>,
    /// `--tagname <name>`.
    pub tag_name: Option<String>,
    /// `--message <msg>`.
    pub message: Option<String>,
    /// `--message-file <path>`.
    pub message_file: Option<PathBuf>,
    /// `--sign` was given.
    pub sign: bool,
    /// `--signingkey <key>`.
    pub signing_key: Option<String>,
    /// `--keep` was given.
    pub keep: bool,
    /// `--keeplocal` was given.
    pub keep_local: bool,
    /// `--keepremote` was given.
    pub keep_remote: bool,
    /// `--force-delete` was given.
    pub force_delete: bool,
    /// `--fetch`/`--no-fetch`.
    pub fetch: Option<bool>,
    /// `--no-verify` was given.
    pub no_verify: bool,
    /// `--force` was given (bypasses the remote-sync safety gate).
    pub force: bool,
}

/// The fully-defaulted, immutable result of resolving one `finish` invocation.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    /// The branch type being finished (e.g. `feature`).
    pub branch_type: String,
    /// The short name supplied by the user (e.g. `login`).
    pub short_name: String,
    /// The full branch name (`prefix + short_name`).
    pub full_branch_name: String,
    /// The parent branch this type merges upstream into.
    pub parent_branch: String,
    /// The resolved upstream merge strategy.
    pub merge_strategy: UpstreamStrategy,
    /// Whether merge commits within the topic should be preserved (rebase only).
    pub preserve_merges: bool,
    /// Whether to force a merge commit even when a fast-forward is possible.
    pub no_fast_forward: bool,
    /// Whether a tag should be created on finish.
    pub should_tag: bool,
    /// The tag name to use if `should_tag`.
    pub tag_name: String,
    /// The tag message.
    pub tag_message: String,
    /// An optional file containing the tag message.
    pub message_file: Option<PathBuf>,
    /// Whether the tag should be GPG-signed.
    pub should_sign: bool,
    /// The signing key to use, if any.
    pub signing_key: Option<String>,
    /// Keep both local and remote topic branch after finish.
    pub keep: bool,
    /// Keep the local topic branch after finish.
    pub keep_local: bool,
    /// Keep the remote topic branch after finish.
    pub keep_remote: bool,
    /// Force-delete even if not fully merged.
    pub force_delete: bool,
    /// Whether to fetch from the remote before finishing.
    pub should_fetch: bool,
    /// Whether to bypass commit hooks.
    pub no_verify: bool,
    /// The template for the upstream merge commit message, if any.
    pub merge_message: Option<String>,
    /// The template for a child-update commit message, if any.
    pub update_message: Option<String>,
    /// The template for the squash commit message, if any.
    pub squash_message: Option<String>,
}

fn config_bool(store: &ConfigStore, key: &str) -> Result<Option<bool>, ResolverError> {
    Ok(store.get_bool(key)?)
}

fn config_string(store: &ConfigStore, key: &str) -> Result<Option<String>, ResolverError> {
    Ok(store.get_string(key)?)
}

/// Resolve the upstream merge strategy per the documented precedence:
/// flag > command config > branch-type default > fallback `Merge`.
pub fn resolve_merge_strategy(
    branch_type: &BranchType,
    store: &ConfigStore,
    flags: &StrategyFlags,
) -> Result<UpstreamStrategy, ResolverError> {
    // Layer 1: explicit per-invocation flags. squash beats rebase; positive beats negative.
    if flags.squash {
        return Ok(UpstreamStrategy::Squash);
    }
    if flags.rebase {
        return Ok(UpstreamStrategy::Rebase);
    }
    if flags.no_rebase || flags.no_squash {
        return Ok(UpstreamStrategy::Merge);
    }

    // Layer 2: command-scoped config.
    let squash_key = format!("gitflow.{}.finish.squash", branch_type.name);
    let rebase_key = format!("gitflow.{}.finish.rebase", branch_type.name);
    if config_bool(store, &squash_key)?.unwrap_or(false) {
        return Ok(UpstreamStrategy::Squash);
    }
    if config_bool(store, &rebase_key)?.unwrap_or(false) {
        return Ok(UpstreamStrategy::Rebase);
    }

    // Layer 3: branch-type default.
    match branch_type.upstream_strategy {
        UpstreamStrategy::None => Ok(UpstreamStrategy::Merge), // fallback
        other => Ok(other),
    }
}

/// Resolve whether a tag should be produced, per the documented precedence.
pub fn resolve_should_tag(
    branch_type: &BranchType,
    store: &ConfigStore,
    tag_flag: Option<bool>,
) -> Result<bool, ResolverError> {
    if let Some(explicit) = tag_flag {
        return Ok(explicit);
    }
    let notag_key = format!("gitflow.{}.finish.notag", branch_type.name);
    if let Some(notag) = config_bool(store, &notag_key)? {
        return Ok(!notag && branch_type.tag);
    }
    Ok(branch_type.tag)
}

/// Resolve the tag name: `--tagname` if given, else `tag_prefix + short_name`.
pub fn resolve_tag_name(
    branch_type: &BranchType,
    short_name: &str,
    tag_name_flag: Option<&str>,
) -> String {
    if let Some(explicit) = tag_name_flag {
        return explicit.to_string();
    }
    let prefix = branch_type.tag_prefix.as_deref().unwrap_or("");
    format!("{}{}", prefix, short_name)
}

/// Resolve whether to fetch before finishing: default `true` for `finish`,
/// `false` for `start`, overridable by config then flag.
pub fn resolve_should_fetch(
    branch_type: &str,
    store: &ConfigStore,
    command: &str,
    fetch_flag: Option<bool>,
) -> Result<bool, ResolverError> {
    if let Some(explicit) = fetch_flag {
        return Ok(explicit);
    }
    let key = format!("gitflow.{}.{}.fetch", branch_type, command);
    if let Some(configured) = config_bool(store, &key)? {
        return Ok(configured);
    }
    Ok(command == "finish")
}

/// The remote-sync safety gate: if the branch is behind or diverged and
/// `--force` was not given, yield a [`ResolverError::BranchBehindRemote`].
pub fn check_remote_sync_gate(
    short_name: &str,
    status: SyncStatus,
    count: usize,
    remote: &str,
    force: bool,
) -> Result<(), ResolverError> {
    if force {
        return Ok(());
    }
    let label = match status {
        SyncStatus::Behind => Some("behind"),
        SyncStatus::Diverged => Some("diverged from"),
        _ => None,
    };
    if let Some(label) = label {
        return Err(ResolverError::BranchBehindRemote {
            branch: short_name.to_string(),
            remote: remote.to_string(),
            count,
            status: label.to_string(),
        });
    }
    Ok(())
}

/// Expand a message template's placeholders: `%b` (short branch), `%B` (full
/// refname), `%p` (parent short), `%P` (full parent refname), `%%` (literal `%`).
pub fn expand_template(
    template: &str,
    short_branch: &str,
    full_branch: &str,
    parent_short: &str,
    full_parent: &str,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push_str(short_branch),
            Some('B') => out.push_str(full_branch),
            Some('p') => out.push_str(parent_short),
            Some('P') => out.push_str(full_parent),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Resolve a full [`ResolvedPlan`] for a `finish` invocation.
pub fn resolve_finish_plan(
    topology: &Topology,
    branch_type_name: &str,
    short_name: &str,
    store: &ConfigStore,
    flags: &InvocationFlags,
) -> Result<ResolvedPlan, ResolverError> {
    let branch_type = topology
        .get(branch_type_name)
        .ok_or_else(|| ResolverError::UnknownBranchType(branch_type_name.to_string()))?;

    let parent_branch = branch_type
        .parent
        .clone()
        .ok_or_else(|| ResolverError::UnknownBranchType(format!("{} has no parent", branch_type_name)))?;

    let merge_strategy = resolve_merge_strategy(branch_type, store, &flags.strategy)?;
    let preserve_merges = flags.strategy.preserve_merges && merge_strategy == UpstreamStrategy::Rebase;

    let no_fast_forward = if flags.no_ff {
        true
    } else if flags.ff {
        false
    } else {
        config_bool(store, &format!("gitflow.{}.finish.no-ff", branch_type_name))?.unwrap_or(false)
    };

    let should_tag = resolve_should_tag(branch_type, store, flags.tag)?;
    let tag_name = resolve_tag_name(branch_type, short_name, flags.tag_name.as_deref());

    let prefix = branch_type.prefix.clone().unwrap_or_default();
    let full_branch_name = format!("{}{}", prefix, short_name);

    let keep = flags.keep
        || config_bool(store, &format!("gitflow.{}.finish.keep", branch_type_name))?.unwrap_or(false);
    let keep_local = keep
        || flags.keep_local
        || config_bool(store, &format!("gitflow.{}.finish.keeplocal", branch_type_name))?.unwrap_or(false);
    let keep_remote = keep
        || flags.keep_remote
        || config_bool(store, &format!("gitflow.{}.finish.keepremote", branch_type_name))?.unwrap_or(false);

    let force_delete = flags.force_delete
        || config_bool(store, &format!("gitflow.{}.finish.force-delete", branch_type_name))?.unwrap_or(false);

    let should_fetch = resolve_should_fetch(branch_type_name, store, "finish", flags.fetch)?;

    let no_verify = flags.no_verify
        || config_bool(store, &format!("gitflow.{}.finish.noverify", branch_type_name))?.unwrap_or(false);

    let should_sign = flags.sign
        || config_bool(store, &format!("gitflow.{}.finish.sign", branch_type_name))?.unwrap_or(false);
    let signing_key = flags
        .signing_key
        .clone()
        .or(config_string(store, &format!("gitflow.{}.finish.signingkey", branch_type_name))?);

    let merge_message = config_string(store, &format!("gitflow.{}.finish.mergeMessage", branch_type_name))?;
    let update_message = config_string(store, &format!("gitflow.{}.finish.updateMessage", branch_type_name))?;
    let squash_message = flags
        .message
        .clone()
        .or(config_string(store, &format!("gitflow.{}.finish.squashMessage", branch_type_name))?);

    let tag_message = flags
        .message
        .clone()
        .unwrap_or_else(|| tag_name.clone());

    Ok(ResolvedPlan {
        branch_type: branch_type_name.to_string(),
        short_name: short_name.to_string(),
        full_branch_name,
        parent_branch,
        merge_strategy,
        preserve_merges,
        no_fast_forward,
        should_tag,
        tag_name,
        tag_message,
        message_file: flags.message_file.clone(),
        should_sign,
        signing_key,
        keep,
        keep_local,
        keep_remote,
        force_delete,
        should_fetch,
        no_verify,
        merge_message,
        update_message,
        squash_message,
    })
}

/// The downstream strategy a child base branch should use for its own
/// auto-update, frozen at the moment a finish begins.
pub fn child_downstream_strategy(branch_type: &BranchType) -> DownstreamStrategy {
    branch_type.downstream_strategy
}
