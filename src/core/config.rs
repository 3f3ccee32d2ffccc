//! core::config
//!
//! The config store: reads and writes `gitflow.*` keys through real Git
//! config files via `git2::Config`, so `git config --get gitflow.branch.
//! feature.prefix` run from a shell agrees with what this crate reads.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::topology::{BranchType, DownstreamStrategy, Kind, Topology, UpstreamStrategy};

/// Errors from the config store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested key does not exist.
    #[error("config key not found: {0}")]
    NotFound(String),

    /// A stored value could not be parsed into the expected type.
    #[error("invalid value for '{key}': {value}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// The raw stored value.
        value: String,
    },

    /// Underlying git2 config error.
    #[error("git config error: {0}")]
    Git(String),
}

impl From<git2::Error> for ConfigError {
    fn from(err: git2::Error) -> Self {
        ConfigError::Git(err.message().to_string())
    }
}

/// The scope a config read or write targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    /// The repository's local config (`.git/config`).
    Local,
    /// The user's global config (`~/.gitconfig`).
    Global,
    /// The machine-wide system config.
    System,
    /// An arbitrary config file.
    File(PathBuf),
    /// Merged read across System/Global/Local; writes default to Local.
    Default,
}

impl std::fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigScope::Local => write!(f, "local"),
            ConfigScope::Global => write!(f, "global"),
            ConfigScope::System => write!(f, "system"),
            ConfigScope::File(p) => write!(f, "file={}", p.display()),
            ConfigScope::Default => write!(f, "default"),
        }
    }
}

/// Typed access to `gitflow.*` config, backed by `git2::Config`.
pub struct ConfigStore {
    /// The repository's on-disk `.git` directory, used to open scope-specific configs.
    git_dir: PathBuf,
}

impl ConfigStore {
    /// Open the config store for the repository whose `.git` directory is `git_dir`.
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    fn open_scope(&self, scope: &ConfigScope) -> Result<git2::Config, ConfigError> {
        match scope {
            ConfigScope::Local => {
                Ok(git2::Config::open(&self.git_dir.join("config"))?)
            }
            ConfigScope::Global => Ok(git2::Config::open_default()?.open_level(git2::ConfigLevel::Global)?),
            ConfigScope::System => Ok(git2::Config::open_default()?.open_level(git2::ConfigLevel::System)?),
            ConfigScope::File(path) => Ok(git2::Config::open(path)?),
            ConfigScope::Default => Ok(git2::Config::open(&self.git_dir.join("config"))?.open_level(git2::ConfigLevel::Local)?),
        }
    }

    /// A merged read across System/Global/Local, the same precedence git itself uses.
    fn open_merged(&self) -> Result<git2::Config, ConfigError> {
        Ok(git2::Config::open(&self.git_dir.join("config"))?)
    }

    /// Read a string value, merged across scopes.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let cfg = self.open_merged()?;
        match cfg.get_string(key) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Read a boolean value, merged across scopes.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        let cfg = self.open_merged()?;
        match cfg.get_bool(key) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a string value in the given scope. Idempotent: re-running with
    /// the same key/value does not create a duplicate entry (`git2::Config::set_str`
    /// replaces the single-valued entry).
    pub fn set_string(&self, key: &str, value: &str, scope: &ConfigScope) -> Result<(), ConfigError> {
        let mut cfg = self.open_scope(scope)?;
        cfg.set_str(key, value)?;
        Ok(())
    }

    /// Write a boolean value in the given scope.
    pub fn set_bool(&self, key: &str, value: bool, scope: &ConfigScope) -> Result<(), ConfigError> {
        let mut cfg = self.open_scope(scope)?;
        cfg.set_bool(key, value)?;
        Ok(())
    }

    /// Remove a single key from the given scope.
    pub fn unset(&self, key: &str, scope: &ConfigScope) -> Result<(), ConfigError> {
        let mut cfg = self.open_scope(scope)?;
        match cfg.remove(key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every key under `prefix.` (e.g. `gitflow.branch.feature`) from
    /// the given scope. A missing section is treated as success, per the
    /// error-handling contract's documented recovery case.
    pub fn unset_section(&self, prefix: &str, scope: &ConfigScope) -> Result<(), ConfigError> {
        let mut cfg = self.open_scope(scope)?;
        let glob = format!("{}\\..*", regex_escape(prefix));
        match cfg.remove_multivar(&glob, ".*") {
            Ok(()) => Ok(()),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether `gitflow.initialized` is set to `true` anywhere, and in which
    /// scope it was found (so "initialized globally, not locally" can be
    /// distinguished from "not initialized at all").
    pub fn is_initialized(&self) -> Result<(bool, ConfigScope), ConfigError> {
        for scope in [ConfigScope::Local, ConfigScope::Global, ConfigScope::System] {
            let cfg = self.open_scope(&scope)?;
            match cfg.get_bool("gitflow.initialized") {
                Ok(true) => return Ok((true, scope)),
                Ok(false) | Err(_) => continue,
            }
        }
        Ok((false, ConfigScope::Default))
    }

    /// Load the full [`Topology`] from whatever `gitflow.branch.*` keys the
    /// merged config contains.
    pub fn load_topology(&self) -> Result<Topology, ConfigError> {
        let cfg = self.open_merged()?;
        let mut names = std::collections::BTreeSet::new();

        let entries = cfg.entries(Some("gitflow\\.branch\\..*"))?;
        for entry in &entries {
            let entry = entry?;
            if let Some(name) = entry.name() {
                if let Some(rest) = name.strip_prefix("gitflow.branch.") {
                    if let Some((branch_name, _field)) = rest.split_once('.') {
                        names.insert(branch_name.to_string());
                    }
                }
            }
        }

        let mut types = Vec::new();
        for name in names {
            types.push(self.load_branch_type(&cfg, &name)?);
        }

        Ok(Topology::new(types))
    }

    fn load_branch_type(&self, cfg: &git2::Config, name: &str) -> Result<BranchType, ConfigError> {
        let prefix = format!("gitflow.branch.{}", name);

        let kind_str = cfg
            .get_string(&format!("{}.type", prefix))
            .unwrap_or_else(|_| "topic".to_string());
        let kind = match kind_str.as_str() {
            "base" => Kind::Base,
            _ => Kind::Topic,
        };

        let parent = cfg.get_string(&format!("{}.parent", prefix)).ok();
        let start_point = cfg.get_string(&format!("{}.startPoint", prefix)).ok();
        let branch_prefix = cfg.get_string(&format!("{}.prefix", prefix)).ok();

        let upstream_strategy = match cfg
            .get_string(&format!("{}.upstreamStrategy", prefix))
            .unwrap_or_default()
            .as_str()
        {
            "none" => UpstreamStrategy::None,
            "rebase" => UpstreamStrategy::Rebase,
            "squash" => UpstreamStrategy::Squash,
            _ if parent.is_none() => UpstreamStrategy::None,
            _ => UpstreamStrategy::Merge,
        };

        let downstream_strategy = match cfg
            .get_string(&format!("{}.downstreamStrategy", prefix))
            .unwrap_or_default()
            .as_str()
        {
            "merge" => DownstreamStrategy::Merge,
            "rebase" => DownstreamStrategy::Rebase,
            _ => DownstreamStrategy::None,
        };

        let tag = cfg.get_bool(&format!("{}.tag", prefix)).unwrap_or(false);
        let tag_prefix = cfg.get_string(&format!("{}.tagprefix", prefix)).ok();
        let auto_update = cfg
            .get_bool(&format!("{}.autoUpdate", prefix))
            .unwrap_or(false);
        let delete_remote = cfg
            .get_bool(&format!("{}.deleteRemote", prefix))
            .unwrap_or(false);

        Ok(BranchType {
            name: name.to_string(),
            kind,
            parent,
            start_point,
            prefix: branch_prefix,
            upstream_strategy,
            downstream_strategy,
            tag,
            tag_prefix,
            auto_update,
            delete_remote,
        })
    }

    /// Persist a [`BranchType`] into the local scope.
    pub fn save_branch_type(&self, bt: &BranchType) -> Result<(), ConfigError> {
        let prefix = format!("gitflow.branch.{}", bt.name);
        let scope = ConfigScope::Local;

        self.set_string(
            &format!("{}.type", prefix),
            match bt.kind {
                Kind::Base => "base",
                Kind::Topic => "topic",
            },
            &scope,
        )?;
        if let Some(parent) = &bt.parent {
            self.set_string(&format!("{}.parent", prefix), parent, &scope)?;
        }
        if let Some(sp) = &bt.start_point {
            self.set_string(&format!("{}.startPoint", prefix), sp, &scope)?;
        }
        if let Some(p) = &bt.prefix {
            self.set_string(&format!("{}.prefix", prefix), p, &scope)?;
        }
        self.set_string(
            &format!("{}.upstreamStrategy", prefix),
            match bt.upstream_strategy {
                UpstreamStrategy::None => "none",
                UpstreamStrategy::Merge => "merge",
                UpstreamStrategy::Rebase => "rebase",
                UpstreamStrategy::Squash => "squash",
            },
            &scope,
        )?;
        self.set_string(
            &format!("{}.downstreamStrategy", prefix),
            match bt.downstream_strategy {
                DownstreamStrategy::None => "none",
                DownstreamStrategy::Merge => "merge",
                DownstreamStrategy::Rebase => "rebase",
            },
            &scope,
        )?;
        self.set_bool(&format!("{}.tag", prefix), bt.tag, &scope)?;
        if let Some(tp) = &bt.tag_prefix {
            self.set_string(&format!("{}.tagprefix", prefix), tp, &scope)?;
        }
        self.set_bool(&format!("{}.autoUpdate", prefix), bt.auto_update, &scope)?;
        self.set_bool(&format!("{}.deleteRemote", prefix), bt.delete_remote, &scope)?;

        Ok(())
    }

    /// Delete a branch type's entire `gitflow.branch.<name>.*` subsection.
    pub fn delete_branch_type(&self, name: &str) -> Result<(), ConfigError> {
        self.unset_section(&format!("gitflow.branch.{}", name), &ConfigScope::Local)
    }

    /// Rename a branch type: load it, delete the old subsection, re-save under
    /// the new name, and fix up any other branch type whose `parent` pointed
    /// at the old name.
    pub fn rename_branch_type(&self, old: &str, new: &str) -> Result<(), ConfigError> {
        let cfg = self.open_merged()?;
        let mut bt = self.load_branch_type(&cfg, old)?;
        self.delete_branch_type(old)?;
        bt.name = new.to_string();
        self.save_branch_type(&bt)?;

        let topology = self.load_topology()?;
        for name in topology.names() {
            if name == new {
                continue;
            }
            if let Some(mut other) = topology.get(name).cloned() {
                if other.parent.as_deref() == Some(old) {
                    other.parent = Some(new.to_string());
                    self.save_branch_type(&other)?;
                }
            }
        }
        Ok(())
    }

    /// Path to this store's local `.git/config` file, for diagnostics.
    pub fn local_config_path(&self) -> PathBuf {
        self.git_dir.join("config")
    }

    /// Path to the hooks directory override env var's gate feature, exposed
    /// for callers that need to know whether a `GITFLOW_HOOKS_DIR_OVERRIDE`
    /// is meaningful in this build.
    pub fn hooks_override_path() -> Option<PathBuf> {
        #[cfg(feature = "test_hooks")]
        {
            std::env::var_os("GITFLOW_HOOKS_DIR_OVERRIDE").map(PathBuf::from)
        }
        #[cfg(not(feature = "test_hooks"))]
        {
            None
        }
    }
}

/// Escape regex metacharacters in a literal string for use in a git2 config glob.
fn regex_escape(s: &str) -> String {
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

/// Resolve the hooks directory by precedence: `gitflow.path.hooks` →
/// `core.hooksPath` → `<git-common-dir>/hooks`. Relative paths resolve from
/// `repo_root` (the main worktree's working directory, never a linked
/// worktree's own directory).
pub fn resolve_hooks_dir(
    store: &ConfigStore,
    repo_root: &Path,
    git_common_dir: &Path,
) -> Result<PathBuf, ConfigError> {
    if let Some(over) = ConfigStore::hooks_override_path() {
        return Ok(over);
    }
    if let Some(custom) = store.get_string("gitflow.path.hooks")? {
        return Ok(resolve_relative(repo_root, &custom));
    }
    if let Some(core_hooks) = store.get_string("core.hooksPath")? {
        return Ok(resolve_relative(repo_root, &core_hooks));
    }
    Ok(git_common_dir.join("hooks"))
}

fn resolve_relative(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}
