//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--interactive` / `--no-interactive`: Control prompts
//! - `--quiet` / `-q`: Minimal output
//! - `--no-verify`: Bypass commit hooks
//! - `--force`: Bypass safety gates (e.g. the remote-sync check)
//!
//! # Branch type as a positional
//!
//! Branch types (`feature`, `release`, `hotfix`, ...) are user-defined via
//! `gitflow config branch-type add`, so they can't be fixed clap subcommands
//! the way `git flow feature start` hardcodes them. `start`/`finish` instead
//! take the branch type as their first positional argument.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// A Rust-native CLI for GitFlow-family branch workflows.
#[derive(Parser, Debug)]
#[command(name = "gitflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gitflow was started in this directory
    #[arg(long, short = 'C', global = true)]
    pub cwd: Option<PathBuf>,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(long, global = true, conflicts_with = "no_interactive")]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    /// Bypass commit hooks
    #[arg(long, global = true)]
    pub no_verify: bool,

    /// Bypass safety gates, such as the remote-sync check
    #[arg(long, global = true)]
    pub force: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true if:
    /// - `--interactive` was explicitly set, OR
    /// - Neither `--no-interactive` nor `--quiet` was set AND stdin is a TTY
    pub fn interactive(&self) -> bool {
        if self.interactive_flag {
            true
        } else if self.no_interactive || self.quiet {
            false
        } else {
            std::io::IsTerminal::is_terminal(&std::io::stdin())
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up the branch topology in this repository
    #[command(name = "init")]
    Init {
        /// Reconfigure an already-initialized repository
        #[arg(long)]
        reset: bool,

        /// Skip confirmation prompts
        #[arg(long)]
        force: bool,
    },

    /// Create a new topic branch of the given type
    #[command(name = "start")]
    Start {
        /// The branch type (e.g. `feature`, `release`, `hotfix`)
        branch_type: String,

        /// The short name for the new branch
        name: String,

        /// Create the branch from this ref instead of the type's default start point
        #[arg(long)]
        start_point: Option<String>,

        /// Fetch from the remote before creating the branch
        #[arg(long, conflicts_with = "no_fetch")]
        fetch: bool,

        /// Skip fetching from the remote
        #[arg(long)]
        no_fetch: bool,
    },

    /// Merge a topic branch back into its parent, tag, and clean up
    #[command(name = "finish")]
    Finish {
        /// The branch type (e.g. `feature`, `release`, `hotfix`)
        branch_type: Option<String>,

        /// The short name of the branch to finish
        name: Option<String>,

        /// Resume a paused finish after resolving conflicts
        #[arg(long = "continue")]
        continue_: bool,

        /// Abort a paused finish and restore the pre-finish state
        #[arg(long)]
        abort: bool,

        /// Merge strategy overrides; `--squash` beats `--rebase` beats config/branch defaults
        #[command(flatten)]
        strategy: StrategyArgs,

        /// Always create a merge commit, even when a fast-forward is possible
        #[arg(long, conflicts_with = "ff")]
        no_ff: bool,

        /// Fast-forward when possible, even if the branch type defaults to `--no-ff`
        #[arg(long)]
        ff: bool,

        /// Create a tag on finish
        #[arg(long, conflicts_with = "notag")]
        tag: bool,

        /// Skip tag creation on finish
        #[arg(long)]
        notag: bool,

        /// Explicit tag name, overriding the branch type's tag prefix + short name
        #[arg(long)]
        tagname: Option<String>,

        /// Tag message / merge or squash commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Read the tag message from a file
        #[arg(long)]
        message_file: Option<PathBuf>,

        /// GPG-sign the tag
        #[arg(long)]
        sign: bool,

        /// The GPG key to sign the tag with
        #[arg(long)]
        signingkey: Option<String>,

        /// Keep both the local and remote topic branch after finish
        #[arg(long)]
        keep: bool,

        /// Keep the local topic branch after finish
        #[arg(long)]
        keeplocal: bool,

        /// Keep the remote topic branch after finish
        #[arg(long)]
        keepremote: bool,

        /// Delete the topic branch even if it is not fully merged
        #[arg(long)]
        force_delete: bool,

        /// Fetch from the remote before finishing
        #[arg(long, conflicts_with = "no_fetch")]
        fetch: bool,

        /// Skip fetching from the remote
        #[arg(long)]
        no_fetch: bool,
    },

    /// Update a tracked base branch from its parent
    #[command(name = "update")]
    Update {
        /// Branch to update (defaults to current)
        name: Option<String>,

        /// Merge the parent into this branch
        #[arg(long, conflicts_with = "rebase")]
        merge: bool,

        /// Rebase this branch onto the parent
        #[arg(long)]
        rebase: bool,
    },

    /// Start tracking an existing branch in the topology
    #[command(name = "track")]
    Track {
        /// Branch to track
        name: String,

        /// The remote to track it against
        #[arg(long)]
        remote: Option<String>,
    },

    /// Push a branch to its remote, creating the tracking branch if needed
    #[command(name = "publish")]
    Publish {
        /// Branch to publish
        name: String,
    },

    /// Rename a branch
    #[command(name = "rename")]
    Rename {
        /// Current branch name
        old: String,

        /// New branch name
        new: String,
    },

    /// Check out a branch
    #[command(name = "checkout", visible_alias = "co")]
    Checkout {
        /// Branch to check out
        name: String,
    },

    /// Delete a branch
    #[command(name = "delete", visible_alias = "d")]
    Delete {
        /// Branch to delete
        name: String,

        /// Delete even if not fully merged
        #[arg(long, short)]
        force: bool,

        /// Also delete the remote tracking branch
        #[arg(long)]
        keepremote: bool,
    },

    /// List tracked branches, optionally filtered by type
    #[command(name = "list")]
    List {
        /// Only list branches of this type
        branch_type: Option<String>,
    },

    /// Show the full topology and the state of every tracked branch
    #[command(name = "overview")]
    Overview,

    /// Get, set, or unset configuration values, or manage branch types
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Inspect the operation journal
    #[command(name = "journal")]
    Journal {
        /// Show a single operation by id (defaults to the most recent)
        #[arg(long)]
        op: Option<String>,
    },

    /// Print the gitflow version
    #[command(name = "version")]
    Version,

    /// Generate shell completion scripts
    #[command(name = "completions")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Merge-strategy flags shared by `finish`.
#[derive(clap::Args, Debug)]
pub struct StrategyArgs {
    /// Squash the topic's commits into a single commit on the parent
    #[arg(long, conflicts_with_all = ["no_squash", "rebase", "no_rebase"])]
    pub squash: bool,

    /// Disable squash even if the branch type defaults to it
    #[arg(long)]
    pub no_squash: bool,

    /// Rebase the topic onto the parent before merging
    #[arg(long, conflicts_with = "no_rebase")]
    pub rebase: bool,

    /// Disable rebase even if the branch type defaults to it
    #[arg(long)]
    pub no_rebase: bool,

    /// When rebasing, preserve merge commits within the topic branch
    #[arg(long)]
    pub preserve_merges: bool,
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g. `gitflow.feature.finish.rebase`)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,

        /// Which config file to write to
        #[arg(long, value_enum, default_value = "local")]
        scope: ConfigScopeArg,
    },

    /// Remove a configuration value
    Unset {
        /// Configuration key
        key: String,

        /// Which config file to remove from
        #[arg(long, value_enum, default_value = "local")]
        scope: ConfigScopeArg,
    },

    /// Manage branch types in the topology
    #[command(name = "branch-type")]
    BranchType {
        #[command(subcommand)]
        action: BranchTypeAction,
    },
}

/// `config branch-type` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum BranchTypeAction {
    /// Add a new branch type to the topology
    Add {
        /// The branch type's name
        name: String,

        /// The parent branch type, if this is a topic type
        #[arg(long)]
        parent: Option<String>,

        /// Topic only: the branch-name prefix (e.g. `feature/`)
        #[arg(long)]
        prefix: Option<String>,

        /// Mark this branch type as a long-lived base rather than a topic
        #[arg(long)]
        base: bool,
    },

    /// Remove a branch type from the topology
    Remove {
        /// The branch type's name
        name: String,
    },

    /// Edit an existing branch type's fields
    Edit {
        /// The branch type's name
        name: String,

        /// New parent branch type
        #[arg(long)]
        parent: Option<String>,

        /// New prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

/// The config scope to read from or write to.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScopeArg {
    /// `.git/config`
    Local,
    /// `~/.gitconfig`
    Global,
    /// `/etc/gitconfig`
    System,
}

/// Supported shells for completion.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl From<Shell> for clap_complete::Shell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
        }
    }
}
