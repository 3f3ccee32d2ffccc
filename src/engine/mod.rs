//! engine
//!
//! Orchestrates the command-level workflows built on top of [`crate::core`]
//! and [`crate::git`]: the hook/filter dispatcher, the update engine, and the
//! finish state machine.
//!
//! # Modules
//!
//! - [`hooks`] - Pre/post hook and filter dispatch
//! - [`update`] - Updates one branch from its parent using a merge strategy
//! - [`finish`] - The crash-safe, resumable finish state machine
//!
//! # Invariants
//!
//! - The engine never mutates the repository directly except through [`crate::git::Git`]
//! - Every mutating step that could fail persists [`crate::core::merge_state::MergeState`]
//!   beforehand, so a crash or conflict leaves a resumable trail
//! - The engine never decides exit codes; it returns [`crate::core::error::GitFlowError`]
//!   values for the CLI shell to map

pub mod finish;
pub mod hooks;
pub mod update;

use std::path::PathBuf;

/// Global flags threaded through every command, constructed once from CLI
/// flags at the top of `main`.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override (`--cwd` / `-C`).
    pub cwd: Option<PathBuf>,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Whether prompts may be shown (false under `--non-interactive` or when stdin isn't a tty).
    pub interactive: bool,
    /// Bypass commit hooks (`--no-verify`).
    pub no_verify: bool,
    /// Bypass safety gates such as the remote-sync check (`--force`).
    pub force: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            quiet: false,
            interactive: true,
            no_verify: false,
            force: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let ctx = Context::default();
        assert!(ctx.cwd.is_none());
        assert!(!ctx.quiet);
        assert!(ctx.interactive);
        assert!(!ctx.no_verify);
        assert!(!ctx.force);
    }

    #[test]
    fn custom_values() {
        let ctx = Context {
            cwd: Some(PathBuf::from("/custom")),
            quiet: true,
            interactive: false,
            no_verify: true,
            force: true,
        };
        assert_eq!(ctx.cwd, Some(PathBuf::from("/custom")));
        assert!(ctx.quiet);
        assert!(!ctx.interactive);
        assert!(ctx.no_verify);
        assert!(ctx.force);
    }
}
