//! init command - Set up the default branch topology

use anyhow::{bail, Result};

use crate::cli::commands::common::Workspace;
use crate::core::config::ConfigScope;
use crate::core::topology::{BranchType, DownstreamStrategy, Kind, UpstreamStrategy};
use crate::engine::Context;

/// The topology `gitflow init` writes when none is configured: `main` as the
/// sole trunk, `develop` auto-updating from it, and `feature`/`release`/
/// `hotfix` topic types mirroring classic git-flow's branch model.
fn default_branch_types() -> Vec<BranchType> {
    vec![
        BranchType {
            name: "main".to_string(),
            kind: Kind::Base,
            parent: None,
            start_point: None,
            prefix: None,
            upstream_strategy: UpstreamStrategy::None,
            downstream_strategy: DownstreamStrategy::None,
            tag: false,
            tag_prefix: None,
            auto_update: false,
            delete_remote: false,
        },
        BranchType {
            name: "develop".to_string(),
            kind: Kind::Base,
            parent: Some("main".to_string()),
            start_point: None,
            prefix: None,
            upstream_strategy: UpstreamStrategy::Merge,
            downstream_strategy: DownstreamStrategy::Merge,
            tag: false,
            tag_prefix: None,
            auto_update: true,
            delete_remote: false,
        },
        BranchType {
            name: "feature".to_string(),
            kind: Kind::Topic,
            parent: Some("develop".to_string()),
            start_point: None,
            prefix: Some("feature/".to_string()),
            upstream_strategy: UpstreamStrategy::Merge,
            downstream_strategy: DownstreamStrategy::None,
            tag: false,
            tag_prefix: None,
            auto_update: false,
            delete_remote: true,
        },
        BranchType {
            name: "release".to_string(),
            kind: Kind::Topic,
            parent: Some("main".to_string()),
            start_point: Some("develop".to_string()),
            prefix: Some("release/".to_string()),
            upstream_strategy: UpstreamStrategy::Merge,
            downstream_strategy: DownstreamStrategy::None,
            tag: true,
            tag_prefix: Some("v".to_string()),
            auto_update: false,
            delete_remote: true,
        },
        BranchType {
            name: "hotfix".to_string(),
            kind: Kind::Topic,
            parent: Some("main".to_string()),
            start_point: None,
            prefix: Some("hotfix/".to_string()),
            upstream_strategy: UpstreamStrategy::Merge,
            downstream_strategy: DownstreamStrategy::None,
            tag: true,
            tag_prefix: Some("v".to_string()),
            auto_update: false,
            delete_remote: true,
        },
    ]
}

/// Set up the branch topology. Refuses to run twice unless `reset` is given.
pub fn init(ctx: &Context, reset: bool, force: bool) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    let (initialized, scope) = workspace.config.is_initialized()?;

    if initialized && !reset {
        if !ctx.quiet {
            println!("gitflow is already initialized (found in {scope} scope). Use --reset to reconfigure.");
        }
        return Ok(());
    }

    if initialized && reset && !force && !ctx.quiet {
        println!("Reconfiguring existing topology...");
    }
    if initialized && !force && !ctx.interactive {
        bail!("refusing to reset topology non-interactively without --force");
    }

    for bt in default_branch_types() {
        workspace.config.save_branch_type(&bt)?;
    }
    workspace
        .config
        .set_string("gitflow.version", env!("CARGO_PKG_VERSION"), &ConfigScope::Local)?;
    workspace
        .config
        .set_bool("gitflow.initialized", true, &ConfigScope::Local)?;

    let topology = workspace.config.load_topology()?;
    topology.validate()?;

    if !ctx.quiet {
        println!("Initialized gitflow topology: main, develop, feature, release, hotfix.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::topology::Topology;

    #[test]
    fn default_topology_validates() {
        let topology = Topology::new(default_branch_types());
        assert!(topology.validate().is_ok());
    }

    #[test]
    fn init_sets_initialized_marker() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        init(&ctx, false, false).unwrap();

        let workspace = Workspace::open(&ctx).unwrap();
        let (initialized, _) = workspace.config.is_initialized().unwrap();
        assert!(initialized);
        assert!(workspace.topology.get("feature").is_some());
    }

    #[test]
    fn second_init_without_reset_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        init(&ctx, false, false).unwrap();
        assert!(init(&ctx, false, false).is_ok());
    }
}
