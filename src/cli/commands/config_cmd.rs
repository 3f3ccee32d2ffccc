//! config command - Get, set, or remove gitflow configuration, including branch types

use anyhow::{bail, Context as _, Result};

use crate::cli::args::{BranchTypeAction, ConfigScopeArg};
use crate::cli::commands::common::Workspace;
use crate::core::config::ConfigScope;
use crate::core::topology::{BranchType, DownstreamStrategy, Kind, UpstreamStrategy};
use crate::engine::Context;

fn map_scope(scope: ConfigScopeArg) -> ConfigScope {
    match scope {
        ConfigScopeArg::Local => ConfigScope::Local,
        ConfigScopeArg::Global => ConfigScope::Global,
        ConfigScopeArg::System => ConfigScope::System,
    }
}

pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    match workspace.config.get_string(key)? {
        Some(value) => println!("{value}"),
        None => bail!("{key} is not set"),
    }
    Ok(())
}

pub fn set(ctx: &Context, key: &str, value: &str, scope: ConfigScopeArg) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    workspace.config.set_string(key, value, &map_scope(scope))?;
    if !ctx.quiet {
        println!("Set {key} = {value}");
    }
    Ok(())
}

pub fn unset(ctx: &Context, key: &str, scope: ConfigScopeArg) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    workspace.config.unset(key, &map_scope(scope))?;
    if !ctx.quiet {
        println!("Unset {key}");
    }
    Ok(())
}

pub fn branch_type(ctx: &Context, action: BranchTypeAction) -> Result<()> {
    let workspace = Workspace::open(ctx)?;
    match action {
        BranchTypeAction::Add { name, parent, prefix, base } => {
            if workspace.topology.get(&name).is_some() {
                bail!("branch type '{name}' already exists");
            }
            let kind = if base { Kind::Base } else { Kind::Topic };
            let upstream_strategy = if parent.is_some() {
                UpstreamStrategy::Merge
            } else {
                UpstreamStrategy::None
            };
            let bt = BranchType {
                name: name.clone(),
                kind,
                parent,
                start_point: None,
                prefix,
                upstream_strategy,
                downstream_strategy: DownstreamStrategy::None,
                tag: false,
                tag_prefix: None,
                auto_update: false,
                delete_remote: !base,
            };
            workspace.config.save_branch_type(&bt)?;
            let topology = workspace.config.load_topology()?;
            topology.validate().context("new branch type would make the topology invalid")?;
            if !ctx.quiet {
                println!("Added branch type '{name}'");
            }
        }
        BranchTypeAction::Remove { name } => {
            workspace.config.delete_branch_type(&name)?;
            if !ctx.quiet {
                println!("Removed branch type '{name}'");
            }
        }
        BranchTypeAction::Edit { name, parent, prefix } => {
            let mut bt = workspace
                .topology
                .get(&name)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("branch type '{name}' does not exist"))?;
            if let Some(parent) = parent {
                bt.parent = Some(parent);
            }
            if let Some(prefix) = prefix {
                bt.prefix = Some(prefix);
            }
            workspace.config.save_branch_type(&bt)?;
            let topology = workspace.config.load_topology()?;
            topology.validate().context("edited branch type would make the topology invalid")?;
            if !ctx.quiet {
                println!("Updated branch type '{name}'");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git2::Repository::init(dir.path()).unwrap();
        dir
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = init_repo();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        set(&ctx, "gitflow.feature.finish.rebase", "true", ConfigScopeArg::Local).unwrap();
        let workspace = Workspace::open(&ctx).unwrap();
        assert_eq!(
            workspace.config.get_string("gitflow.feature.finish.rebase").unwrap(),
            Some("true".to_string())
        );
    }

    #[test]
    fn branch_type_add_and_edit() {
        let dir = init_repo();
        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        branch_type(
            &ctx,
            BranchTypeAction::Add {
                name: "bugfix".to_string(),
                parent: Some("develop".to_string()),
                prefix: Some("bugfix/".to_string()),
                base: false,
            },
        )
        .unwrap();

        branch_type(
            &ctx,
            BranchTypeAction::Edit {
                name: "bugfix".to_string(),
                parent: None,
                prefix: Some("fix/".to_string()),
            },
        )
        .unwrap();

        let workspace = Workspace::open(&ctx).unwrap();
        let bt = workspace.topology.get("bugfix").unwrap();
        assert_eq!(bt.prefix.as_deref(), Some("fix/"));
        assert_eq!(bt.parent.as_deref(), Some("develop"));
    }
}
