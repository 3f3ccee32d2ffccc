//! list command - List tracked branches, optionally filtered by type

use anyhow::Result;

use crate::cli::commands::common::Workspace;
use crate::engine::Context;

/// The branch type a branch name belongs to, by matching against the
/// topology's prefixes (topics) or exact names (base branches).
fn classify<'a>(workspace: &'a Workspace, name: &str) -> Option<&'a str> {
    for type_name in workspace.topology.names() {
        let bt = workspace.topology.get(type_name)?;
        let matches = match &bt.prefix {
            Some(prefix) => name.starts_with(prefix.as_str()),
            None => bt.name == name,
        };
        if matches {
            return Some(type_name);
        }
    }
    None
}

pub fn list(ctx: &Context, branch_type: Option<&str>) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;
    let branches = workspace.git.list_branches()?;
    let current = workspace.git.current_branch()?;

    let mut printed = 0;
    for branch in &branches {
        let Some(kind) = classify(&workspace, branch.as_str()) else {
            continue;
        };
        if let Some(filter) = branch_type {
            if kind != filter {
                continue;
            }
        }
        let marker = if current.as_ref() == Some(branch) { "* " } else { "  " };
        println!("{marker}{} ({kind})", branch.as_str());
        printed += 1;
    }

    if printed == 0 && !ctx.quiet {
        println!("(no matching branches)");
    }
    Ok(())
}
