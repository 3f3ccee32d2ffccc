//! overview command - Print the topology tree and every tracked branch's status

use anyhow::Result;

use crate::cli::commands::common::Workspace;
use crate::core::topology::BranchType;
use crate::core::types::BranchName;
use crate::engine::Context;
use crate::git::SyncStatus;

fn status_label(status: SyncStatus, count: usize) -> String {
    match status {
        SyncStatus::Equal => "up to date".to_string(),
        SyncStatus::Ahead => format!("ahead {count}"),
        SyncStatus::Behind => format!("behind {count}"),
        SyncStatus::Diverged => format!("diverged ({count})"),
        SyncStatus::NoTracking => "no upstream".to_string(),
    }
}

fn print_branch_status(workspace: &Workspace, name: &str) {
    let Ok(branch) = BranchName::new(name) else {
        return;
    };
    if !workspace.git.branch_exists(&branch) {
        println!("      (not created)");
        return;
    }
    match workspace.git.compare_with_remote(&branch) {
        Ok((status, count)) => println!("      {}", status_label(status, count)),
        Err(_) => println!("      (status unavailable)"),
    }
}

fn print_node(workspace: &Workspace, bt: &BranchType, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{} ({:?})", bt.name, bt.kind);
    if bt.kind == crate::core::topology::Kind::Base {
        print_branch_status(workspace, &bt.name);
    }
    for child_name in workspace.topology.children_of(&bt.name) {
        if let Some(child) = workspace.topology.get(child_name) {
            print_node(workspace, child, depth + 1);
        }
    }
}

pub fn overview(ctx: &Context) -> Result<()> {
    let workspace = Workspace::open_initialized(ctx)?;

    let roots: Vec<&BranchType> = workspace
        .topology
        .names()
        .filter_map(|n| workspace.topology.get(n))
        .filter(|bt| bt.parent.is_none())
        .collect();

    for root in roots {
        print_node(&workspace, root, 0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overview_runs_on_default_topology() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let tree_oid = repo.index().unwrap().write_tree().unwrap();
        let tree = repo.find_tree(tree_oid).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();

        let ctx = Context {
            cwd: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        crate::cli::commands::init::init(&ctx, false, false).unwrap();
        overview(&ctx).unwrap();
    }
}
