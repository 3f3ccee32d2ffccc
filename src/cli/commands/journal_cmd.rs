//! journal command - Inspect the operation journal

use anyhow::{bail, Result};

use crate::cli::commands::common::Workspace;
use crate::core::ops::journal::{Journal, OpId, StepKind};
use crate::engine::Context;

fn print_journal(j: &Journal) {
    println!("{} [{}] phase={:?}", j.op_id, j.command, j.phase);
    println!("  started {}", j.started_at.inner());
    if let Some(finished) = &j.finished_at {
        println!("  finished {}", finished.inner());
    }
    for step in &j.steps {
        match &step.kind {
            StepKind::RefUpdate { refname, old_oid, new_oid } => {
                println!(
                    "  ref-update {refname}: {} -> {new_oid}",
                    old_oid.as_deref().unwrap_or("(none)")
                );
            }
            StepKind::TagCreate { name, oid } => println!("  tag-create {name} @ {oid}"),
            StepKind::ConfigWrite { key, new_value, .. } => println!("  config-write {key}={new_value}"),
            StepKind::ConfigDelete { key, .. } => println!("  config-delete {key}"),
            StepKind::Checkpoint { name } => println!("  checkpoint {name}"),
            StepKind::GitProcess { args, description } => println!("  git {} ({description})", args.join(" ")),
            StepKind::ConflictPaused { branch, git_state } => {
                println!("  conflict-paused {branch} ({git_state})")
            }
        }
    }
}

pub fn journal(ctx: &Context, op: Option<&str>) -> Result<()> {
    let workspace = Workspace::open(ctx)?;

    match op {
        Some(id) => {
            let entry = Journal::read(&workspace.common_dir, &OpId::from_string(id))?;
            print_journal(&entry);
        }
        None => match Journal::most_recent(&workspace.common_dir)? {
            Some(entry) => print_journal(&entry),
            None => bail!("no journal entries found"),
        },
    }
    Ok(())
}
