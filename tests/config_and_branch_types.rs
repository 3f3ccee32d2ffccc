//! `gitflow config` get/set/unset and `gitflow config branch-type` management.

mod support;

use gitflow::cli::args::{BranchTypeAction, ConfigScopeArg};
use gitflow::cli::commands;
use gitflow::cli::commands::common::Workspace;

use support::TestRepo;

#[test]
fn set_get_unset_round_trip() {
    let repo = TestRepo::new_initialized();
    let ctx = repo.context();

    commands::config_cmd::set(&ctx, "gitflow.feature.finish.rebase", "true", ConfigScopeArg::Local).unwrap();
    let workspace = Workspace::open(&ctx).unwrap();
    assert_eq!(
        workspace.config.get_string("gitflow.feature.finish.rebase").unwrap(),
        Some("true".to_string())
    );

    commands::config_cmd::unset(&ctx, "gitflow.feature.finish.rebase", ConfigScopeArg::Local).unwrap();
    let workspace = Workspace::open(&ctx).unwrap();
    assert_eq!(workspace.config.get_string("gitflow.feature.finish.rebase").unwrap(), None);
}

#[test]
fn get_unknown_key_errors() {
    let repo = TestRepo::new_initialized();
    let ctx = repo.context();
    let result = commands::config_cmd::get(&ctx, "gitflow.does.not.exist");
    assert!(result.is_err());
}

#[test]
fn branch_type_add_then_start_uses_new_prefix() {
    let repo = TestRepo::new_initialized();
    let ctx = repo.context();

    commands::config_cmd::branch_type(
        &ctx,
        BranchTypeAction::Add {
            name: "bugfix".to_string(),
            parent: Some("develop".to_string()),
            prefix: Some("bugfix/".to_string()),
            base: false,
        },
    )
    .unwrap();

    repo.start("bugfix", "off-by-one");
    assert!(repo.branch_exists("bugfix/off-by-one"));
}

#[test]
fn branch_type_add_rejects_duplicate_name() {
    let repo = TestRepo::new_initialized();
    let ctx = repo.context();
    let result = commands::config_cmd::branch_type(
        &ctx,
        BranchTypeAction::Add {
            name: "feature".to_string(),
            parent: Some("develop".to_string()),
            prefix: Some("feature/".to_string()),
            base: false,
        },
    );
    assert!(result.is_err());
}

#[test]
fn branch_type_edit_patches_only_given_fields() {
    let repo = TestRepo::new_initialized();
    let ctx = repo.context();

    commands::config_cmd::branch_type(
        &ctx,
        BranchTypeAction::Add {
            name: "bugfix".to_string(),
            parent: Some("develop".to_string()),
            prefix: Some("bugfix/".to_string()),
            base: false,
        },
    )
    .unwrap();
    commands::config_cmd::branch_type(
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

#[test]
fn branch_type_remove_drops_it_from_topology() {
    let repo = TestRepo::new_initialized();
    let ctx = repo.context();

    commands::config_cmd::branch_type(
        &ctx,
        BranchTypeAction::Add {
            name: "bugfix".to_string(),
            parent: Some("develop".to_string()),
            prefix: Some("bugfix/".to_string()),
            base: false,
        },
    )
    .unwrap();
    commands::config_cmd::branch_type(&ctx, BranchTypeAction::Remove { name: "bugfix".to_string() }).unwrap();

    let workspace = Workspace::open(&ctx).unwrap();
    assert!(workspace.topology.get("bugfix").is_none());
}
