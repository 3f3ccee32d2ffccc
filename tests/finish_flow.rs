//! `gitflow finish` end to end: clean merge, tagging, and child cascade.

mod support;

use gitflow::cli::args::StrategyArgs;
use gitflow::cli::commands;
use gitflow::cli::commands::finish::FinishArgs;

use support::{run_git, TestRepo};

fn no_strategy_flags() -> StrategyArgs {
    StrategyArgs {
        squash: false,
        no_squash: false,
        rebase: false,
        no_rebase: false,
        preserve_merges: false,
    }
}

fn finish_args<'a>(branch_type: &'a str, name: &'a str) -> FinishArgs<'a> {
    FinishArgs {
        branch_type: Some(branch_type),
        name: Some(name),
        continue_: false,
        abort: false,
        strategy: Box::leak(Box::new(no_strategy_flags())),
        no_ff: false,
        ff: false,
        tag: false,
        notag: false,
        tagname: None,
        message: None,
        message_file: None,
        sign: false,
        signingkey: None,
        keep: false,
        keeplocal: false,
        keepremote: false,
        force_delete: false,
        fetch: false,
        no_fetch: true,
    }
}

#[test]
fn finish_merges_feature_into_develop_and_deletes_it() {
    let repo = TestRepo::new_initialized();
    repo.start("feature", "login");
    repo.commit("login.rs", "fn login() {}\n", "add login");

    let ctx = repo.context();
    commands::finish::finish(&ctx, finish_args("feature", "login")).unwrap();

    assert!(!repo.branch_exists("feature/login"));
    run_git(repo.path(), &["checkout", "develop"]);
    let contents = std::fs::read_to_string(repo.path().join("login.rs")).unwrap();
    assert_eq!(contents, "fn login() {}\n");
}

#[test]
fn finish_tags_a_release_and_cascades_to_develop() {
    let repo = TestRepo::new_initialized();
    repo.start("release", "1.0.0");
    repo.commit("CHANGELOG.md", "1.0.0\n", "prep release");

    let ctx = repo.context();
    commands::finish::finish(&ctx, finish_args("release", "1.0.0")).unwrap();

    assert!(!repo.branch_exists("release/1.0.0"));
    assert!(run_git_tag_exists(&repo, "v1.0.0"));

    // develop auto-updates off main, so the release commit lands there too.
    run_git(repo.path(), &["checkout", "develop"]);
    let contents = std::fs::read_to_string(repo.path().join("CHANGELOG.md")).unwrap();
    assert_eq!(contents, "1.0.0\n");
}

#[test]
fn finish_refuses_a_second_concurrent_run() {
    let repo = TestRepo::new_initialized();
    repo.start("feature", "login");
    repo.commit("login.rs", "fn login() {}\n", "add login");

    let workspace = commands::common::Workspace::open(&repo.context()).unwrap();
    let state = gitflow::core::merge_state::MergeState {
        action: gitflow::core::merge_state::Action::Finish,
        branch_type: "feature".to_string(),
        branch_name: "other".to_string(),
        full_branch_name: "feature/other".to_string(),
        parent_branch: "develop".to_string(),
        current_step: gitflow::core::merge_state::FinishStep::Merge,
        merge_strategy: gitflow::core::topology::UpstreamStrategy::Merge,
        child_branches: vec![],
        child_strategies: Default::default(),
        updated_branches: Default::default(),
        current_child_branch: None,
        squash_message: None,
        merge_message: None,
        update_message: None,
        no_verify: false,
        preserve_merges: false,
        no_fast_forward: false,
        should_tag: false,
        tag_name: String::new(),
        tag_message: String::new(),
        message_file: None,
        should_sign: false,
        signing_key: None,
        keep_local: false,
        keep_remote: false,
        force_delete: false,
        remote: "origin".to_string(),
    };
    state.save(&workspace.common_dir).unwrap();

    let ctx = repo.context();
    let result = commands::finish::finish(&ctx, finish_args("feature", "login"));
    assert!(result.is_err());
}

fn run_git_tag_exists(repo: &TestRepo, tag: &str) -> bool {
    let output = std::process::Command::new("git")
        .args(["tag", "-l", tag])
        .current_dir(repo.path())
        .output()
        .unwrap();
    !String::from_utf8_lossy(&output.stdout).trim().is_empty()
}
