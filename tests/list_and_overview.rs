//! `gitflow list` and `gitflow overview` against a populated topology.

mod support;

use gitflow::cli::commands;

use support::TestRepo;

#[test]
fn list_runs_clean_with_and_without_a_type_filter() {
    let repo = TestRepo::new_initialized();
    repo.start("feature", "login");
    repo.checkout("develop");

    let ctx = repo.context();
    commands::list::list(&ctx, None).unwrap();
    commands::list::list(&ctx, Some("feature")).unwrap();
    commands::list::list(&ctx, Some("hotfix")).unwrap();
}

#[test]
fn overview_runs_over_the_full_topology() {
    let repo = TestRepo::new_initialized();
    repo.start("feature", "login");
    repo.checkout("develop");

    let ctx = repo.context();
    commands::overview::overview(&ctx).unwrap();
}
