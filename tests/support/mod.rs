//! Shared fixture for the integration tests: a real git repository driven
//! through the command handlers the same way the CLI binary would.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use gitflow::cli::commands;
use gitflow::engine::Context;
use gitflow::git::Git;

pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// A repo with a single commit on `main`, gitflow not yet initialized.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");

        run_git(dir.path(), &["init", "-b", "main"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "core.editor", "true"]);
        run_git(dir.path(), &["config", "sequence.editor", "true"]);

        std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);

        Self { dir }
    }

    /// A repo with gitflow initialized and a `develop` branch created off `main`.
    pub fn new_initialized() -> Self {
        let repo = Self::new();
        repo.init();
        run_git(repo.path(), &["branch", "develop"]);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    pub fn context(&self) -> Context {
        Context {
            cwd: Some(self.path().to_path_buf()),
            quiet: true,
            interactive: false,
            no_verify: false,
            force: false,
        }
    }

    pub fn init(&self) {
        let ctx = self.context();
        commands::init::init(&ctx, false, false).expect("init failed");
    }

    pub fn start(&self, branch_type: &str, name: &str) {
        let ctx = self.context();
        commands::start::start(&ctx, branch_type, name, None, Some(false)).expect("start failed");
    }

    pub fn commit(&self, filename: &str, content: &str, message: &str) {
        std::fs::write(self.dir.path().join(filename), content).unwrap();
        run_git(self.path(), &["add", filename]);
        run_git(self.path(), &["commit", "-m", message]);
    }

    pub fn checkout(&self, name: &str) {
        run_git(self.path(), &["checkout", name]);
    }

    pub fn current_branch(&self) -> String {
        let output = Command::new("git")
            .args(["branch", "--show-current"])
            .current_dir(self.path())
            .output()
            .expect("git branch failed");
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", &format!("refs/heads/{name}")])
            .current_dir(self.path())
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}
