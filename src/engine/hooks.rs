//! engine::hooks
//!
//! Dispatches the filter and pre/post hook extension points around a
//! branch-type action (`start`, `finish`, `update`, ...). Scripts live in the
//! resolved hooks directory (see [`crate::core::config::resolve_hooks_dir`])
//! under fixed names:
//!
//! - `filter-flow-<type>-<action>-<target>` — may rewrite a value
//! - `pre-flow-<type>-<action>` — may abort the operation
//! - `post-flow-<type>-<action>` — always runs, exit code ignored

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Errors from the hook/filter dispatcher.
#[derive(Debug, Error)]
pub enum HookError {
    /// A filter script exited non-zero.
    #[error("filter failed: {0}")]
    FilterFailed(String),

    /// A pre-hook exited non-zero.
    #[error("hook failed: {0}")]
    HookFailed(String),

    /// I/O error spawning or reading a script.
    #[error("hook I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Context passed to a filter script, both as positional arguments and as
/// environment variables.
#[derive(Debug, Clone)]
pub struct FilterContext {
    /// The branch type name, e.g. `"feature"`.
    pub branch_type: String,
    /// The short branch name, e.g. `"login"`.
    pub branch_name: String,
    /// The full branch ref name, e.g. `"feature/login"`.
    pub full_branch: String,
    /// The branch this action merges into or starts from.
    pub base_branch: String,
    /// The default remote name.
    pub origin: String,
    /// The version being released, if applicable (release/hotfix tagging).
    pub version: Option<String>,
    /// A tag message template, if one is being resolved.
    pub tag_message: Option<String>,
}

/// Context passed to a pre/post hook script.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The branch type name, e.g. `"feature"`.
    pub branch_type: String,
    /// The short branch name, e.g. `"login"`.
    pub branch_name: String,
    /// The full branch ref name, e.g. `"feature/login"`.
    pub full_branch: String,
    /// The branch this action merges into or starts from.
    pub base_branch: String,
    /// The default remote name.
    pub origin: String,
    /// The version being released, if applicable.
    pub version: Option<String>,
    /// The operation's exit code. Only meaningful for post-hooks.
    pub exit_code: Option<i32>,
}

impl HookContext {
    fn env(&self) -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        env.insert("BRANCH", self.full_branch.clone());
        env.insert("BRANCH_NAME", self.branch_name.clone());
        env.insert("BRANCH_TYPE", self.branch_type.clone());
        env.insert("BASE_BRANCH", self.base_branch.clone());
        env.insert("ORIGIN", self.origin.clone());
        if let Some(version) = &self.version {
            env.insert("VERSION", version.clone());
        }
        if let Some(code) = self.exit_code {
            env.insert("EXIT_CODE", code.to_string());
        }
        env
    }
}

impl FilterContext {
    fn env(&self) -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        env.insert("BRANCH", self.full_branch.clone());
        env.insert("BRANCH_NAME", self.branch_name.clone());
        env.insert("BRANCH_TYPE", self.branch_type.clone());
        env.insert("BASE_BRANCH", self.base_branch.clone());
        env.insert("ORIGIN", self.origin.clone());
        if let Some(version) = &self.version {
            env.insert("VERSION", version.clone());
        }
        env
    }

    fn to_hook_context(&self, exit_code: Option<i32>) -> HookContext {
        HookContext {
            branch_type: self.branch_type.clone(),
            branch_name: self.branch_name.clone(),
            full_branch: self.full_branch.clone(),
            base_branch: self.base_branch.clone(),
            origin: self.origin.clone(),
            version: self.version.clone(),
            exit_code,
        }
    }
}

/// Whether a path exists and is executable.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run `filter-flow-<type>-<action>-<target>`, if present and executable.
///
/// Returns the filtered value (trimmed stdout) if the script produced
/// non-empty output, or `original` unchanged if the script is missing, not
/// executable, or produced empty output.
pub fn run_filter(
    hooks_dir: &Path,
    action: &str,
    target: &str,
    ctx: &FilterContext,
    args: &[&str],
    original: &str,
) -> Result<String, HookError> {
    let script_name = format!("filter-flow-{}-{}-{}", ctx.branch_type, action, target);
    let script = hooks_dir.join(&script_name);

    if !is_executable(&script) {
        return Ok(original.to_string());
    }

    let mut command = Command::new(&script);
    command.args(args);
    for (key, value) in ctx.env() {
        command.env(key, value);
    }

    let output = command.output()?;
    if !output.status.success() {
        return Err(HookError::FilterFailed(format!(
            "{script_name} exited with {:?}",
            output.status.code()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        Ok(original.to_string())
    } else {
        Ok(stdout)
    }
}

/// Run `pre-flow-<type>-<action>`, if present and executable. A non-zero
/// exit aborts the enclosing operation.
pub fn run_pre_hook(hooks_dir: &Path, action: &str, ctx: &HookContext) -> Result<(), HookError> {
    let script_name = format!("pre-flow-{}-{}", ctx.branch_type, action);
    run_hook_script(hooks_dir, &script_name, ctx).and_then(|status| {
        if status.map(|s| s.success()).unwrap_or(true) {
            Ok(())
        } else {
            Err(HookError::HookFailed(script_name))
        }
    })
}

/// Run `post-flow-<type>-<action>`, if present and executable. The exit code
/// is ignored: post-hooks always run and never fail the enclosing operation.
pub fn run_post_hook(hooks_dir: &Path, action: &str, ctx: &HookContext) {
    let script_name = format!("post-flow-{}-{}", ctx.branch_type, action);
    let _ = run_hook_script(hooks_dir, &script_name, ctx);
}

fn run_hook_script(
    hooks_dir: &Path,
    script_name: &str,
    ctx: &HookContext,
) -> Result<Option<std::process::ExitStatus>, HookError> {
    let script = hooks_dir.join(script_name);
    if !is_executable(&script) {
        return Ok(None);
    }

    let mut command = Command::new(&script);
    for (key, value) in ctx.env() {
        command.env(key, value);
    }
    Ok(Some(command.status()?))
}

/// Wrap a closure with the pre/post hook pair for `action`: the pre-hook
/// runs first (aborting on failure), then `f`, then the post-hook always
/// runs with the captured outcome's exit code.
pub fn with_hooks<T, E, F>(
    hooks_dir: &Path,
    action: &str,
    ctx: &FilterContext,
    f: F,
) -> Result<T, HookError>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    let pre_ctx = ctx.to_hook_context(None);
    run_pre_hook(hooks_dir, action, &pre_ctx)?;

    let result = f();

    let exit_code = match &result {
        Ok(_) => Some(0),
        Err(_) => Some(1),
    };
    let post_ctx = ctx.to_hook_context(exit_code);
    run_post_hook(hooks_dir, action, &post_ctx);

    result.map_err(|e| HookError::HookFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    fn sample_filter_ctx() -> FilterContext {
        FilterContext {
            branch_type: "feature".to_string(),
            branch_name: "login".to_string(),
            full_branch: "feature/login".to_string(),
            base_branch: "develop".to_string(),
            origin: "origin".to_string(),
            version: None,
            tag_message: None,
        }
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    fn missing_filter_returns_original() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sample_filter_ctx();
        let result = run_filter(dir.path(), "start", "name", &ctx, &[], "original").unwrap();
        assert_eq!(result, "original");
    }

    #[cfg(unix)]
    #[test]
    fn filter_with_output_replaces_value() {
        let dir = tempfile::tempdir().unwrap();
        write_script(
            dir.path(),
            "filter-flow-feature-start-name",
            "echo filtered-value",
        );
        let ctx = sample_filter_ctx();
        let result = run_filter(dir.path(), "start", "name", &ctx, &[], "original").unwrap();
        assert_eq!(result, "filtered-value");
    }

    #[cfg(unix)]
    #[test]
    fn filter_with_empty_output_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "filter-flow-feature-start-name", "true");
        let ctx = sample_filter_ctx();
        let result = run_filter(dir.path(), "start", "name", &ctx, &[], "original").unwrap();
        assert_eq!(result, "original");
    }

    #[cfg(unix)]
    #[test]
    fn failing_filter_errors() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "filter-flow-feature-start-name", "exit 1");
        let ctx = sample_filter_ctx();
        let result = run_filter(dir.path(), "start", "name", &ctx, &[], "original");
        assert!(matches!(result, Err(HookError::FilterFailed(_))));
    }

    #[test]
    fn missing_pre_hook_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sample_filter_ctx().to_hook_context(None);
        assert!(run_pre_hook(dir.path(), "start", &ctx).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn failing_pre_hook_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "pre-flow-feature-start", "exit 1");
        let ctx = sample_filter_ctx().to_hook_context(None);
        assert!(matches!(
            run_pre_hook(dir.path(), "start", &ctx),
            Err(HookError::HookFailed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn post_hook_exit_code_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "post-flow-feature-start", "exit 1");
        let ctx = sample_filter_ctx().to_hook_context(Some(0));
        // Should not panic and nothing to assert on success/failure since return is unit.
        run_post_hook(dir.path(), "start", &ctx);
    }

    #[test]
    fn with_hooks_runs_closure_when_no_pre_hook() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = sample_filter_ctx();
        let result: Result<i32, HookError> = with_hooks(dir.path(), "start", &ctx, || {
            Ok::<i32, std::convert::Infallible>(42)
        });
        assert_eq!(result.unwrap(), 42);
    }

    #[cfg(unix)]
    #[test]
    fn with_hooks_propagates_pre_hook_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "pre-flow-feature-start", "exit 1");
        let ctx = sample_filter_ctx();
        let result: Result<i32, HookError> = with_hooks(dir.path(), "start", &ctx, || {
            Ok::<i32, std::convert::Infallible>(42)
        });
        assert!(result.is_err());
    }
}
