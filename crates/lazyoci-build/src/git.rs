//! Queries the version-control binary for the template variables that
//! come from repository state. Every query uses empty strings on any
//! failure, per §3: a missing or unreadable git checkout should not make
//! an otherwise-valid build abort.

use std::path::Path;
use std::time::Duration;

use lazyoci_core::subprocess;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);

/// The short commit id of `HEAD`, or empty string if unavailable.
pub async fn short_sha(repo_dir: &Path) -> String {
    run_git(repo_dir, &["rev-parse", "--short", "HEAD"]).await
}

/// The current branch name, or empty string if unavailable (including
/// detached-HEAD state, where `git` prints `HEAD` and that's treated the
/// same as unavailable).
pub async fn branch_name(repo_dir: &Path) -> String {
    let branch = run_git(repo_dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
    if branch == "HEAD" {
        String::new()
    } else {
        branch
    }
}

/// The nearest reachable tag, or empty string if the repository has no
/// tags reachable from `HEAD`.
pub async fn nearest_tag(repo_dir: &Path) -> String {
    run_git(repo_dir, &["describe", "--tags", "--abbrev=0"]).await
}

async fn run_git(repo_dir: &Path, args: &[&str]) -> String {
    match subprocess::run("git", args, Some(repo_dir), None, GIT_TIMEOUT).await {
        Ok(output) => output.stdout_string().trim().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, args = ?args, "git query failed, using empty string");
            String::new()
        }
    }
}
