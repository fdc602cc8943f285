//! Fetches one chart version from its upstream onto local disk as a
//! `.tgz` tarball, by delegating to the Helm CLI per §4.8's source-kind
//! contracts. The mirror engine always ends up with the tarball path,
//! regardless of which of the three source kinds produced it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lazyoci_core::model::{SourceKind, UpstreamConfig};
use lazyoci_core::{subprocess, Error, Result};

const HELM_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Pull `upstream`'s `version` into `destination`, returning the path to
/// the resulting chart tarball.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Subprocess`] if any Helm CLI invocation
/// fails, or [`lazyoci_core::Error::Format`] if the expected tarball
/// cannot be located afterward.
pub async fn pull(chart_key: &str, upstream: &UpstreamConfig, version: &str, destination: &Path) -> Result<PathBuf> {
    match upstream.kind {
        SourceKind::Repo => pull_from_repo(chart_key, upstream, version, destination).await,
        SourceKind::Oci => pull_from_oci(upstream, version, destination).await,
        SourceKind::Local => pull_from_local(upstream, destination).await,
    }
}

async fn pull_from_repo(chart_key: &str, upstream: &UpstreamConfig, version: &str, destination: &Path) -> Result<PathBuf> {
    let repo_url = upstream
        .repo
        .as_deref()
        .ok_or_else(|| Error::configuration(chart_key, "repo source requires 'repo'"))?;
    let alias = repo_alias(chart_key);

    subprocess::run("helm", ["repo", "add", &alias, repo_url], None, None, HELM_TIMEOUT).await?;
    subprocess::run("helm", ["repo", "update", &alias], None, None, HELM_TIMEOUT).await?;

    let chart_ref = format!("{alias}/{}", upstream.chart);
    subprocess::run(
        "helm",
        [
            "pull",
            &chart_ref,
            "--version",
            version,
            "--destination",
            &destination.display().to_string(),
        ],
        None,
        None,
        HELM_TIMEOUT,
    )
    .await?;

    locate_tarball(destination, &upstream.chart, version)
}

async fn pull_from_oci(upstream: &UpstreamConfig, version: &str, destination: &Path) -> Result<PathBuf> {
    let registry = upstream
        .registry
        .as_deref()
        .ok_or_else(|| Error::configuration(&upstream.chart, "oci source requires 'registry'"))?;
    let oci_ref = format!("oci://{}/{}", registry.trim_end_matches('/'), upstream.chart);

    subprocess::run(
        "helm",
        [
            "pull",
            &oci_ref,
            "--version",
            version,
            "--destination",
            &destination.display().to_string(),
        ],
        None,
        None,
        HELM_TIMEOUT,
    )
    .await?;

    locate_tarball(destination, &upstream.chart, version)
}

async fn pull_from_local(upstream: &UpstreamConfig, destination: &Path) -> Result<PathBuf> {
    let chart_dir = upstream
        .path
        .as_deref()
        .ok_or_else(|| Error::configuration(&upstream.chart, "local source requires 'path'"))?;
    let chart_dir = Path::new(chart_dir);

    if chart_dir.join("Chart.lock").exists() {
        let _ = subprocess::run(
            "helm",
            ["dependency", "build", &chart_dir.display().to_string(), "--skip-refresh"],
            None,
            None,
            HELM_TIMEOUT,
        )
        .await;
    }

    subprocess::run(
        "helm",
        [
            "package",
            &chart_dir.display().to_string(),
            "--destination",
            &destination.display().to_string(),
        ],
        None,
        None,
        HELM_TIMEOUT,
    )
    .await?;

    locate_any_tarball(destination, &upstream.chart)
}

/// A deterministic, filesystem- and helm-safe alias for a repository add,
/// scoped to this chart's key so two upstreams never collide.
fn repo_alias(chart_key: &str) -> String {
    let sanitized: String = chart_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("lazyoci-{sanitized}")
}

fn locate_tarball(dir: &Path, chart_name: &str, version: &str) -> Result<PathBuf> {
    let exact = dir.join(format!("{chart_name}-{version}.tgz"));
    if exact.is_file() {
        return Ok(exact);
    }
    locate_any_tarball(dir, chart_name)
}

fn locate_any_tarball(dir: &Path, chart_name: &str) -> Result<PathBuf> {
    let prefix = format!("{chart_name}-");
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::format("chart tarball", format!("cannot read {}: {e}", dir.display())))?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(".tgz") {
            return Ok(entry.path());
        }
    }
    Err(Error::format(
        "chart tarball",
        format!("no '{chart_name}-*.tgz' found in {}", dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_alias_is_deterministic_and_sanitized() {
        assert_eq!(repo_alias("my chart/v2"), "lazyoci-my-chart-v2");
        assert_eq!(repo_alias("my chart/v2"), repo_alias("my chart/v2"));
    }

    #[test]
    fn locate_tarball_prefers_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vault-0.28.0.tgz"), b"exact").unwrap();
        std::fs::write(dir.path().join("vault-0.28.0-rc1.tgz"), b"other").unwrap();
        let found = locate_tarball(dir.path(), "vault", "0.28.0").unwrap();
        assert_eq!(found.file_name().unwrap(), "vault-0.28.0.tgz");
    }

    #[test]
    fn locate_tarball_falls_back_to_glob_when_no_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vault-0.28.0+meta.tgz"), b"content").unwrap();
        let found = locate_tarball(dir.path(), "vault", "0.28.0").unwrap();
        assert_eq!(found.file_name().unwrap(), "vault-0.28.0+meta.tgz");
    }

    #[test]
    fn locate_tarball_errors_when_nothing_matches() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate_tarball(dir.path(), "vault", "0.28.0").unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
