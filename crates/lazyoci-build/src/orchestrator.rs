//! Drives one build invocation across every configured artifact: resolves
//! template variables, renders push targets, dispatches the right handler,
//! and pushes the result. Artifacts run strictly in declaration order and
//! a failure in one never aborts the rest.

use std::path::{Path, PathBuf};

use lazyoci_core::model::{
    ArtifactConfig, ArtifactKind, ArtifactResult, BuildFile, BuildReport, TargetResult, TargetStatus,
};
use lazyoci_core::template::TemplateVars;
use lazyoci_core::Result;

use lazyoci_registry::CredentialProvider;

use crate::{chart_meta, git, handlers, version};

/// Per-invocation options threaded through every artifact.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Caller-supplied tag: feeds `{{ .Tag }}` directly and, when it
    /// parses as semver, is a candidate in the version-resolution chain.
    pub tag: Option<String>,
    /// Whether to push the built layout at all.
    pub push: bool,
    /// Emit synthetic "would-push" results instead of building or pushing.
    pub dry_run: bool,
    /// Suppress per-target progress logging.
    pub quiet: bool,
    /// Use plain HTTP against every push target.
    pub plain_http: bool,
    /// Overrides every image artifact's configured platform list.
    pub platform_override: Option<Vec<String>>,
    /// Restrict the run to a single artifact: matched against name, then
    /// kind label, then numeric index, in that order.
    pub filter: Option<String>,
}

struct LayoutGuard(PathBuf);

impl Drop for LayoutGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Run every selected artifact in `build_file` and return the aggregate
/// report. Individual artifact failures are recorded in the report, not
/// propagated; this only returns `Err` if the filter itself is invalid.
pub async fn run_build(
    build_file: &BuildFile,
    options: &BuildOptions,
    credential_provider: &dyn CredentialProvider,
    repo_dir: &Path,
) -> Result<BuildReport> {
    let selected = select_artifacts(&build_file.artifacts, options.filter.as_deref());

    let mut report = BuildReport::default();
    for (index, artifact) in selected {
        let result = run_one_artifact(artifact, index, options, credential_provider, repo_dir).await;
        if !options.quiet {
            tracing::info!(artifact = %result.name, succeeded = result.succeeded, "artifact finished");
        }
        report.artifacts.push(result);
    }
    Ok(report)
}

fn select_artifacts<'a>(
    artifacts: &'a [ArtifactConfig],
    filter: Option<&str>,
) -> Vec<(usize, &'a ArtifactConfig)> {
    let Some(filter) = filter else {
        return artifacts.iter().enumerate().collect();
    };

    let by_name: Vec<_> = artifacts
        .iter()
        .enumerate()
        .filter(|(i, a)| a.display_name(*i) == filter)
        .collect();
    if !by_name.is_empty() {
        return by_name;
    }

    let by_kind: Vec<_> = artifacts
        .iter()
        .enumerate()
        .filter(|(_, a)| a.kind.label() == filter)
        .collect();
    if !by_kind.is_empty() {
        return by_kind;
    }

    if let Ok(numeric_index) = filter.parse::<usize>() {
        if let Some(artifact) = artifacts.get(numeric_index) {
            return vec![(numeric_index, artifact)];
        }
    }

    Vec::new()
}

async fn run_one_artifact(
    artifact: &ArtifactConfig,
    index: usize,
    options: &BuildOptions,
    credential_provider: &dyn CredentialProvider,
    repo_dir: &Path,
) -> ArtifactResult {
    let name = artifact.display_name(index);

    let mut vars = TemplateVars::default();
    if artifact.kind == ArtifactKind::Helm {
        if let Some(chart_path) = &artifact.chart_path {
            match chart_meta::read_chart_metadata(Path::new(chart_path)) {
                Ok(meta) => vars.chart_version = Some(meta.version),
                Err(e) => return failed_artifact(&name, artifact.kind, e.to_string()),
            }
        }
    }

    resolve_template_vars(&mut vars, options, repo_dir).await;

    let rendered_targets = match render_targets(artifact, &vars) {
        Ok(targets) => targets,
        Err(e) => return failed_artifact(&name, artifact.kind, e.to_string()),
    };

    if options.dry_run {
        let targets = rendered_targets
            .into_iter()
            .map(|(registry, tag)| TargetResult {
                registry,
                tag,
                status: TargetStatus::WouldPush,
                digest: None,
                error: None,
            })
            .collect();
        return ArtifactResult {
            name,
            kind: artifact.kind,
            succeeded: true,
            targets,
            error: None,
        };
    }

    let mut effective_artifact = artifact.clone();
    if let Some(platforms) = &options.platform_override {
        if artifact.kind == ArtifactKind::Image {
            effective_artifact.platforms = Some(platforms.clone());
        }
    }

    let handler = handlers::handler_for(artifact.kind);
    let layout_dir = match handler.build(&effective_artifact, index, &vars).await {
        Ok(dir) => LayoutGuard(dir),
        Err(e) => return failed_artifact(&name, artifact.kind, e.to_string()),
    };

    let mut targets = Vec::with_capacity(rendered_targets.len());
    for (registry, tag) in rendered_targets {
        if !options.push {
            targets.push(TargetResult {
                registry,
                tag,
                status: TargetStatus::NotPushed,
                digest: None,
                error: None,
            });
            continue;
        }

        let target_ref = format!("{registry}:{tag}");
        match lazyoci_registry::push(&layout_dir.0, &target_ref, credential_provider, options.plain_http).await {
            Ok(pushed) => targets.push(TargetResult {
                registry,
                tag,
                status: TargetStatus::Pushed,
                digest: Some(pushed.digest),
                error: None,
            }),
            Err(e) => targets.push(TargetResult {
                registry,
                tag,
                status: TargetStatus::Failed,
                digest: None,
                error: Some(e.to_string()),
            }),
        }
    }

    ArtifactResult {
        name,
        kind: artifact.kind,
        succeeded: true,
        targets,
        error: None,
    }
}

fn failed_artifact(name: &str, kind: ArtifactKind, error: String) -> ArtifactResult {
    ArtifactResult {
        name: name.to_string(),
        kind,
        succeeded: false,
        targets: Vec::new(),
        error: Some(error),
    }
}

async fn resolve_template_vars(vars: &mut TemplateVars, options: &BuildOptions, repo_dir: &Path) {
    vars.registry = std::env::var("LAZYOCI_REGISTRY").ok().filter(|s| !s.is_empty());
    vars.tag = options
        .tag
        .clone()
        .or_else(|| std::env::var("LAZYOCI_TAG").ok())
        .filter(|s| !s.is_empty());

    let env_version = std::env::var("LAZYOCI_VERSION").ok().filter(|s| !s.is_empty());
    version::resolve_version_fields(vars, env_version.as_deref(), options.tag.as_deref(), repo_dir).await;

    let sha = git::short_sha(repo_dir).await;
    vars.git_sha = (!sha.is_empty()).then_some(sha);
    let branch = git::branch_name(repo_dir).await;
    vars.git_branch = (!branch.is_empty()).then_some(branch);

    vars.timestamp = Some(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
}

/// Render every target's registry path and each of its tags, returning
/// flattened `(registry, tag)` pairs in target-then-tag order.
fn render_targets(artifact: &ArtifactConfig, vars: &TemplateVars) -> Result<Vec<(String, String)>> {
    let mut rendered = Vec::new();
    for target in &artifact.targets {
        let registry = vars.render(&target.registry)?;
        for tag_template in &target.tags {
            let tag = vars.render(tag_template)?;
            rendered.push((registry.clone(), tag));
        }
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyoci_core::model::{ArtifactKind, PushTarget};
    use std::collections::HashMap;

    fn sample_artifact(name: &str, kind: ArtifactKind) -> ArtifactConfig {
        ArtifactConfig {
            kind,
            name: Some(name.to_string()),
            targets: vec![PushTarget {
                registry: "registry.example.com/app".to_string(),
                tags: vec!["latest".to_string()],
            }],
            dockerfile: None,
            context: Some(".".to_string()),
            platforms: None,
            build_args: HashMap::new(),
            chart_path: None,
            files: None,
            media_type: None,
            image: None,
        }
    }

    #[test]
    fn select_by_name_wins_over_kind_and_index() {
        let artifacts = vec![
            sample_artifact("web", ArtifactKind::Image),
            sample_artifact("worker", ArtifactKind::Image),
        ];
        let selected = select_artifacts(&artifacts, Some("worker"));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, 1);
    }

    #[test]
    fn select_by_kind_when_no_name_matches() {
        let artifacts = vec![
            sample_artifact("web", ArtifactKind::Image),
            sample_artifact("chart", ArtifactKind::Helm),
        ];
        let selected = select_artifacts(&artifacts, Some("image"));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, 0);
    }

    #[test]
    fn select_by_numeric_index_as_last_resort() {
        let artifacts = vec![sample_artifact("web", ArtifactKind::Image)];
        let selected = select_artifacts(&artifacts, Some("0"));
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn no_filter_selects_everything() {
        let artifacts = vec![
            sample_artifact("web", ArtifactKind::Image),
            sample_artifact("worker", ArtifactKind::Image),
        ];
        assert_eq!(select_artifacts(&artifacts, None).len(), 2);
    }

    #[test]
    fn render_targets_flattens_registry_and_tag_pairs() {
        let mut artifact = sample_artifact("web", ArtifactKind::Image);
        artifact.targets.push(PushTarget {
            registry: "registry.example.com/app2".to_string(),
            tags: vec!["v1".to_string(), "v2".to_string()],
        });
        let vars = TemplateVars::default();
        let rendered = render_targets(&artifact, &vars).unwrap();
        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[1], ("registry.example.com/app2".to_string(), "v1".to_string()));
    }

    #[tokio::test]
    async fn dry_run_emits_would_push_without_building() {
        let artifact = sample_artifact("web", ArtifactKind::Image);
        let build_file = BuildFile { version: 1, artifacts: vec![artifact] };
        let options = BuildOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = run_build(
            &build_file,
            &options,
            &lazyoci_registry::AnonymousProvider,
            Path::new("/nonexistent"),
        )
        .await
        .unwrap();
        assert_eq!(report.artifacts.len(), 1);
        assert!(report.artifacts[0].succeeded);
        assert_eq!(report.artifacts[0].targets[0].status, TargetStatus::WouldPush);
    }
}
