//! Drives the chart-then-images state machine from §4.8 for every
//! configured chart and version: probe the target, pull and push the
//! chart via the Helm CLI, render it to extract image references, and
//! copy each image through a bounded-concurrency work group that never
//! lets one image's failure cancel its siblings.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use lazyoci_core::model::{
    ChartResult, ChartStatus, ImageResult, ImageStatus, MirrorConfig, MirrorSummary, MirrorTarget,
    UpstreamConfig, VersionResult,
};
use lazyoci_core::{subprocess, Error, Result};

use lazyoci_registry::CredentialProvider;

use crate::copy::copy_one_image;
use crate::extract::extract_image_references;
use crate::upstream;

const HELM_PUSH_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEFAULT_CONCURRENCY: usize = 4;

/// Per-invocation options for a mirror run.
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Bypass the skip-if-present probe and unconditionally copy.
    pub force: bool,
    /// Report what would happen without pulling, pushing, or copying.
    pub dry_run: bool,
    /// Maximum concurrent image copies per `(chart, version)` pair.
    pub concurrency: usize,
    /// Use plain HTTP (and skip TLS verification) against the target.
    pub plain_http: bool,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY,
            plain_http: false,
        }
    }
}

/// Mirror every chart and every configured version in `config`.
///
/// `credential_provider` is shared, unchanged, between the source and
/// destination sides of every copy: [`lazyoci_credentials::CredentialChain`]
/// already resolves independently per host, which is what keeps two
/// registries in the same run from leaking credentials into each other.
///
/// # Errors
/// Returns `Err` only if `config.validate()` would also fail; individual
/// chart/version/image failures are recorded in the returned summary.
pub async fn mirror_all(
    config: &MirrorConfig,
    options: &MirrorOptions,
    credential_provider: Arc<dyn CredentialProvider>,
) -> Result<MirrorSummary> {
    config.validate()?;

    let mut summary = MirrorSummary {
        dry_run: options.dry_run,
        ..Default::default()
    };
    for (chart_key, upstream_config) in &config.upstreams {
        let result = mirror_chart(
            chart_key,
            upstream_config,
            &config.target,
            None,
            options,
            &credential_provider,
        )
        .await;
        summary.charts.push(result);
    }
    Ok(summary)
}

/// Mirror a single chart, optionally restricted to `version_override`
/// instead of its configured version list.
///
/// # Errors
/// Returns [`Error::Configuration`] if `chart_key` is not present in
/// `config.upstreams`.
pub async fn mirror_one(
    config: &MirrorConfig,
    chart_key: &str,
    version_override: Option<&[String]>,
    options: &MirrorOptions,
    credential_provider: Arc<dyn CredentialProvider>,
) -> Result<MirrorSummary> {
    config.validate()?;
    let upstream_config = config
        .upstreams
        .get(chart_key)
        .ok_or_else(|| Error::configuration("mirror config", format!("no upstream named '{chart_key}'")))?;

    let result = mirror_chart(
        chart_key,
        upstream_config,
        &config.target,
        version_override,
        options,
        &credential_provider,
    )
    .await;
    Ok(MirrorSummary {
        charts: vec![result],
        dry_run: options.dry_run,
    })
}

async fn mirror_chart(
    chart_key: &str,
    upstream_config: &UpstreamConfig,
    target: &MirrorTarget,
    version_override: Option<&[String]>,
    options: &MirrorOptions,
    credential_provider: &Arc<dyn CredentialProvider>,
) -> ChartResult {
    let versions = version_override.unwrap_or(&upstream_config.versions);
    let mut versions_result = Vec::with_capacity(versions.len());
    for version in versions {
        let result = mirror_version(chart_key, upstream_config, target, version, options, credential_provider).await;
        versions_result.push(result);
    }
    ChartResult {
        chart_key: chart_key.to_string(),
        versions: versions_result,
    }
}

async fn mirror_version(
    chart_key: &str,
    upstream_config: &UpstreamConfig,
    target: &MirrorTarget,
    version: &str,
    options: &MirrorOptions,
    credential_provider: &Arc<dyn CredentialProvider>,
) -> VersionResult {
    let chart_base = chart_base_ref(target, chart_key);
    let chart_tag_ref = format!("{chart_base}:{version}");

    let already_present = if options.force {
        false
    } else {
        match lazyoci_registry::manifest_exists(&chart_tag_ref, credential_provider.as_ref(), options.plain_http).await {
            Ok(present) => present,
            Err(e) => {
                return VersionResult {
                    version: version.to_string(),
                    chart_status: ChartStatus::Failed,
                    images_copied: 0,
                    images_skipped: 0,
                    images_failed: 0,
                    images: Vec::new(),
                    error: Some(e.to_string()),
                };
            }
        }
    };

    let workdir = match tempfile::Builder::new().prefix("lazyoci-mirror-").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            return VersionResult {
                version: version.to_string(),
                chart_status: ChartStatus::Failed,
                images_copied: 0,
                images_skipped: 0,
                images_failed: 0,
                images: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };

    let tarball = match upstream::pull(chart_key, upstream_config, version, workdir.path()).await {
        Ok(path) => path,
        Err(e) => {
            return VersionResult {
                version: version.to_string(),
                chart_status: ChartStatus::Failed,
                images_copied: 0,
                images_skipped: 0,
                images_failed: 0,
                images: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };

    let chart_status = if already_present {
        ChartStatus::Skipped
    } else if options.dry_run {
        ChartStatus::DryRun
    } else {
        match push_chart(&tarball, &chart_base, target.insecure).await {
            Ok(()) => ChartStatus::Pushed,
            Err(e) => {
                tracing::warn!(chart = chart_key, error = %e, "chart push failed, still extracting images");
                ChartStatus::Failed
            }
        }
    };
    let chart_error = (chart_status == ChartStatus::Failed).then(|| "helm push failed".to_string());

    let references = match extract_image_references(&tarball).await {
        Ok(refs) => refs,
        Err(e) => {
            return VersionResult {
                version: version.to_string(),
                chart_status,
                images_copied: 0,
                images_skipped: 0,
                images_failed: 0,
                images: Vec::new(),
                error: chart_error.or_else(|| Some(format!("image extraction failed: {e}"))),
            };
        }
    };

    let images = copy_images(references, &chart_base, Arc::clone(credential_provider), options).await;
    let images_copied = images.iter().filter(|r| r.status == ImageStatus::Copied).count();
    let images_skipped = images.iter().filter(|r| r.status == ImageStatus::Skipped).count();
    let images_failed = images.iter().filter(|r| r.status == ImageStatus::Failed).count();

    VersionResult {
        version: version.to_string(),
        chart_status,
        images_copied,
        images_skipped,
        images_failed,
        images,
        error: chart_error,
    }
}

async fn push_chart(tarball: &std::path::Path, chart_base: &str, insecure: bool) -> Result<()> {
    let mut args = vec![
        "push".to_string(),
        tarball.display().to_string(),
        format!("oci://{chart_base}"),
    ];
    if insecure {
        args.push("--plain-http".to_string());
    }
    subprocess::run("helm", args, None, None, HELM_PUSH_TIMEOUT).await?;
    Ok(())
}

/// Copy every extracted reference through a work group bounded to
/// `options.concurrency`, preserving the input order in the result list
/// regardless of completion order.
///
/// This fills the concurrency window the same way as any other bounded
/// fan-out in this codebase, with one deliberate difference: a per-image
/// failure is recorded and the group keeps draining, it is never grounds
/// to abort the rest.
async fn copy_images(
    references: Vec<String>,
    dest_base: &str,
    credential_provider: Arc<dyn CredentialProvider>,
    options: &MirrorOptions,
) -> Vec<ImageResult> {
    let limit = options.concurrency.max(1);
    let mut results: Vec<Option<ImageResult>> = (0..references.len()).map(|_| None).collect();
    let mut pending: Vec<(usize, String)> = references.into_iter().enumerate().collect();
    pending.reverse();

    let mut join_set: JoinSet<(usize, ImageResult)> = JoinSet::new();

    while !pending.is_empty() || !join_set.is_empty() {
        while let Some((index, reference)) = pending.pop() {
            let dest_base = dest_base.to_string();
            let plain_http = options.plain_http;
            let force = options.force;
            let dry_run = options.dry_run;
            let provider = Arc::clone(&credential_provider);
            join_set.spawn(copy_task(index, reference, dest_base, provider, plain_http, force, dry_run));

            if join_set.len() >= limit {
                break;
            }
        }

        if let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(join_error) => {
                    tracing::error!(error = %join_error, "image copy task panicked");
                }
            }
        }
    }

    results.into_iter().flatten().collect()
}

async fn copy_task(
    index: usize,
    reference: String,
    dest_base: String,
    credential_provider: Arc<dyn CredentialProvider>,
    plain_http: bool,
    force: bool,
    dry_run: bool,
) -> (usize, ImageResult) {
    let result = copy_one_image(
        &reference,
        &dest_base,
        credential_provider.as_ref(),
        credential_provider.as_ref(),
        plain_http,
        force,
        dry_run,
    )
    .await;
    (index, result)
}

fn chart_base_ref(target: &MirrorTarget, chart_key: &str) -> String {
    let url = target.url.trim_end_matches('/');
    match &target.charts_prefix {
        Some(prefix) if !prefix.is_empty() => format!("{url}/{}/{chart_key}", prefix.trim_matches('/')),
        _ => format!("{url}/{chart_key}"),
    }
}
