//! Builds a container image from a Dockerfile and produces an OCI layout.
//!
//! Prefers a `buildx` driver capable of exporting directly to an OCI
//! layout tarball (`docker-container`, `kubernetes`, `remote`); the
//! classic `docker` driver cannot do this. When no such driver is found
//! and the target is single-platform, falls back to a plain
//! `docker build` + `docker save` + Docker-save→OCI-layout conversion.
//! Multi-platform builds with no OCI-capable driver are refused rather
//! than silently narrowed to one platform.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use lazyoci_core::model::ArtifactConfig;
use lazyoci_core::template::TemplateVars;
use lazyoci_core::{subprocess, Error, Result};

use crate::docker_save::docker_save_to_oci_layout;
use crate::handlers::BuildHandler;

const INSPECT_TIMEOUT: Duration = Duration::from_secs(30);
const BUILD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// `buildx` driver names whose `--output type=oci` support writes the
/// layout directly, without an intermediate daemon image.
const OCI_CAPABLE_DRIVERS: &[&str] = &["docker-container", "kubernetes", "remote"];

const MANAGED_BUILDER_NAME: &str = "lazyoci-builder";

pub struct ImageHandler;

#[async_trait]
impl BuildHandler for ImageHandler {
    async fn build(&self, artifact: &ArtifactConfig, index: usize, _vars: &TemplateVars) -> Result<PathBuf> {
        let name = artifact.display_name(index);
        let context = artifact
            .context
            .as_deref()
            .ok_or_else(|| Error::configuration(&name, "image artifact requires 'context'"))?;
        let dockerfile = artifact.dockerfile.as_deref().unwrap_or("Dockerfile");
        let platforms = artifact.platforms.clone().unwrap_or_default();
        let multi_platform = platforms.len() > 1;

        let layout_dir = tempfile::Builder::new()
            .prefix("lazyoci-image-")
            .tempdir()?
            .into_path();

        if let Some(builder) = find_oci_capable_builder().await? {
            build_with_buildx(&builder, context, dockerfile, &platforms, &artifact.build_args, &layout_dir).await?;
        } else if multi_platform {
            return Err(Error::subprocess(
                "buildx",
                "no OCI-capable builder driver found; multi-platform builds require a driver such as \
                 docker-container (run `docker buildx create --driver docker-container` and retry)",
            ));
        } else {
            build_with_daemon_fallback(context, dockerfile, &artifact.build_args, &layout_dir).await?;
        }

        Ok(layout_dir)
    }
}

async fn find_oci_capable_builder() -> Result<Option<String>> {
    if !subprocess::binary_exists("docker") {
        return Ok(None);
    }
    let ls_output = match subprocess::run("docker", ["buildx", "ls"], None, None, INSPECT_TIMEOUT).await {
        Ok(out) => out.stdout_string(),
        Err(_) => return Ok(None),
    };
    for line in ls_output.lines() {
        if OCI_CAPABLE_DRIVERS.iter().any(|driver| line.contains(driver)) {
            if let Some(name) = line.split_whitespace().next() {
                return Ok(Some(name.trim_end_matches('*').to_string()));
            }
        }
    }

    let created = subprocess::run(
        "docker",
        ["buildx", "create", "--name", MANAGED_BUILDER_NAME, "--driver", "docker-container"],
        None,
        None,
        INSPECT_TIMEOUT,
    )
    .await;
    Ok(created.ok().map(|_| MANAGED_BUILDER_NAME.to_string()))
}

async fn build_with_buildx(
    builder: &str,
    context: &str,
    dockerfile: &str,
    platforms: &[String],
    build_args: &HashMap<String, String>,
    layout_dir: &Path,
) -> Result<()> {
    let export_tar = tempfile::Builder::new()
        .prefix("lazyoci-image-export-")
        .suffix(".tar")
        .tempfile()?;

    let mut args = vec![
        "buildx".to_string(),
        "build".to_string(),
        "--builder".to_string(),
        builder.to_string(),
        "-f".to_string(),
        dockerfile.to_string(),
    ];
    if !platforms.is_empty() {
        args.push("--platform".to_string());
        args.push(platforms.join(","));
    }
    for (key, value) in build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{key}={value}"));
    }
    args.push("--output".to_string());
    args.push(format!("type=oci,dest={}", export_tar.path().display()));
    args.push(context.to_string());

    subprocess::run("docker", args, None, None, BUILD_TIMEOUT).await?;

    let file = std::fs::File::open(export_tar.path())?;
    let mut archive = tar::Archive::new(file);
    archive.unpack(layout_dir)?;
    Ok(())
}

async fn build_with_daemon_fallback(
    context: &str,
    dockerfile: &str,
    build_args: &HashMap<String, String>,
    layout_dir: &Path,
) -> Result<()> {
    if !subprocess::binary_exists("docker") {
        return Err(Error::subprocess("docker", "docker binary not found on PATH"));
    }

    let local_tag = format!("lazyoci-build:{}-{}", std::process::id(), chrono::Utc::now().timestamp());

    let mut build_cmd = vec![
        "build".to_string(),
        "-f".to_string(),
        dockerfile.to_string(),
        "-t".to_string(),
        local_tag.clone(),
    ];
    for (key, value) in build_args {
        build_cmd.push("--build-arg".to_string());
        build_cmd.push(format!("{key}={value}"));
    }
    build_cmd.push(context.to_string());
    subprocess::run("docker", build_cmd, None, None, BUILD_TIMEOUT).await?;

    let save_tar = tempfile::Builder::new()
        .prefix("lazyoci-image-save-")
        .suffix(".tar")
        .tempfile()?;
    let save_result = subprocess::run(
        "docker",
        ["save", "-o", &save_tar.path().display().to_string(), &local_tag],
        None,
        None,
        BUILD_TIMEOUT,
    )
    .await;
    let _ = subprocess::run("docker", ["rmi", "-f", &local_tag], None, None, INSPECT_TIMEOUT).await;
    save_result?;

    docker_save_to_oci_layout(save_tar.path(), layout_dir, Some(&local_tag))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_list_parsing_recognizes_container_driver() {
        let line = "mybuilder docker-container running linux/amd64";
        assert!(OCI_CAPABLE_DRIVERS.iter().any(|d| line.contains(d)));
    }

    #[tokio::test]
    async fn missing_context_is_a_configuration_error() {
        let artifact = ArtifactConfig {
            kind: lazyoci_core::model::ArtifactKind::Image,
            name: Some("web".to_string()),
            targets: vec![],
            dockerfile: None,
            context: None,
            platforms: None,
            build_args: HashMap::new(),
            chart_path: None,
            files: None,
            media_type: None,
            image: None,
        };
        let handler = ImageHandler;
        let err = handler.build(&artifact, 0, &TemplateVars::default()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
