//! Re-packages an image already present in the local Docker daemon: a
//! plain `docker save`, then the Docker-save→OCI-layout converter.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use lazyoci_core::model::ArtifactConfig;
use lazyoci_core::template::TemplateVars;
use lazyoci_core::{subprocess, Error, Result};

use crate::docker_save::docker_save_to_oci_layout;
use crate::handlers::BuildHandler;

const SAVE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub struct DockerHandler;

#[async_trait]
impl BuildHandler for DockerHandler {
    async fn build(&self, artifact: &ArtifactConfig, index: usize, _vars: &TemplateVars) -> Result<PathBuf> {
        let name = artifact.display_name(index);
        let image = artifact
            .image
            .as_deref()
            .ok_or_else(|| Error::configuration(&name, "docker artifact requires 'image'"))?;

        if !subprocess::binary_exists("docker") {
            return Err(Error::subprocess("docker", "docker binary not found on PATH"));
        }

        let save_tar = tempfile::Builder::new()
            .prefix("lazyoci-daemon-save-")
            .suffix(".tar")
            .tempfile()?;
        subprocess::run(
            "docker",
            ["save", "-o", &save_tar.path().display().to_string(), image],
            None,
            None,
            SAVE_TIMEOUT,
        )
        .await?;

        let layout_dir = tempfile::Builder::new()
            .prefix("lazyoci-daemon-")
            .tempdir()?
            .into_path();
        docker_save_to_oci_layout(save_tar.path(), &layout_dir, Some(image))?;
        Ok(layout_dir)
    }
}
