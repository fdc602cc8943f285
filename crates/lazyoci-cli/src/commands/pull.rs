//! `lazyoci pull`: the inverse of the build engine's Docker-daemon
//! conversion (§4.5 of the design). Pulls a single-platform manifest and
//! its blobs into an on-disk OCI layout, then either leaves it at
//! `--output` or converts it to a Docker-save tarball and `docker load`s
//! it into the daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lazyoci_build::docker_save::oci_layout_to_docker_save;
use lazyoci_core::oci_layout::{self, Descriptor, Manifest};
use lazyoci_core::{subprocess, Error};
use lazyoci_credentials::CredentialChain;

use crate::cli::{CliError, PullArgs};

const LOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub async fn run(args: &PullArgs) -> Result<PathBuf, CliError> {
    let credentials = CredentialChain::standard();
    let pulled = lazyoci_registry::pull_manifest(&args.reference, &credentials, args.plain_http)
        .await
        .map_err(CliError::from)?;
    let image = pulled.image.ok_or_else(|| {
        CliError::run(format!(
            "'{}' is a multi-platform index; pull a platform-specific child instead",
            args.reference
        ))
    })?;

    let layout_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => tempfile::Builder::new()
            .prefix("lazyoci-pull-")
            .tempdir()
            .map_err(Error::Io)
            .map_err(CliError::from)?
            .into_path(),
    };

    let config_bytes = lazyoci_registry::pull_blob(&args.reference, &image.config.digest, &credentials, args.plain_http)
        .await
        .map_err(CliError::from)?;
    let (config_digest, config_size) = oci_layout::store_blob(&layout_dir, &config_bytes).map_err(CliError::from)?;

    let mut layer_descriptors = Vec::with_capacity(image.layers.len());
    for layer in &image.layers {
        let bytes = lazyoci_registry::pull_blob(&args.reference, &layer.digest, &credentials, args.plain_http)
            .await
            .map_err(CliError::from)?;
        let (digest, size) = oci_layout::store_blob(&layout_dir, &bytes).map_err(CliError::from)?;
        layer_descriptors.push(Descriptor {
            media_type: layer.media_type.clone(),
            digest,
            size,
            annotations: None,
            platform: None,
        });
    }

    let manifest = Manifest {
        schema_version: 2,
        media_type: image
            .media_type
            .clone()
            .unwrap_or_else(|| oci_layout::MEDIA_TYPE_IMAGE_MANIFEST.to_string()),
        artifact_type: None,
        config: Descriptor {
            media_type: image.config.media_type.clone(),
            digest: config_digest,
            size: config_size,
            annotations: None,
            platform: None,
        },
        layers: layer_descriptors,
        annotations: None,
    };
    oci_layout::write_layout(&layout_dir, &manifest, Some(&args.reference)).map_err(CliError::from)?;

    if args.daemon {
        load_into_daemon(&layout_dir, &args.reference).await?;
    }

    Ok(layout_dir)
}

async fn load_into_daemon(layout_dir: &Path, reference: &str) -> Result<(), CliError> {
    if !subprocess::binary_exists("docker") {
        return Err(CliError::run("docker binary not found on PATH"));
    }
    let save_tar = tempfile::Builder::new()
        .prefix("lazyoci-pull-daemon-")
        .suffix(".tar")
        .tempfile()
        .map_err(Error::Io)
        .map_err(CliError::from)?;
    oci_layout_to_docker_save(layout_dir, save_tar.path(), Some(reference)).map_err(CliError::from)?;
    subprocess::run("docker", ["load", "-i", &save_tar.path().display().to_string()], None, None, LOAD_TIMEOUT)
        .await
        .map_err(CliError::from)?;
    Ok(())
}
