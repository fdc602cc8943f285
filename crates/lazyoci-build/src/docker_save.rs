//! Bidirectional translation between a Docker-daemon `save` tarball and an
//! on-disk OCI layout.
//!
//! `docker save` emits a flat tarball: `manifest.json` (one entry per
//! image, naming a config path, repo tags, and an ordered list of
//! *uncompressed* layer tar paths), the config JSON itself, and one
//! uncompressed layer tar per entry. An OCI layout wants every layer
//! gzip-compressed and digested after compression, so the forward
//! direction recompresses; the inverse decompresses back to what `docker
//! load` expects.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use lazyoci_core::oci_layout::{
    store_blob, write_layout, Descriptor, Manifest, MEDIA_TYPE_IMAGE_MANIFEST, MEDIA_TYPE_LAYER_GZIP,
};
use lazyoci_core::{Error, Result};

const DOCKER_CONFIG_MEDIA_TYPE: &str = "application/vnd.docker.container.image.v1+json";

#[derive(Debug, Deserialize)]
struct SaveManifestEntry {
    #[serde(rename = "Config")]
    config: String,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Vec<String>,
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SaveManifestEntryOut {
    #[serde(rename = "Config")]
    config: String,
    #[serde(rename = "RepoTags")]
    repo_tags: Vec<String>,
    #[serde(rename = "Layers")]
    layers: Vec<String>,
}

/// Convert a `docker save` tarball at `save_tar_path` into a fresh OCI
/// layout at `layout_dir`, tagging the resulting manifest with `tag` if
/// given.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Format`] if the tarball has no manifest
/// entries, or [`lazyoci_core::Error::Io`] on extraction failure.
pub fn docker_save_to_oci_layout(save_tar_path: &Path, layout_dir: &Path, tag: Option<&str>) -> Result<Descriptor> {
    let scratch = tempfile::tempdir()?;
    extract_tar(save_tar_path, scratch.path())?;

    let manifest_json = std::fs::read(scratch.path().join("manifest.json"))?;
    let entries: Vec<SaveManifestEntry> = serde_json::from_slice(&manifest_json)?;
    let entry = entries
        .first()
        .ok_or_else(|| Error::format("docker-save tarball", "manifest.json has zero entries"))?;

    let config_bytes = std::fs::read(scratch.path().join(&entry.config))?;
    let (config_digest, config_size) = store_blob(layout_dir, &config_bytes)?;
    let config_descriptor = Descriptor {
        media_type: DOCKER_CONFIG_MEDIA_TYPE.to_string(),
        digest: config_digest,
        size: config_size,
        annotations: None,
        platform: None,
    };

    let mut layer_descriptors = Vec::with_capacity(entry.layers.len());
    for layer_path in &entry.layers {
        let uncompressed = std::fs::read(scratch.path().join(layer_path))?;
        let compressed = gzip_bytes(&uncompressed)?;
        let (digest, size) = store_blob(layout_dir, &compressed)?;
        layer_descriptors.push(Descriptor {
            media_type: MEDIA_TYPE_LAYER_GZIP.to_string(),
            digest,
            size,
            annotations: None,
            platform: None,
        });
    }

    let manifest = Manifest {
        schema_version: 2,
        media_type: MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
        artifact_type: None,
        config: config_descriptor,
        layers: layer_descriptors,
        annotations: None,
    };

    write_layout(layout_dir, &manifest, tag)
}

/// Convert an OCI layout at `layout_dir` back into a `docker load`-able
/// tarball at `save_tar_path`, the inverse of
/// [`docker_save_to_oci_layout`].
///
/// # Errors
/// Returns [`lazyoci_core::Error::Format`] if the layout's root manifest
/// cannot be read, or [`lazyoci_core::Error::Io`] on archive failure.
pub fn oci_layout_to_docker_save(layout_dir: &Path, save_tar_path: &Path, repo_tag: Option<&str>) -> Result<()> {
    let index = lazyoci_core::oci_layout::read_index(layout_dir)?;
    let manifest_descriptor = index
        .manifests
        .first()
        .ok_or_else(|| Error::format("OCI layout", "index has zero manifests"))?;
    let manifest_bytes = lazyoci_core::oci_layout::read_blob(layout_dir, &manifest_descriptor.digest)?;
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)?;

    let scratch = tempfile::tempdir()?;
    let config_bytes = lazyoci_core::oci_layout::read_blob(layout_dir, &manifest.config.digest)?;
    std::fs::write(scratch.path().join("config.json"), &config_bytes)?;

    let mut layer_paths = Vec::with_capacity(manifest.layers.len());
    for (i, layer) in manifest.layers.iter().enumerate() {
        let compressed = lazyoci_core::oci_layout::read_blob(layout_dir, &layer.digest)?;
        let uncompressed = gunzip_bytes(&compressed)?;
        let layer_name = format!("layer-{i}.tar");
        std::fs::write(scratch.path().join(&layer_name), &uncompressed)?;
        layer_paths.push(layer_name);
    }

    let save_manifest = vec![SaveManifestEntryOut {
        config: "config.json".to_string(),
        repo_tags: repo_tag.map(|t| vec![t.to_string()]).unwrap_or_default(),
        layers: layer_paths,
    }];
    std::fs::write(scratch.path().join("manifest.json"), serde_json::to_vec(&save_manifest)?)?;

    write_tar(scratch.path(), save_tar_path)
}

fn gzip_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

fn gunzip_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn extract_tar(tar_path: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(tar_path)?;
    let mut archive = tar::Archive::new(file);
    archive.unpack(dest)?;
    Ok(())
}

fn write_tar(source_dir: &Path, tar_path: &Path) -> Result<()> {
    let file = std::fs::File::create(tar_path)?;
    let mut builder = tar::Builder::new(file);
    builder.append_dir_all(".", source_dir)?;
    builder.finish()?;
    Ok(())
}
