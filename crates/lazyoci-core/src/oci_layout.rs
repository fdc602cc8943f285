//! On-disk OCI image-layout primitives: the marker file, the top-level
//! index, and the content-addressed blob tree under `blobs/sha256/`.
//!
//! Every artifact kind the build engine produces converges on this single
//! on-disk shape before it is pushed; this module is the one place that
//! reads or writes it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// The media type of the marker/index file's schema version.
pub const LAYOUT_VERSION: &str = "1.0.0";

/// Media type of the top-level `index.json` document.
pub const MEDIA_TYPE_INDEX: &str = "application/vnd.oci.image.index.v1+json";
/// Media type of a single-platform image manifest.
pub const MEDIA_TYPE_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// Media type of an OCI image-layer tarball, gzip-compressed.
pub const MEDIA_TYPE_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
/// Fallback `artifactType` for generic artifacts with no user-supplied type.
pub const MEDIA_TYPE_UNKNOWN_ARTIFACT: &str = "application/vnd.unknown.artifact.v1";
/// Media type of a Helm chart's config blob.
pub const MEDIA_TYPE_HELM_CONFIG: &str = "application/vnd.cncf.helm.config.v1+json";
/// Media type of a Helm chart's gzipped tarball content blob.
pub const MEDIA_TYPE_HELM_CHART_CONTENT: &str = "application/vnd.cncf.helm.chart.content.v1.tar+gzip";

/// A content-addressed descriptor, as it appears inside a manifest or index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    /// The blob's media type.
    #[serde(rename = "mediaType")]
    pub media_type: String,
    /// `sha256:<64 hex chars>`.
    pub digest: String,
    /// Size in bytes.
    pub size: u64,
    /// Free-form annotations, e.g. `org.opencontainers.image.title`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
    /// Platform descriptor, present on index children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

/// A platform descriptor attached to an index child manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    /// GOOS-style architecture, e.g. `amd64`.
    pub architecture: String,
    /// GOOS-style operating system, e.g. `linux`.
    pub os: String,
    /// CPU variant, e.g. `v7` for 32-bit ARM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

/// The top-level `index.json` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Always `2` for the current OCI image-layout spec generation.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// The index document's own media type.
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// One or more manifest descriptors. Never empty for a valid layout.
    pub manifests: Vec<Descriptor>,
}

/// An OCI image manifest: one config blob plus an ordered list of layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Always `2`.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// The manifest's own media type.
    #[serde(rename = "mediaType")]
    pub media_type: String,
    /// Set for artifacts that are not container images (helm charts,
    /// generic artifacts).
    #[serde(rename = "artifactType", default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    /// The config blob descriptor.
    pub config: Descriptor,
    /// The layer blob descriptors, in order.
    pub layers: Vec<Descriptor>,
    /// Manifest-level annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn blobs_dir(layout_dir: &Path) -> std::path::PathBuf {
    layout_dir.join("blobs").join("sha256")
}

/// Write `bytes` into the layout's content-addressed blob tree, creating
/// `blobs/sha256/` if needed, and return its `(digest, size)`.
///
/// # Errors
/// Returns [`Error::Io`] on filesystem failure.
pub fn store_blob(layout_dir: &Path, bytes: &[u8]) -> Result<(String, u64)> {
    let dir = blobs_dir(layout_dir);
    fs::create_dir_all(&dir)?;
    let hex_digest = sha256_hex(bytes);
    let path = dir.join(&hex_digest);
    fs::write(&path, bytes)?;
    Ok((format!("sha256:{hex_digest}"), bytes.len() as u64))
}

/// Read a blob by digest (`sha256:<hex>`) from the layout.
///
/// # Errors
/// Returns [`Error::Format`] if `digest` is not a `sha256:` digest, or
/// [`Error::Io`] if the blob is missing.
pub fn read_blob(layout_dir: &Path, digest: &str) -> Result<Vec<u8>> {
    let hex_digest = digest
        .strip_prefix("sha256:")
        .ok_or_else(|| Error::format("OCI layout", format!("unsupported digest scheme '{digest}'")))?;
    let path = blobs_dir(layout_dir).join(hex_digest);
    Ok(fs::read(path)?)
}

/// Write the marker file, the manifest blob, and an `index.json` that
/// references only that manifest.
///
/// This is the final step every build handler takes once it has a
/// complete [`Manifest`] assembled: the manifest is serialized, stored as
/// a blob, and becomes the sole entry of the layout's index.
///
/// # Errors
/// Returns [`Error::Json`] if serialization fails, or [`Error::Io`] on
/// filesystem failure.
pub fn write_layout(
    layout_dir: &Path,
    manifest: &Manifest,
    tag: Option<&str>,
) -> Result<Descriptor> {
    fs::create_dir_all(layout_dir)?;
    let manifest_bytes = serde_json::to_vec(manifest)?;
    let (digest, size) = store_blob(layout_dir, &manifest_bytes)?;

    let annotations = tag.map(|t| {
        let mut m = HashMap::new();
        m.insert("org.opencontainers.image.ref.name".to_string(), t.to_string());
        m
    });

    let descriptor = Descriptor {
        media_type: manifest.media_type.clone(),
        digest,
        size,
        annotations,
        platform: None,
    };

    fs::write(layout_dir.join("oci-layout"), format!("{{\"imageLayoutVersion\":\"{LAYOUT_VERSION}\"}}"))?;

    let index = Index {
        schema_version: 2,
        media_type: Some(MEDIA_TYPE_INDEX.to_string()),
        manifests: vec![descriptor.clone()],
    };
    fs::write(layout_dir.join("index.json"), serde_json::to_vec(&index)?)?;

    Ok(descriptor)
}

/// Read and validate `index.json` plus the marker file.
///
/// # Errors
/// Returns [`Error::Format`] if the marker file is missing or asserts a
/// version other than [`LAYOUT_VERSION`], if `index.json` does not parse,
/// or if the index has zero manifests.
pub fn read_index(layout_dir: &Path) -> Result<Index> {
    let marker_path = layout_dir.join("oci-layout");
    let marker_bytes = fs::read(&marker_path)
        .map_err(|e| Error::format("OCI layout", format!("missing marker file: {e}")))?;
    let marker: serde_json::Value = serde_json::from_slice(&marker_bytes)?;
    let version = marker
        .get("imageLayoutVersion")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    if version != LAYOUT_VERSION {
        return Err(Error::format(
            "OCI layout",
            format!("unsupported layout version '{version}'"),
        ));
    }

    let index_bytes = fs::read(layout_dir.join("index.json"))?;
    let index: Index = serde_json::from_slice(&index_bytes)?;
    if index.manifests.is_empty() {
        return Err(Error::format("OCI layout", "index has zero manifests"));
    }
    Ok(index)
}

/// Verify the universal layout invariants: the marker asserts the right
/// version, the index has at least one manifest, and every descriptor in
/// that manifest is backed by a blob whose filename equals its digest.
///
/// # Errors
/// Returns [`Error::Format`] on the first violated invariant.
pub fn verify(layout_dir: &Path) -> Result<()> {
    let index = read_index(layout_dir)?;
    for manifest_descriptor in &index.manifests {
        let manifest_bytes = read_blob(layout_dir, &manifest_descriptor.digest)?;
        verify_descriptor_matches_bytes(&manifest_descriptor.digest, &manifest_bytes)?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)?;
        verify_blob_present(layout_dir, &manifest.config)?;
        for layer in &manifest.layers {
            verify_blob_present(layout_dir, layer)?;
        }
    }
    Ok(())
}

fn verify_descriptor_matches_bytes(digest: &str, bytes: &[u8]) -> Result<()> {
    let expected = digest.strip_prefix("sha256:").unwrap_or(digest);
    let actual = sha256_hex(bytes);
    if expected != actual {
        return Err(Error::format(
            "OCI layout",
            format!("blob digest mismatch: expected {expected}, got {actual}"),
        ));
    }
    Ok(())
}

fn verify_blob_present(layout_dir: &Path, descriptor: &Descriptor) -> Result<()> {
    let bytes = read_blob(layout_dir, &descriptor.digest)?;
    verify_descriptor_matches_bytes(&descriptor.digest, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_manifest(config_digest: String, config_size: u64) -> Manifest {
        Manifest {
            schema_version: 2,
            media_type: MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
            artifact_type: None,
            config: Descriptor {
                media_type: "application/vnd.oci.image.config.v1+json".to_string(),
                digest: config_digest,
                size: config_size,
                annotations: None,
                platform: None,
            },
            layers: vec![],
            annotations: None,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let (config_digest, config_size) = store_blob(dir.path(), b"{}").unwrap();
        let manifest = sample_manifest(config_digest, config_size);
        write_layout(dir.path(), &manifest, Some("latest")).unwrap();

        let index = read_index(dir.path()).unwrap();
        assert_eq!(index.manifests.len(), 1);
        assert_eq!(index.manifests[0].media_type, MEDIA_TYPE_IMAGE_MANIFEST);
    }

    #[test]
    fn verify_passes_for_well_formed_layout() {
        let dir = tempdir().unwrap();
        let (config_digest, config_size) = store_blob(dir.path(), b"{\"k\":1}").unwrap();
        let manifest = sample_manifest(config_digest, config_size);
        write_layout(dir.path(), &manifest, None).unwrap();
        verify(dir.path()).unwrap();
    }

    #[test]
    fn read_index_rejects_missing_marker() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.json"), b"{}").unwrap();
        assert!(read_index(dir.path()).is_err());
    }

    #[test]
    fn read_index_rejects_empty_manifests() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("oci-layout"),
            format!("{{\"imageLayoutVersion\":\"{LAYOUT_VERSION}\"}}"),
        )
        .unwrap();
        fs::write(
            dir.path().join("index.json"),
            serde_json::to_vec(&Index {
                schema_version: 2,
                media_type: None,
                manifests: vec![],
            })
            .unwrap(),
        )
        .unwrap();
        assert!(read_index(dir.path()).is_err());
    }

    #[test]
    fn store_blob_filename_equals_digest() {
        let dir = tempdir().unwrap();
        let (digest, _) = store_blob(dir.path(), b"hello").unwrap();
        let hex_digest = digest.strip_prefix("sha256:").unwrap();
        assert!(blobs_dir(dir.path()).join(hex_digest).exists());
    }
}
