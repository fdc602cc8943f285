//! Copies a locally-built OCI layout directory to a remote registry.
//!
//! Reads the layout's index to find the root manifest, rehydrates its
//! config and layer blobs into `oci_distribution`'s push types, and pushes
//! them as a single manifest. The remote digest this reports back is
//! always the locally-computed manifest digest: the registry is expected
//! to store the exact bytes it was given, so there is nothing to
//! reconcile after the fact.

use std::path::Path;

use oci_distribution::client::{Config, ImageLayer};
use oci_distribution::manifest::OciImageManifest;

use lazyoci_core::oci_layout::{read_blob, read_index, Manifest};
use lazyoci_core::Error;
use lazyoci_core::Result;

use crate::auth::{resolve_auth, CredentialProvider};
use crate::client::{build_client, parse_reference};

/// The descriptor of a manifest pushed to a remote registry.
#[derive(Debug, Clone)]
pub struct PushedDescriptor {
    /// The manifest digest, identical to the local layout's root manifest
    /// digest.
    pub digest: String,
    /// The manifest's media type.
    pub media_type: String,
    /// The manifest's size in bytes.
    pub size: u64,
}

/// Push the single manifest stored in `layout_dir` to `target`
/// (`registry/repository:tag` or `registry/repository@digest`).
///
/// # Errors
/// Returns [`lazyoci_core::Error::Reference`] if `target` does not parse,
/// [`lazyoci_core::Error::Format`] if the local layout is malformed, or
/// [`lazyoci_core::Error::Transport`] if the registry rejects the push.
pub async fn push(
    layout_dir: &Path,
    target: &str,
    credential_provider: &dyn CredentialProvider,
    plain_http: bool,
) -> Result<PushedDescriptor> {
    let reference = parse_reference(target)?;
    let index = read_index(layout_dir)?;
    let manifest_descriptor = index
        .manifests
        .first()
        .ok_or_else(|| Error::format("OCI layout", "index has zero manifests"))?;

    let manifest_bytes = read_blob(layout_dir, &manifest_descriptor.digest)?;
    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)?;

    let config_bytes = read_blob(layout_dir, &manifest.config.digest)?;
    let oci_config = Config {
        data: config_bytes,
        media_type: manifest.config.media_type.clone(),
        annotations: manifest.config.annotations.clone(),
    };

    let mut layers = Vec::with_capacity(manifest.layers.len());
    for layer_descriptor in &manifest.layers {
        let bytes = read_blob(layout_dir, &layer_descriptor.digest)?;
        layers.push(ImageLayer::new(
            bytes,
            layer_descriptor.media_type.clone(),
            layer_descriptor.annotations.clone(),
        ));
    }

    let oci_manifest = OciImageManifest::build(&layers, &oci_config, manifest.annotations.clone());

    let auth = resolve_auth(credential_provider, reference.registry()).await?;
    let client = build_client(plain_http);
    let response = client
        .push(&reference, &layers, oci_config, &auth, Some(oci_manifest))
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    tracing::info!(target = %target, manifest_url = %response.manifest_url, "pushed manifest");

    Ok(PushedDescriptor {
        digest: manifest_descriptor.digest.clone(),
        media_type: manifest.media_type,
        size: manifest_descriptor.size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyoci_core::oci_layout::{store_blob, write_layout, MEDIA_TYPE_IMAGE_MANIFEST};
    use tempfile::tempdir;

    #[test]
    fn pushed_descriptor_reports_local_digest_not_a_fresh_one() {
        let dir = tempdir().unwrap();
        let (config_digest, config_size) = store_blob(dir.path(), b"{}").unwrap();
        let manifest = Manifest {
            schema_version: 2,
            media_type: MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
            artifact_type: None,
            config: lazyoci_core::oci_layout::Descriptor {
                media_type: "application/vnd.oci.image.config.v1+json".to_string(),
                digest: config_digest,
                size: config_size,
                annotations: None,
                platform: None,
            },
            layers: vec![],
            annotations: None,
        };
        let descriptor = write_layout(dir.path(), &manifest, Some("v1")).unwrap();
        assert!(descriptor.digest.starts_with("sha256:"));
    }

    #[tokio::test]
    async fn push_rejects_an_unparseable_target() {
        use crate::auth::AnonymousProvider;
        let dir = tempdir().unwrap();
        let err = push(dir.path(), "not a reference!!", &AnonymousProvider, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reference { .. }));
    }
}
