//! Registry-to-registry content copy: pulls a single-platform manifest
//! and its blobs from one registry and pushes them to another, entirely
//! in memory. Used by the mirror engine, which addresses source and
//! destination through independent credential providers; the build
//! pusher instead pushes a locally-built layout (see [`crate::pusher`]).

use oci_distribution::client::{Config, ImageLayer};
use oci_distribution::manifest::OciImageManifest;

use lazyoci_core::oci_layout::MEDIA_TYPE_IMAGE_MANIFEST;
use lazyoci_core::{Error, Result};

use crate::auth::{resolve_auth, CredentialProvider};
use crate::client::{build_client, parse_reference};
use crate::puller::{pull_blob, pull_manifest};
use crate::pusher::PushedDescriptor;

/// Copy the single-platform manifest at `source` to `dest`.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Reference`] if either reference fails
/// to parse, [`lazyoci_core::Error::Format`] if `source` resolves to a
/// multi-platform index (the mirror engine copies each child manifest
/// individually instead of calling this on the parent), or
/// [`lazyoci_core::Error::Transport`] on any registry failure.
pub async fn copy(
    source: &str,
    dest: &str,
    source_provider: &dyn CredentialProvider,
    dest_provider: &dyn CredentialProvider,
    plain_http: bool,
) -> Result<PushedDescriptor> {
    let dest_reference = parse_reference(dest)?;
    parse_reference(source)?;

    let pulled = pull_manifest(source, source_provider, plain_http).await?;
    let image = pulled.image.ok_or_else(|| {
        Error::format(
            "image reference",
            format!("'{source}' is a multi-platform index; copy its child manifests individually"),
        )
    })?;

    let config_bytes = pull_blob(source, &image.config.digest, source_provider, plain_http).await?;
    let oci_config = Config {
        data: config_bytes,
        media_type: image.config.media_type.clone(),
        annotations: image.config.annotations.clone(),
    };

    let mut layers = Vec::with_capacity(image.layers.len());
    for layer in &image.layers {
        let bytes = pull_blob(source, &layer.digest, source_provider, plain_http).await?;
        layers.push(ImageLayer::new(bytes, layer.media_type.clone(), layer.annotations.clone()));
    }

    let oci_manifest = OciImageManifest::build(&layers, &oci_config, image.annotations.clone());
    let size = serde_json::to_vec(&oci_manifest).map(|b| b.len() as u64).unwrap_or_default();

    let dest_client = build_client(plain_http);
    let dest_auth = resolve_auth(dest_provider, dest_reference.registry()).await?;
    dest_client
        .push(&dest_reference, &layers, oci_config, &dest_auth, Some(oci_manifest))
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    Ok(PushedDescriptor {
        digest: pulled.digest,
        media_type: image.media_type.unwrap_or_else(|| MEDIA_TYPE_IMAGE_MANIFEST.to_string()),
        size,
    })
}
