//! Packs an arbitrary list of files into a generic OCI artifact, one
//! blob per file, each annotated with its original path.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use lazyoci_core::model::ArtifactConfig;
use lazyoci_core::oci_layout::{store_blob, write_layout, Descriptor, Manifest, MEDIA_TYPE_UNKNOWN_ARTIFACT};
use lazyoci_core::template::TemplateVars;
use lazyoci_core::{Error, Result};

use crate::handlers::BuildHandler;

pub struct ArtifactHandler;

#[async_trait]
impl BuildHandler for ArtifactHandler {
    async fn build(&self, artifact: &ArtifactConfig, index: usize, _vars: &TemplateVars) -> Result<PathBuf> {
        let name = artifact.display_name(index);
        let files = artifact
            .files
            .as_ref()
            .filter(|f| !f.is_empty())
            .ok_or_else(|| Error::configuration(&name, "artifact requires at least one file"))?;

        let layout_dir = tempfile::Builder::new()
            .prefix("lazyoci-artifact-")
            .tempdir()?
            .into_path();

        // A config blob is required by the image-manifest shape even for a
        // purely generic artifact; an empty JSON object is the minimal
        // placeholder every reader understands.
        let (config_digest, config_size) = store_blob(&layout_dir, b"{}")?;
        let config_descriptor = Descriptor {
            media_type: "application/vnd.oci.empty.v1+json".to_string(),
            digest: config_digest,
            size: config_size,
            annotations: None,
            platform: None,
        };

        let mut layer_descriptors = Vec::with_capacity(files.len());
        for file in files {
            let bytes = std::fs::read(&file.path).map_err(|e| {
                Error::configuration(&name, format!("cannot read '{}': {e}", file.path))
            })?;
            let (digest, size) = store_blob(&layout_dir, &bytes)?;
            let mut annotations = HashMap::new();
            annotations.insert("image.title".to_string(), file.path.clone());
            layer_descriptors.push(Descriptor {
                media_type: file.media_type.clone(),
                digest,
                size,
                annotations: Some(annotations),
                platform: None,
            });
        }

        let artifact_type = artifact
            .media_type
            .clone()
            .unwrap_or_else(|| MEDIA_TYPE_UNKNOWN_ARTIFACT.to_string());

        let manifest = Manifest {
            schema_version: 2,
            media_type: lazyoci_core::oci_layout::MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
            artifact_type: Some(artifact_type),
            config: config_descriptor,
            layers: layer_descriptors,
            annotations: None,
        };

        write_layout(&layout_dir, &manifest, Some("latest"))?;
        Ok(layout_dir)
    }
}
