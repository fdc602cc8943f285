//! Packs a Helm chart directory into an OCI layout carrying the two
//! blobs the Helm-as-OCI convention expects: a JSON config and a gzipped
//! chart tarball.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use lazyoci_core::model::ArtifactConfig;
use lazyoci_core::oci_layout::{
    store_blob, write_layout, Descriptor, Manifest, MEDIA_TYPE_HELM_CHART_CONTENT, MEDIA_TYPE_HELM_CONFIG,
};
use lazyoci_core::template::TemplateVars;
use lazyoci_core::{Error, Result};

use crate::chart_meta::{read_chart_metadata, ChartMetadata};
use crate::handlers::BuildHandler;

pub struct HelmHandler;

#[derive(Debug, Serialize)]
struct HelmConfigBlob {
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "apiVersion")]
    api_version: String,
}

#[async_trait]
impl BuildHandler for HelmHandler {
    async fn build(&self, artifact: &ArtifactConfig, index: usize, _vars: &TemplateVars) -> Result<PathBuf> {
        let name = artifact.display_name(index);
        let chart_path = artifact
            .chart_path
            .as_deref()
            .ok_or_else(|| Error::configuration(&name, "helm artifact requires 'chartPath'"))?;
        let chart_dir = Path::new(chart_path);

        let meta = read_chart_metadata(chart_dir)?;
        let layout_dir = tempfile::Builder::new().prefix("lazyoci-helm-").tempdir()?.into_path();

        let config_descriptor = write_config_blob(&layout_dir, &meta)?;
        let content_descriptor = write_chart_tarball_blob(&layout_dir, chart_dir)?;

        let mut annotations = HashMap::new();
        annotations.insert("image.title".to_string(), meta.name.clone());
        annotations.insert("image.version".to_string(), meta.version.clone());

        let manifest = Manifest {
            schema_version: 2,
            media_type: lazyoci_core::oci_layout::MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
            artifact_type: Some(MEDIA_TYPE_HELM_CONFIG.to_string()),
            config: config_descriptor,
            layers: vec![content_descriptor],
            annotations: Some(annotations),
        };

        write_layout(&layout_dir, &manifest, Some(&meta.version))?;
        Ok(layout_dir)
    }
}

fn write_config_blob(layout_dir: &Path, meta: &ChartMetadata) -> Result<Descriptor> {
    let config = HelmConfigBlob {
        name: meta.name.clone(),
        version: meta.version.clone(),
        description: meta.description.clone(),
        api_version: meta.api_version.clone(),
    };
    let bytes = serde_json::to_vec(&config)?;
    let (digest, size) = store_blob(layout_dir, &bytes)?;
    Ok(Descriptor {
        media_type: MEDIA_TYPE_HELM_CONFIG.to_string(),
        digest,
        size,
        annotations: None,
        platform: None,
    })
}

fn write_chart_tarball_blob(layout_dir: &Path, chart_dir: &Path) -> Result<Descriptor> {
    let tar_bytes = tar_chart_dir(chart_dir)?;
    let gz_bytes = gzip_bytes(&tar_bytes)?;
    let (digest, size) = store_blob(layout_dir, &gz_bytes)?;
    Ok(Descriptor {
        media_type: MEDIA_TYPE_HELM_CHART_CONTENT.to_string(),
        digest,
        size,
        annotations: None,
        platform: None,
    })
}

/// Tar the chart directory, dropping any entry with a dotfile or dotdir
/// anywhere in its relative path (`.git`, `.helmignore`, editor swap
/// files, and the like never belong in a packaged chart).
fn tar_chart_dir(chart_dir: &Path) -> Result<Vec<u8>> {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);
        for entry in walkdir::WalkDir::new(chart_dir).into_iter().filter_map(std::result::Result::ok) {
            let relative = entry.path().strip_prefix(chart_dir).unwrap_or(entry.path());
            if relative.as_os_str().is_empty() {
                continue;
            }
            if relative.components().any(|c| {
                c.as_os_str()
                    .to_str()
                    .is_some_and(|s| s.starts_with('.'))
            }) {
                continue;
            }
            if entry.file_type().is_dir() {
                builder.append_dir(relative, entry.path())?;
            } else if entry.file_type().is_file() {
                let mut file = std::fs::File::open(entry.path())?;
                builder.append_file(relative, &mut file)?;
            }
        }
        builder.finish()?;
    }
    Ok(tar_bytes)
}

fn gzip_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_sample_chart(dir: &Path) {
        std::fs::write(
            dir.join("Chart.yaml"),
            "apiVersion: v2\nname: demo\nversion: 1.2.3\ndescription: a demo chart\n",
        )
        .unwrap();
        let templates = dir.join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join("deployment.yaml"), b"kind: Deployment\n").unwrap();
        std::fs::create_dir_all(dir.join(".git")).unwrap();
        std::fs::write(dir.join(".git").join("HEAD"), b"ref: refs/heads/main\n").unwrap();
    }

    #[tokio::test]
    async fn packs_a_chart_and_tags_with_its_version() {
        let chart_dir = tempdir().unwrap();
        write_sample_chart(chart_dir.path());

        let artifact = ArtifactConfig {
            kind: lazyoci_core::model::ArtifactKind::Helm,
            name: Some("demo".to_string()),
            targets: vec![],
            dockerfile: None,
            context: None,
            platforms: None,
            build_args: HashMap::new(),
            chart_path: Some(chart_dir.path().to_string_lossy().into_owned()),
            files: None,
            media_type: None,
            image: None,
        };

        let handler = HelmHandler;
        let layout_dir = handler.build(&artifact, 0, &TemplateVars::default()).await.unwrap();
        lazyoci_core::oci_layout::verify(&layout_dir).unwrap();

        let index = lazyoci_core::oci_layout::read_index(&layout_dir).unwrap();
        let descriptor = &index.manifests[0];
        assert_eq!(
            descriptor.annotations.as_ref().unwrap().get("org.opencontainers.image.ref.name"),
            Some(&"1.2.3".to_string())
        );
    }

    #[test]
    fn tarball_excludes_dotfiles() {
        let chart_dir = tempdir().unwrap();
        write_sample_chart(chart_dir.path());

        let tar_bytes = tar_chart_dir(chart_dir.path()).unwrap();
        let mut archive = tar::Archive::new(tar_bytes.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.contains("Chart.yaml")));
        assert!(!names.iter().any(|n| n.contains(".git")));
    }
}
