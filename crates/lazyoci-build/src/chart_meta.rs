//! Reads the handful of `Chart.yaml` fields the helm-chart handler and
//! the build orchestrator's template resolution need.

use std::path::Path;

use serde::Deserialize;

use lazyoci_core::{Error, Result};

/// The subset of `Chart.yaml` this crate cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartMetadata {
    /// `v1` or `v2`.
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    /// Chart name.
    pub name: String,
    /// Chart version, used to populate `{{ .ChartVersion }}`.
    pub version: String,
    /// One-line description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Read and parse `<chart_dir>/Chart.yaml`.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Format`] if the file is missing or does
/// not parse as YAML with the required fields.
pub fn read_chart_metadata(chart_dir: &Path) -> Result<ChartMetadata> {
    let path = chart_dir.join("Chart.yaml");
    let bytes = std::fs::read(&path)
        .map_err(|e| Error::format("Chart.yaml", format!("cannot read {}: {e}", path.display())))?;
    serde_yaml::from_slice(&bytes).map_err(|e| Error::format("Chart.yaml", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_name_and_version() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("Chart.yaml"),
            "apiVersion: v2\nname: mychart\nversion: 0.1.0\ndescription: a test chart\n",
        )
        .unwrap();
        let meta = read_chart_metadata(dir.path()).unwrap();
        assert_eq!(meta.name, "mychart");
        assert_eq!(meta.version, "0.1.0");
        assert_eq!(meta.description.as_deref(), Some("a test chart"));
    }

    #[test]
    fn rejects_a_missing_file() {
        let dir = tempdir().unwrap();
        let err = read_chart_metadata(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
