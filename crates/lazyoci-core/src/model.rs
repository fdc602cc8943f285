//! Declarative configuration shapes and result/report types shared across
//! the build and mirror engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// The kind of artifact a build-file entry describes.
///
/// Serializes to/from the YAML `type` field's vocabulary (`image`, `helm`,
/// `artifact`, `docker`); [`ArtifactKind::label`] gives the data model's
/// own naming (`image`, `helm-chart`, `generic`, `daemon-image`) used in
/// diagnostics and filter matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A container image built from a Dockerfile.
    Image,
    /// A Helm chart.
    Helm,
    /// A generic multi-file artifact.
    Artifact,
    /// A re-packaged image already present in the local Docker daemon.
    Docker,
}

impl ArtifactKind {
    /// The data-model name for this kind (`image`, `helm-chart`, `generic`,
    /// `daemon-image`), used in error messages and orchestrator filters.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Helm => "helm-chart",
            Self::Artifact => "generic",
            Self::Docker => "daemon-image",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single push target: a registry path plus one or more tag templates.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PushTarget {
    /// Registry path template, e.g. `{{ .Registry }}/charts/mychart`.
    pub registry: String,
    /// Tag templates, e.g. `["{{ .ChartVersion }}", "latest"]`.
    pub tags: Vec<String>,
}

/// A `{path, mediaType}` entry for a generic artifact.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactFile {
    /// Path to the file on disk, relative to the build file unless absolute.
    pub path: String,
    /// The media type to annotate the blob with.
    #[serde(rename = "mediaType")]
    pub media_type: String,
}

/// One entry of the declarative build file's `artifacts` sequence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactConfig {
    /// Artifact kind (`type` in YAML).
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Logical name; falls back to `artifact[i]` when absent.
    pub name: Option<String>,
    /// Push targets; must be non-empty.
    pub targets: Vec<PushTarget>,

    /// `image`: path to the Dockerfile, default `Dockerfile`.
    pub dockerfile: Option<String>,
    /// `image`: build context directory.
    pub context: Option<String>,
    /// `image`: target platforms, e.g. `["linux/amd64", "linux/arm64"]`.
    pub platforms: Option<Vec<String>>,
    /// `image`: build-time arguments.
    #[serde(rename = "buildArgs", default)]
    pub build_args: HashMap<String, String>,

    /// `helm`: path to the chart directory (containing `Chart.yaml`).
    #[serde(rename = "chartPath")]
    pub chart_path: Option<String>,

    /// `artifact`: the files to pack.
    pub files: Option<Vec<ArtifactFile>>,
    /// `artifact`: the manifest's `artifactType` annotation.
    #[serde(rename = "mediaType")]
    pub media_type: Option<String>,

    /// `docker`: the local daemon image reference to re-package.
    pub image: Option<String>,
}

impl ArtifactConfig {
    /// The display name used in diagnostics: the configured name, or
    /// `artifact[i]` using the entry's position in the build file.
    #[must_use]
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("artifact[{index}]"))
    }

    /// Validate the handful of invariants serde cannot express: at least
    /// one target, every target has at least one tag, and the kind-specific
    /// required fields are present.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] identifying this artifact by
    /// `display_name`.
    pub fn validate(&self, index: usize) -> Result<()> {
        let name = self.display_name(index);
        if self.targets.is_empty() {
            return Err(Error::configuration(&name, "must have at least one target"));
        }
        for target in &self.targets {
            if target.tags.is_empty() {
                return Err(Error::configuration(
                    &name,
                    format!("target '{}' must have at least one tag", target.registry),
                ));
            }
        }
        match self.kind {
            ArtifactKind::Image if self.context.is_none() => {
                return Err(Error::configuration(&name, "image artifact requires 'context'"));
            }
            ArtifactKind::Helm if self.chart_path.is_none() => {
                return Err(Error::configuration(&name, "helm artifact requires 'chartPath'"));
            }
            ArtifactKind::Artifact if self.files.as_ref().is_none_or(Vec::is_empty) => {
                return Err(Error::configuration(
                    &name,
                    "artifact requires at least one file",
                ));
            }
            ArtifactKind::Docker if self.image.is_none() => {
                return Err(Error::configuration(&name, "docker artifact requires 'image'"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// Top-level shape of the declarative build file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFile {
    /// Schema version; currently only `1` is accepted.
    pub version: u32,
    /// The artifacts to build, in declaration order. Must be non-empty.
    pub artifacts: Vec<ArtifactConfig>,
}

impl BuildFile {
    /// Validate the top-level shape and every artifact entry.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] on an unsupported `version`, an
    /// empty `artifacts` list, or the first artifact that fails its own
    /// [`ArtifactConfig::validate`].
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::configuration(
                "build file",
                format!("unsupported version {}", self.version),
            ));
        }
        if self.artifacts.is_empty() {
            return Err(Error::configuration("build file", "'artifacts' must be non-empty"));
        }
        for (i, artifact) in self.artifacts.iter().enumerate() {
            artifact.validate(i)?;
        }
        Ok(())
    }
}

/// The source kind of a mirror upstream descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A classic Helm chart repository (index.yaml over HTTP(S)).
    Repo,
    /// An OCI registry serving the chart as an OCI artifact.
    Oci,
    /// A chart directory already present on the local filesystem.
    Local,
}

/// One entry of the mirror configuration's `upstreams` map.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Source kind (`type` in YAML).
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// `repo`: the chart repository's base URL.
    pub repo: Option<String>,
    /// `oci`: the OCI registry base, with an `oci://` scheme.
    pub registry: Option<String>,
    /// `local`: path to a chart directory on disk.
    pub path: Option<String>,
    /// The chart name as known to the upstream.
    pub chart: String,
    /// Versions to mirror. Must be non-empty.
    pub versions: Vec<String>,
}

impl UpstreamConfig {
    /// Validate that exactly one of `{repo, registry, path}` is set and
    /// matches the declared `kind`, and that `versions` is non-empty.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] identifying the upstream by
    /// `chart_key`.
    pub fn validate(&self, chart_key: &str) -> Result<()> {
        let set_count = [self.repo.is_some(), self.registry.is_some(), self.path.is_some()]
            .into_iter()
            .filter(|b| *b)
            .count();
        if set_count != 1 {
            return Err(Error::configuration(
                chart_key,
                "exactly one of repo, registry, or path must be set",
            ));
        }
        let matches_kind = match self.kind {
            SourceKind::Repo => self.repo.is_some(),
            SourceKind::Oci => self.registry.is_some(),
            SourceKind::Local => self.path.is_some(),
        };
        if !matches_kind {
            return Err(Error::configuration(
                chart_key,
                format!("source field does not match declared type '{:?}'", self.kind),
            ));
        }
        if self.versions.is_empty() {
            return Err(Error::configuration(chart_key, "'versions' must be non-empty"));
        }
        Ok(())
    }
}

/// The mirror's target-registry specification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorTarget {
    /// Base URL of the target registry.
    pub url: String,
    /// Use plain HTTP and skip TLS verification.
    #[serde(default)]
    pub insecure: bool,
    /// Optional path prefix under which charts are pushed.
    #[serde(rename = "charts-prefix", default)]
    pub charts_prefix: Option<String>,
}

/// Top-level shape of the mirror configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// The target registry.
    pub target: MirrorTarget,
    /// Chart-key to upstream-descriptor map. Must be non-empty.
    pub upstreams: HashMap<String, UpstreamConfig>,
}

impl MirrorConfig {
    /// Validate the top-level shape and every upstream entry.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `upstreams` is empty or the
    /// first upstream that fails its own [`UpstreamConfig::validate`].
    pub fn validate(&self) -> Result<()> {
        if self.upstreams.is_empty() {
            return Err(Error::configuration("mirror config", "'upstreams' must be non-empty"));
        }
        for (key, upstream) in &self.upstreams {
            upstream.validate(key)?;
        }
        Ok(())
    }
}

/// A resolved push-target credential pair produced by the credential chain.
///
/// Consumed exactly once per registry operation; never persisted by this
/// crate outside of whatever storage backend the caller configures.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Basic-auth username.
    pub username: Option<String>,
    /// Basic-auth password or personal access token.
    pub password: Option<String>,
    /// OAuth2 refresh token, when the backend is token-based.
    pub refresh_token: Option<String>,
    /// OAuth2 access token, when the backend is token-based.
    pub access_token: Option<String>,
}

impl CredentialRecord {
    /// True when every field is empty — the helper-protocol definition of
    /// "no credential", distinct from a backend returning an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.as_deref().unwrap_or_default().is_empty()
            && self.password.as_deref().unwrap_or_default().is_empty()
            && self.refresh_token.as_deref().unwrap_or_default().is_empty()
            && self.access_token.as_deref().unwrap_or_default().is_empty()
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Disposition of a single (registry, tag) push attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetStatus {
    /// The artifact was pushed.
    Pushed,
    /// Dry-run: the push would have happened.
    WouldPush,
    /// Push was disabled for this invocation.
    NotPushed,
    /// The push attempt failed; see the accompanying error message.
    Failed,
}

/// The outcome of pushing one rendered (registry, tag) pair.
#[derive(Debug, Clone, Serialize)]
pub struct TargetResult {
    /// The rendered registry path.
    pub registry: String,
    /// The rendered tag.
    pub tag: String,
    /// What happened.
    pub status: TargetStatus,
    /// The pushed digest, when known.
    pub digest: Option<String>,
    /// Failure reason, when `status == Failed`.
    pub error: Option<String>,
}

/// The outcome of building (and optionally pushing) one artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactResult {
    /// Display name (configured name, or `artifact[i]`).
    pub name: String,
    /// The artifact's kind.
    pub kind: ArtifactKind,
    /// False if the handler or template rendering failed before any push
    /// was attempted.
    pub succeeded: bool,
    /// Per-target outcomes; empty when the artifact failed before
    /// rendering completed.
    pub targets: Vec<TargetResult>,
    /// Top-level failure reason, when `succeeded == false`.
    pub error: Option<String>,
}

/// The aggregate result of one build invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// One entry per artifact, in declaration order.
    pub artifacts: Vec<ArtifactResult>,
}

impl BuildReport {
    /// True if any artifact failed. The invocation itself still returns
    /// `Ok` in that case; this is purely informational for the caller.
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.artifacts.iter().any(|a| !a.succeeded)
    }
}

/// Disposition of a single image-copy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageStatus {
    /// Copied to the target.
    Copied,
    /// Already present at the target; copy skipped.
    Skipped,
    /// Copy failed; see the accompanying error message.
    Failed,
    /// Dry-run: the copy would have happened.
    DryRun,
}

/// The outcome of copying one extracted image reference.
#[derive(Debug, Clone, Serialize)]
pub struct ImageResult {
    /// The normalized source reference.
    pub reference: String,
    /// The remapped destination reference.
    pub remapped: String,
    /// What happened.
    pub status: ImageStatus,
    /// Failure reason, when `status == Failed`.
    pub error: Option<String>,
}

/// Disposition of the chart push for one (chart, version) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartStatus {
    /// Pushed to the target.
    Pushed,
    /// Already present at the target; push skipped.
    Skipped,
    /// Push failed; see the accompanying error message.
    Failed,
    /// Dry-run: the push would have happened.
    DryRun,
}

/// The outcome of mirroring one chart version.
#[derive(Debug, Clone, Serialize)]
pub struct VersionResult {
    /// The version string, as configured.
    pub version: String,
    /// Disposition of the chart push itself.
    pub chart_status: ChartStatus,
    /// Number of images copied.
    pub images_copied: usize,
    /// Number of images skipped (already present).
    pub images_skipped: usize,
    /// Number of images that failed to copy.
    pub images_failed: usize,
    /// Per-image results, in the order images were extracted.
    pub images: Vec<ImageResult>,
    /// Chart-level failure reason, when `chart_status == Failed`.
    pub error: Option<String>,
}

/// The outcome of mirroring one chart across all requested versions.
#[derive(Debug, Clone, Serialize)]
pub struct ChartResult {
    /// The chart's key in the mirror configuration.
    pub chart_key: String,
    /// One entry per version.
    pub versions: Vec<VersionResult>,
}

/// The aggregate result of one mirror invocation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorSummary {
    /// One entry per chart that was (or would have been) mirrored.
    pub charts: Vec<ChartResult>,
    /// Whether this summary was produced by a dry run.
    pub dry_run: bool,
}

impl MirrorSummary {
    /// Grand total of images copied across every chart and version.
    #[must_use]
    pub fn total_copied(&self) -> usize {
        self.charts
            .iter()
            .flat_map(|c| &c.versions)
            .map(|v| v.images_copied)
            .sum()
    }

    /// Grand total of images skipped across every chart and version.
    #[must_use]
    pub fn total_skipped(&self) -> usize {
        self.charts
            .iter()
            .flat_map(|c| &c.versions)
            .map(|v| v.images_skipped)
            .sum()
    }

    /// Grand total of images that failed to copy across every chart and
    /// version.
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.charts
            .iter()
            .flat_map(|c| &c.versions)
            .map(|v| v.images_failed)
            .sum()
    }
}
