//! Build handlers: one per artifact kind, all sharing the same contract —
//! given the artifact descriptor (already validated) plus rendered
//! template variables, produce a fresh, self-contained OCI layout in a
//! newly-created temporary directory and return its path. The caller owns
//! the returned directory and deletes it once the push has finished.

pub mod artifact;
pub mod docker;
pub mod helm;
pub mod image;

use std::path::PathBuf;

use async_trait::async_trait;

use lazyoci_core::model::{ArtifactConfig, ArtifactKind};
use lazyoci_core::template::TemplateVars;
use lazyoci_core::Result;

/// Builds one artifact into an on-disk OCI layout.
#[async_trait]
pub trait BuildHandler: Send + Sync {
    /// Produce the layout for `artifact`, identified by its position
    /// `index` in the build file for error messages, using the already
    /// rendered `vars`.
    async fn build(&self, artifact: &ArtifactConfig, index: usize, vars: &TemplateVars) -> Result<PathBuf>;
}

/// Select the handler for `kind`.
#[must_use]
pub fn handler_for(kind: ArtifactKind) -> Box<dyn BuildHandler> {
    match kind {
        ArtifactKind::Image => Box::new(image::ImageHandler),
        ArtifactKind::Helm => Box::new(helm::HelmHandler),
        ArtifactKind::Artifact => Box::new(artifact::ArtifactHandler),
        ArtifactKind::Docker => Box::new(docker::DockerHandler),
    }
}
