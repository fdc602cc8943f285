//! Read-side wire operations: fetching a manifest (used both to check
//! whether a target already has the content the mirror engine is about to
//! copy, and to enumerate a multi-arch image's child manifests) and
//! pulling blobs into memory.

use oci_distribution::manifest::{OciImageManifest, OciManifest};

use lazyoci_core::Error;
use lazyoci_core::Result;

use crate::auth::{resolve_auth, CredentialProvider};
use crate::client::{build_client, parse_reference};

/// A manifest pulled from a registry, along with its digest as reported
/// by the registry.
#[derive(Debug, Clone)]
pub struct PulledManifest {
    /// The manifest digest reported by the registry for this reference.
    pub digest: String,
    /// The single-platform image manifest, when `reference` did not
    /// resolve to a multi-platform index.
    pub image: Option<OciImageManifest>,
    /// The list of raw platform-keyed manifest entries, when `reference`
    /// resolved to a multi-platform index.
    pub index: Option<oci_distribution::manifest::OciImageIndex>,
}

/// Fetch the manifest for `target`, returning both the parsed manifest
/// and the registry-reported digest.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Reference`] if `target` does not
/// parse, or [`lazyoci_core::Error::Transport`] if the registry request
/// fails (including a 404, which the mirror engine's probe step
/// interprets as "not present").
pub async fn pull_manifest(
    target: &str,
    credential_provider: &dyn CredentialProvider,
    plain_http: bool,
) -> Result<PulledManifest> {
    let reference = parse_reference(target)?;
    let client = build_client(plain_http);
    let auth = resolve_auth(credential_provider, reference.registry()).await?;

    let (manifest, digest) = client
        .pull_manifest(&reference, &auth)
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    match manifest {
        OciManifest::Image(image) => Ok(PulledManifest {
            digest,
            image: Some(image),
            index: None,
        }),
        OciManifest::ImageIndex(index) => Ok(PulledManifest {
            digest,
            image: None,
            index: Some(index),
        }),
    }
}

/// Probe whether `target` already exists on its registry, without
/// downloading its content. Used by the mirror engine's skip-if-present
/// check.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Reference`] if `target` does not
/// parse. A registry-side 404 is reported as `Ok(false)`, not an error;
/// any other transport failure is returned as
/// [`lazyoci_core::Error::Transport`].
pub async fn manifest_exists(
    target: &str,
    credential_provider: &dyn CredentialProvider,
    plain_http: bool,
) -> Result<bool> {
    match pull_manifest(target, credential_provider, plain_http).await {
        Ok(_) => Ok(true),
        Err(Error::Transport(message)) if is_not_found(&message) => Ok(false),
        Err(e) => Err(e),
    }
}

fn is_not_found(message: &str) -> bool {
    message.contains("404") || message.to_ascii_lowercase().contains("not found")
}

/// Pull a single blob (config or layer) by digest into memory.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Reference`] if `target` does not
/// parse, or [`lazyoci_core::Error::Transport`] on a registry failure.
pub async fn pull_blob(
    target: &str,
    digest: &str,
    credential_provider: &dyn CredentialProvider,
    plain_http: bool,
) -> Result<Vec<u8>> {
    let reference = parse_reference(target)?;
    let client = build_client(plain_http);
    let auth = resolve_auth(credential_provider, reference.registry()).await?;
    let mut buffer = Vec::new();
    client
        .pull_blob(&reference, digest, &mut buffer)
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AnonymousProvider;

    #[tokio::test]
    async fn rejects_an_unparseable_target() {
        let err = pull_manifest("not a reference!!", &AnonymousProvider, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reference { .. }));
    }

    #[test]
    fn recognizes_not_found_messages() {
        assert!(is_not_found("registry responded with 404 Not Found"));
        assert!(is_not_found("manifest not found"));
        assert!(!is_not_found("connection reset by peer"));
    }
}
