//! Per-image copy: skip-if-present probe, the actual registry-to-registry
//! copy (with a one-shot anonymous retry against the source on an auth
//! rejection), and multi-architecture child tagging.

use lazyoci_core::model::{ImageResult, ImageStatus};
use lazyoci_core::reference::parse_reference as parse_lazyoci_reference;
use lazyoci_core::{remap, Error};

use lazyoci_registry::{AnonymousProvider, CredentialProvider};

/// Copy one already-remapped image reference, honoring the skip-if-present
/// probe and the `--force` bypass, and tagging multi-arch children in the
/// destination. Never returns `Err`: every failure is folded into the
/// returned [`ImageResult`] so a concurrent fan-out can collect every
/// result without a failing future cancelling its siblings.
pub async fn copy_one_image(
    source: &str,
    dest_base: &str,
    source_provider: &dyn CredentialProvider,
    dest_provider: &dyn CredentialProvider,
    plain_http: bool,
    force: bool,
    dry_run: bool,
) -> ImageResult {
    let remapped = match remap::remap_str(source, dest_base) {
        Ok(r) => r,
        Err(e) => {
            return ImageResult {
                reference: source.to_string(),
                remapped: String::new(),
                status: ImageStatus::Failed,
                error: Some(e.to_string()),
            }
        }
    };

    if dry_run {
        return ImageResult {
            reference: source.to_string(),
            remapped,
            status: ImageStatus::DryRun,
            error: None,
        };
    }

    if !force {
        match lazyoci_registry::manifest_exists(&remapped, dest_provider, plain_http).await {
            Ok(true) => {
                return ImageResult {
                    reference: source.to_string(),
                    remapped,
                    status: ImageStatus::Skipped,
                    error: None,
                };
            }
            Ok(false) => {}
            Err(e) => {
                return ImageResult {
                    reference: source.to_string(),
                    remapped,
                    status: ImageStatus::Failed,
                    error: Some(e.to_string()),
                };
            }
        }
    }

    match copy_with_anonymous_retry(source, &remapped, source_provider, dest_provider, plain_http).await {
        Ok(()) => {
            tag_multi_arch_children(source, &remapped, source_provider, dest_provider, plain_http).await;
            ImageResult {
                reference: source.to_string(),
                remapped,
                status: ImageStatus::Copied,
                error: None,
            }
        }
        Err(e) => ImageResult {
            reference: source.to_string(),
            remapped,
            status: ImageStatus::Failed,
            error: Some(e.to_string()),
        },
    }
}

async fn copy_with_anonymous_retry(
    source: &str,
    dest: &str,
    source_provider: &dyn CredentialProvider,
    dest_provider: &dyn CredentialProvider,
    plain_http: bool,
) -> lazyoci_core::Result<()> {
    match lazyoci_registry::copy(source, dest, source_provider, dest_provider, plain_http).await {
        Ok(_) => Ok(()),
        Err(e) if is_credentials_denied(&e) => {
            tracing::debug!(source, "source credentials denied, retrying anonymously");
            lazyoci_registry::copy(source, dest, &AnonymousProvider, dest_provider, plain_http)
                .await
                .map(|_| ())
        }
        Err(e) => Err(e),
    }
}

fn is_credentials_denied(error: &Error) -> bool {
    if matches!(error, Error::CredentialsDenied(..)) {
        return true;
    }
    let message = error.to_string().to_ascii_lowercase();
    message.contains("forbidden") || message.contains("denied") || message.contains("403")
}

/// After a successful copy, check whether the source root was a
/// multi-platform index; if so, tag every platform child in the
/// destination as `<tag>-<os>-<arch>[-<variant>]`. Best-effort: any
/// failure here is logged and swallowed, per §4.8.
async fn tag_multi_arch_children(
    source: &str,
    remapped_dest: &str,
    source_provider: &dyn CredentialProvider,
    dest_provider: &dyn CredentialProvider,
    plain_http: bool,
) {
    let pulled = match lazyoci_registry::pull_manifest(source, source_provider, plain_http).await {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(source, error = %e, "could not re-fetch root to check for multi-arch children");
            return;
        }
    };
    let Some(index) = pulled.index else {
        return;
    };

    let Some((source_host_stripped, base_tag)) = split_repo_and_tag(remapped_dest) else {
        return;
    };

    for entry in &index.manifests {
        let Some(platform) = &entry.platform else {
            continue;
        };
        let mut child_tag = format!("{base_tag}-{}-{}", platform.os, platform.architecture);
        if let Some(variant) = &platform.variant {
            if !variant.is_empty() {
                child_tag.push('-');
                child_tag.push_str(variant);
            }
        }
        let child_source = format!("{}@{}", source_host_stripped, entry.digest);
        let child_dest = format!("{}:{child_tag}", dest_repository(remapped_dest));

        if let Err(e) = lazyoci_registry::copy(&child_source, &child_dest, source_provider, dest_provider, plain_http).await {
            tracing::warn!(child = %child_dest, error = %e, "failed to tag multi-arch child, continuing");
        }
    }
}

fn split_repo_and_tag(remapped: &str) -> Option<(String, String)> {
    let reference = parse_lazyoci_reference(remapped).ok()?;
    let tag = match reference.identifier {
        lazyoci_core::reference::Identifier::Tag(t) => t,
        lazyoci_core::reference::Identifier::Digest(_) => return None,
    };
    Some((format!("{}/{}", reference.registry_host, reference.repository_path), tag))
}

fn dest_repository(remapped: &str) -> String {
    match remapped.rsplit_once(':') {
        Some((repo, _tag)) => repo.to_string(),
        None => remapped.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyoci_registry::AnonymousProvider;

    #[tokio::test]
    async fn dry_run_reports_would_copy_without_touching_the_network() {
        let result = copy_one_image(
            "ghcr.io/upstream/nginx:1.25",
            "r.example/mirror",
            &AnonymousProvider,
            &AnonymousProvider,
            false,
            false,
            true,
        )
        .await;
        assert_eq!(result.status, ImageStatus::DryRun);
        assert_eq!(result.remapped, "r.example/mirror/upstream/nginx:1.25");
    }

    #[tokio::test]
    async fn unparseable_source_reference_fails_without_panicking() {
        let result = copy_one_image(
            "not a reference!!",
            "r.example/mirror",
            &AnonymousProvider,
            &AnonymousProvider,
            false,
            false,
            false,
        )
        .await;
        assert_eq!(result.status, ImageStatus::Failed);
        assert!(result.error.is_some());
    }

    #[test]
    fn detects_credentials_denied_variants() {
        assert!(is_credentials_denied(&Error::CredentialsDenied(
            "ghcr.io".to_string(),
            "expired".to_string()
        )));
        assert!(is_credentials_denied(&Error::Transport("403 Forbidden".to_string())));
        assert!(!is_credentials_denied(&Error::Transport("connection reset".to_string())));
    }

    #[test]
    fn splits_repo_and_tag_for_child_tagging() {
        let (repo, tag) = split_repo_and_tag("r.example/mirror/app:v1").unwrap();
        assert_eq!(repo, "r.example/mirror/app");
        assert_eq!(tag, "v1");
    }
}
