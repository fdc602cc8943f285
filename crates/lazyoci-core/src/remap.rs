//! Image-reference normalization and remapping between registries.

use crate::reference::{Identifier, Reference, parse_reference};

fn looks_like_host(segment: &str) -> bool {
    segment == "localhost" || segment.contains('.') || segment.contains(':')
}

fn is_sha256_digest(s: &str) -> bool {
    s.strip_prefix("sha256:")
        .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Split off a trailing identifier the same way [`crate::reference::parse_reference`]
/// does, but tolerantly: a malformed digest is treated as "no identifier"
/// rather than an error, since `normalize` never fails on malformed input —
/// it returns an empty string for the handful of cases it refuses to
/// interpret (quoted strings, template placeholders) and otherwise always
/// produces a best-effort canonical form.
fn split_identifier(s: &str) -> (&str, String) {
    if let Some(at) = s.rfind('@') {
        let digest = &s[at + 1..];
        if is_sha256_digest(digest) {
            return (&s[..at], format!("@{digest}"));
        }
    }
    if let Some(colon) = s.rfind(':') {
        let after = &s[colon + 1..];
        if !after.is_empty() && !after.contains('/') {
            return (&s[..colon], format!(":{after}"));
        }
    }
    (s, ":latest".to_string())
}

/// Expand a bare image name into fully-qualified canonical form.
///
/// - A quoted string (`"..."`) or any substring containing a templating
///   placeholder (`{{`) is not a reference at all; returns an empty string.
/// - A reference with no host and a single path segment becomes
///   `docker.io/library/<name>`.
/// - A reference with no host and two or more path segments becomes
///   `docker.io/<path>`.
/// - A missing tag defaults to `latest`.
/// - An already host-qualified reference is returned with its tag defaulted
///   but is otherwise unchanged, which is what makes `normalize` idempotent.
#[must_use]
pub fn normalize(reference: &str) -> String {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("{{") {
        return String::new();
    }
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return String::new();
    }

    let (path_and_host, identifier_suffix) = split_identifier(trimmed);

    let first_segment = path_and_host.split('/').next().unwrap_or("");
    if looks_like_host(first_segment) {
        return format!("{path_and_host}{identifier_suffix}");
    }

    let segment_count = path_and_host.matches('/').count() + 1;
    if segment_count <= 1 {
        format!("docker.io/library/{path_and_host}{identifier_suffix}")
    } else {
        format!("docker.io/{path_and_host}{identifier_suffix}")
    }
}

/// Remap a (normalized) source reference onto a target base: strip the
/// source host segment and prepend `target_base`, preserving the source
/// path verbatim and carrying the tag or digest over intact.
#[must_use]
pub fn remap(src: &Reference, target_base: &str) -> String {
    let target_base = target_base.trim_end_matches('/');
    match &src.identifier {
        Identifier::Tag(tag) => format!("{target_base}/{}:{tag}", src.repository_path),
        Identifier::Digest(digest) => format!("{target_base}/{}@{digest}", src.repository_path),
    }
}

/// Parse `src` then remap it, for callers that have a raw string in hand.
///
/// # Errors
/// Propagates [`crate::error::Error::Reference`] from [`parse_reference`].
pub fn remap_str(src: &str, target_base: &str) -> crate::error::Result<String> {
    let parsed = parse_reference(src)?;
    Ok(remap(&parsed, target_base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_gets_library_prefix() {
        assert_eq!(normalize("nginx"), "docker.io/library/nginx:latest");
    }

    #[test]
    fn two_segments_get_docker_io_prefix() {
        assert_eq!(normalize("myorg/myimage"), "docker.io/myorg/myimage:latest");
    }

    #[test]
    fn explicit_tag_is_preserved() {
        assert_eq!(normalize("myorg/myimage:v2"), "docker.io/myorg/myimage:v2");
    }

    #[test]
    fn already_qualified_reference_is_unchanged_apart_from_tag_default() {
        assert_eq!(
            normalize("ghcr.io/ns/img"),
            "ghcr.io/ns/img:latest"
        );
    }

    #[test]
    fn host_port_boundary_resolves_latest() {
        assert_eq!(normalize("host:5000/path"), "host:5000/path:latest");
    }

    #[test]
    fn quoted_strings_return_empty() {
        assert_eq!(normalize("\"null\""), "");
    }

    #[test]
    fn template_placeholders_return_empty() {
        assert_eq!(normalize("{{ .Values.image }}"), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in [
            "nginx",
            "myorg/myimage:v2",
            "ghcr.io/ns/img",
            "host:5000/path",
        ] {
            let once = normalize(input);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize not idempotent for {input:?}");
        }
    }

    #[test]
    fn remap_strips_host_and_preserves_path_and_tag() {
        let src = parse_reference("ghcr.io/upstream/nginx:1.25").unwrap();
        assert_eq!(remap(&src, "r.example/mirror"), "r.example/mirror/upstream/nginx:1.25");
    }

    #[test]
    fn remap_preserves_digest() {
        let digest = format!("sha256:{}", "b".repeat(64));
        let src = parse_reference(&format!("ghcr.io/upstream/nginx@{digest}")).unwrap();
        assert_eq!(
            remap(&src, "r.example/mirror"),
            format!("r.example/mirror/upstream/nginx@{digest}")
        );
    }

    #[test]
    fn remap_is_determined_only_by_first_remap_host_stripping() {
        let src = parse_reference("ghcr.io/upstream/nginx:1.25").unwrap();
        let once = remap(&src, "r.example/mirror");
        let reparsed = parse_reference(&once).unwrap();
        let twice = remap(&reparsed, "other.example/mirror2");
        assert_eq!(twice, "other.example/mirror2/mirror/upstream/nginx:1.25");
    }
}
