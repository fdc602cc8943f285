//! Parsing of OCI image and artifact references.
//!
//! A reference is `host[:port]/path[:tag|@digest]`. The tricky part is
//! distinguishing a port from a tag when both are introduced by `:`; see
//! [`parse_reference`] for the exact rule.

use crate::error::{Error, Result};
use std::fmt;

/// The tag-or-digest half of a parsed [`Reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// A tag, e.g. `latest`, `v1.0.0`.
    Tag(String),
    /// A content digest, e.g. `sha256:<64 hex chars>`.
    Digest(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => write!(f, ":{t}"),
            Self::Digest(d) => write!(f, "@{d}"),
        }
    }
}

/// A fully parsed reference: `{registry-host, repository-path, identifier}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The registry host, optionally with a port, e.g. `registry.example.com:5000`.
    pub registry_host: String,
    /// The repository path, e.g. `ns/image`. Never empty.
    pub repository_path: String,
    /// The tag or digest.
    pub identifier: Identifier,
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}",
            self.registry_host, self.repository_path, self.identifier
        )
    }
}

fn looks_like_host(segment: &str) -> bool {
    segment == "localhost" || segment.contains('.') || segment.contains(':')
}

fn is_sha256_digest(s: &str) -> bool {
    s.strip_prefix("sha256:")
        .is_some_and(|hex| hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Split `s` into its path portion and identifier, applying the
/// digest-then-tag-then-default rule used by both [`parse_reference`] and
/// the normalizer: a trailing `@...` is always a digest; otherwise the
/// substring after the *last* `:` is the tag only if it contains no `/`
/// (this is what makes `host:port/path` resolve to tag `latest` rather
/// than tag `port`); absent either, the identifier defaults to `latest`.
fn split_identifier(s: &str) -> Result<(&str, Identifier)> {
    if let Some(at) = s.rfind('@') {
        let digest = &s[at + 1..];
        if !is_sha256_digest(digest) {
            return Err(Error::reference(s, format!("malformed digest '{digest}'")));
        }
        return Ok((&s[..at], Identifier::Digest(digest.to_string())));
    }

    if let Some(colon) = s.rfind(':') {
        let after = &s[colon + 1..];
        if !after.is_empty() && !after.contains('/') {
            return Ok((&s[..colon], Identifier::Tag(after.to_string())));
        }
    }

    Ok((s, Identifier::Tag("latest".to_string())))
}

/// Parse a fully host-qualified reference string.
///
/// # Errors
/// Returns [`Error::Reference`] when the host segment is malformed (does
/// not look like a host: no dot, no port, and not `localhost`), when the
/// repository path is empty, or when a digest identifier does not match
/// `sha256:<64 hex chars>`.
pub fn parse_reference(s: &str) -> Result<Reference> {
    let Some(slash) = s.find('/') else {
        return Err(Error::reference(s, "reference has no repository path"));
    };
    let host_candidate = &s[..slash];
    if !looks_like_host(host_candidate) {
        return Err(Error::reference(
            s,
            format!("'{host_candidate}' does not look like a registry host"),
        ));
    }

    let remainder = &s[slash + 1..];
    if remainder.is_empty() {
        return Err(Error::reference(s, "empty repository path"));
    }

    let (repository_path, identifier) = split_identifier(remainder)?;
    if repository_path.is_empty() {
        return Err(Error::reference(s, "empty repository path"));
    }

    Ok(Reference {
        registry_host: host_candidate.to_string(),
        repository_path: repository_path.to_string(),
        identifier,
    })
}
