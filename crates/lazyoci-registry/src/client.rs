//! Construction of the underlying `oci_distribution` client and the
//! reference-parsing glue between `lazyoci-core`'s reference model and
//! the crate's own.

use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::{Client, Reference};

use lazyoci_core::Error;
use lazyoci_core::Result;

/// Build an `oci_distribution` client for either plain-HTTP (insecure,
/// self-hosted registries and local test fixtures) or HTTPS (the
/// default for everything else).
#[must_use]
pub fn build_client(plain_http: bool) -> Client {
    let protocol = if plain_http {
        ClientProtocol::Http
    } else {
        ClientProtocol::Https
    };
    Client::new(ClientConfig {
        protocol,
        ..Default::default()
    })
}

/// Parse a reference string using `oci_distribution`'s own parser,
/// wrapping its error in the crate's error type.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Reference`] when `text` is not a
/// syntactically valid image reference.
pub fn parse_reference(text: &str) -> Result<Reference> {
    text.parse()
        .map_err(|e: oci_distribution::ParseError| Error::reference(text, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_reference() {
        let reference = parse_reference("ghcr.io/acme/widgets:1.2.3").unwrap();
        assert_eq!(reference.registry(), "ghcr.io");
        assert_eq!(reference.repository(), "acme/widgets");
        assert_eq!(reference.tag(), Some("1.2.3"));
    }

    #[test]
    fn rejects_a_malformed_reference() {
        let err = parse_reference("not a reference!!").unwrap_err();
        assert!(matches!(err, Error::Reference { .. }));
    }

    #[test]
    fn builds_https_client_by_default() {
        let _client = build_client(false);
    }

    #[test]
    fn builds_http_client_when_plain_http() {
        let _client = build_client(true);
    }
}
