//! Integration tests against a stubbed registry.
//!
//! These exercise the wire client end to end — manifest fetch, blob fetch,
//! and the skip-if-present probe — against an HTTP server that speaks just
//! enough of the registry API for `oci_distribution` to be satisfied,
//! instead of mocking `lazyoci_registry`'s own functions.

use sha2::{Digest, Sha256};

use lazyoci_registry::auth::AnonymousProvider;
use lazyoci_registry::puller::{manifest_exists, pull_blob, pull_manifest};

const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

fn image_manifest_body(layer_digest: &str, layer_size: usize) -> String {
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": MANIFEST_MEDIA_TYPE,
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "digest": "sha256:configconfigconfigconfigconfigconfigconfigconfigconfigconfig00",
            "size": 2,
        },
        "layers": [{
            "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
            "digest": layer_digest,
            "size": layer_size,
        }],
    })
    .to_string()
}

#[tokio::test]
async fn pull_manifest_reads_an_image_manifest_from_a_stub_registry() {
    let mut server = mockito::Server::new_async().await;
    let host = server.host_with_port();

    let _ping = server.mock("GET", "/v2/").with_status(200).create_async().await;

    let digest = format!("sha256:{}", "a".repeat(64));
    let body = image_manifest_body(&digest, 1234);
    let _manifest = server
        .mock("GET", "/v2/acme/widgets/manifests/1.0.0")
        .with_status(200)
        .with_header("content-type", MANIFEST_MEDIA_TYPE)
        .with_header("docker-content-digest", "sha256:deadbeef")
        .with_body(&body)
        .create_async()
        .await;

    let target = format!("{host}/acme/widgets:1.0.0");
    let pulled = pull_manifest(&target, &AnonymousProvider, true).await.unwrap();

    let image = pulled.image.expect("a single-platform manifest should parse as an image");
    assert_eq!(image.layers.len(), 1);
    assert_eq!(image.layers[0].digest, digest);
}

#[tokio::test]
async fn pull_blob_downloads_the_requested_digest() {
    let mut server = mockito::Server::new_async().await;
    let host = server.host_with_port();

    let _ping = server.mock("GET", "/v2/").with_status(200).create_async().await;

    let content = b"hello from the mock registry";
    let digest = format!("sha256:{:x}", Sha256::digest(content));
    let _blob = server
        .mock("GET", &*format!("/v2/acme/widgets/blobs/{digest}"))
        .with_status(200)
        .with_header("content-length", &content.len().to_string())
        .with_body(content.as_slice())
        .create_async()
        .await;

    let target = format!("{host}/acme/widgets:1.0.0");
    let fetched = pull_blob(&target, &digest, &AnonymousProvider, true).await.unwrap();
    assert_eq!(fetched, content);
}

#[tokio::test]
async fn manifest_exists_is_true_when_the_registry_has_the_tag() {
    let mut server = mockito::Server::new_async().await;
    let host = server.host_with_port();

    let _ping = server.mock("GET", "/v2/").with_status(200).create_async().await;
    let digest = format!("sha256:{}", "b".repeat(64));
    let _manifest = server
        .mock("GET", "/v2/acme/widgets/manifests/2.0.0")
        .with_status(200)
        .with_header("content-type", MANIFEST_MEDIA_TYPE)
        .with_header("docker-content-digest", "sha256:deadbeef")
        .with_body(image_manifest_body(&digest, 42))
        .create_async()
        .await;

    let target = format!("{host}/acme/widgets:2.0.0");
    assert!(manifest_exists(&target, &AnonymousProvider, true).await.unwrap());
}

#[tokio::test]
async fn manifest_exists_is_false_on_a_404() {
    let mut server = mockito::Server::new_async().await;
    let host = server.host_with_port();

    let _ping = server.mock("GET", "/v2/").with_status(200).create_async().await;
    let _missing = server
        .mock("GET", "/v2/acme/widgets/manifests/missing")
        .with_status(404)
        .create_async()
        .await;

    let target = format!("{host}/acme/widgets:missing");
    assert!(!manifest_exists(&target, &AnonymousProvider, true).await.unwrap());
}
