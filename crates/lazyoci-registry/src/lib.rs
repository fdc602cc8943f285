//! The wire client: everything that talks to a remote OCI registry over
//! HTTP(S). Reads and writes go through `oci_distribution`; everything
//! above this crate works in terms of the local OCI layout
//! (`lazyoci_core::oci_layout`) and hands this crate only a target
//! reference string and a credential provider.

pub mod auth;
pub mod client;
pub mod copy;
pub mod puller;
pub mod pusher;

pub use auth::{resolve_auth, AnonymousProvider, CredentialProvider};
pub use client::{build_client, parse_reference};
pub use copy::copy;
pub use puller::{manifest_exists, pull_blob, pull_manifest, PulledManifest};
pub use pusher::{push, PushedDescriptor};
