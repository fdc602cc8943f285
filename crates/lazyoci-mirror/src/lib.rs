//! Mirrors Helm charts (and every image reference they render) from a
//! chart repository, OCI registry, or local chart directory onto a
//! single target registry. Built on the build crate's sibling: the
//! registry wire client in `lazyoci-registry`, plus the Helm CLI for
//! everything chart-shaped (fetch, package, template, push).

pub mod copy;
pub mod engine;
pub mod extract;
pub mod upstream;

pub use engine::{mirror_all, mirror_one, MirrorOptions};
