//! Turns a declarative build file into one or more pushed OCI artifacts:
//! per-kind handlers that each produce a self-contained on-disk OCI
//! layout, a Docker-save↔OCI-layout converter shared by the image and
//! daemon-image handlers, and the orchestrator that resolves template
//! variables and drives the handler-then-push sequence for every
//! configured artifact.

pub mod chart_meta;
pub mod docker_save;
pub mod git;
pub mod handlers;
pub mod orchestrator;
pub mod version;

pub use handlers::{handler_for, BuildHandler};
pub use orchestrator::{run_build, BuildOptions};
