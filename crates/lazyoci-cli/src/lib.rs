//! The `lazyoci` binary's argument parsing, error rendering, and
//! subcommand dispatch. Everything that does real work lives in
//! `lazyoci-core`, `lazyoci-credentials`, `lazyoci-registry`,
//! `lazyoci-build`, and `lazyoci-mirror`; this crate only wires flags and
//! YAML files to those libraries and turns their results into exit codes.

pub mod cli;
pub mod commands;

pub use cli::{exit_code_for, render_error, Cli, CliError, Commands};
