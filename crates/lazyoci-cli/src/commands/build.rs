//! `lazyoci build`: load the declarative build file, validate it, and
//! hand it to [`lazyoci_build::run_build`].

use std::path::Path;

use lazyoci_build::{run_build, BuildOptions};
use lazyoci_core::model::BuildFile;
use lazyoci_credentials::CredentialChain;

use crate::cli::{BuildArgs, CliError};

pub async fn run(args: &BuildArgs) -> Result<lazyoci_core::model::BuildReport, CliError> {
    let contents = std::fs::read_to_string(&args.file)
        .map_err(|e| CliError::config(format!("reading {}: {e}", args.file.display())))?;
    let build_file: BuildFile = serde_yaml::from_str(&contents)
        .map_err(|e| CliError::config(format!("parsing {}: {e}", args.file.display())))?;
    build_file
        .validate()
        .map_err(|e| CliError::from(e).with_help(format!("fix the build file at {}", args.file.display())))?;

    let options = BuildOptions {
        tag: args.tag.clone(),
        push: !args.no_push,
        dry_run: args.dry_run,
        quiet: args.quiet,
        plain_http: args.plain_http,
        platform_override: args.platform.clone(),
        filter: args.only.clone(),
    };

    let credentials = CredentialChain::standard();
    let repo_dir = args.file.parent().unwrap_or_else(|| Path::new("."));

    let report = run_build(&build_file, &options, &credentials, repo_dir)
        .await
        .map_err(CliError::from)?;
    Ok(report)
}
