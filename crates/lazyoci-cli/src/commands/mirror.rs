//! `lazyoci mirror`: load the mirror configuration, validate it, and hand
//! it to [`lazyoci_mirror::mirror_all`] or [`lazyoci_mirror::mirror_one`].

use std::sync::Arc;

use lazyoci_core::model::MirrorConfig;
use lazyoci_credentials::CredentialChain;
use lazyoci_mirror::MirrorOptions;
use lazyoci_registry::CredentialProvider;

use crate::cli::{CliError, MirrorArgs};

pub async fn run(args: &MirrorArgs) -> Result<lazyoci_core::model::MirrorSummary, CliError> {
    let contents = std::fs::read_to_string(&args.config)
        .map_err(|e| CliError::config(format!("reading {}: {e}", args.config.display())))?;
    let config: MirrorConfig = serde_yaml::from_str(&contents)
        .map_err(|e| CliError::config(format!("parsing {}: {e}", args.config.display())))?;
    config
        .validate()
        .map_err(|e| CliError::from(e).with_help(format!("fix the mirror config at {}", args.config.display())))?;

    let defaults = MirrorOptions::default();
    let options = MirrorOptions {
        force: args.force,
        dry_run: args.dry_run,
        concurrency: args.concurrency.unwrap_or(defaults.concurrency),
        plain_http: config.target.insecure,
    };

    let credentials: Arc<dyn CredentialProvider> = Arc::new(CredentialChain::standard());

    let summary = if let Some(chart_key) = &args.chart {
        let version_override = (!args.versions.is_empty()).then_some(args.versions.as_slice());
        lazyoci_mirror::mirror_one(&config, chart_key, version_override, &options, credentials).await
    } else {
        lazyoci_mirror::mirror_all(&config, &options, credentials).await
    }
    .map_err(CliError::from)?;

    Ok(summary)
}
