//! Argument parsing and the CLI-facing error type. Everything here is a
//! thin shell around the library crates: no retries, no extra validation
//! beyond what a human needs to see why their YAML or reference was
//! rejected.

use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Config/validation failures exit with this code.
pub const EXIT_CONFIG: i32 = 2;
/// Runtime failures (registry, subprocess, credentials) exit with this code.
pub const EXIT_RUN: i32 = 1;
/// Anything else.
pub const EXIT_OTHER: i32 = 3;

#[derive(Parser, Debug)]
#[command(name = "lazyoci", about = "Mirror Helm charts and build OCI artifacts", version)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human text on stdout/stderr.
    #[arg(long, global = true)]
    pub json: bool,
    /// Raise the log level to debug regardless of `RUST_LOG`.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build artifacts from a declarative build file and push them.
    Build(BuildArgs),
    /// Mirror upstream Helm charts and their images into a target registry.
    Mirror(MirrorArgs),
    /// Pull a single manifest to a local OCI layout or the Docker daemon.
    Pull(PullArgs),
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Path to the declarative build file.
    #[arg(long, short = 'f', default_value = "lazyoci.yaml")]
    pub file: PathBuf,
    /// Tag fed to `{{ .Tag }}` and considered for version resolution.
    #[arg(long)]
    pub tag: Option<String>,
    /// Skip pushing; only build each artifact's OCI layout.
    #[arg(long)]
    pub no_push: bool,
    /// Report what would be pushed without building or pushing anything.
    #[arg(long)]
    pub dry_run: bool,
    /// Suppress per-target progress logging.
    #[arg(long)]
    pub quiet: bool,
    /// Use plain HTTP against every push target.
    #[arg(long)]
    pub plain_http: bool,
    /// Override every image artifact's configured platform list.
    #[arg(long, value_delimiter = ',')]
    pub platform: Option<Vec<String>>,
    /// Restrict the run to one artifact: matched by name, then kind, then index.
    #[arg(long)]
    pub only: Option<String>,
}

#[derive(Parser, Debug)]
pub struct MirrorArgs {
    /// Path to the mirror configuration file.
    #[arg(long, short = 'c', default_value = "lazyoci-mirror.yaml")]
    pub config: PathBuf,
    /// Restrict the run to a single configured upstream.
    #[arg(long)]
    pub chart: Option<String>,
    /// Override the upstream's configured versions for this run. Repeatable.
    #[arg(long = "version", short = 'V')]
    pub versions: Vec<String>,
    /// Bypass the skip-if-present probe and copy unconditionally.
    #[arg(long)]
    pub force: bool,
    /// Maximum concurrent image copies per chart version.
    #[arg(long, env = "LAZYOCI_CONCURRENCY")]
    pub concurrency: Option<usize>,
    /// Report what would be copied without pulling, pushing, or copying.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct PullArgs {
    /// The reference to pull, e.g. `ghcr.io/acme/app:1.2.3`.
    pub reference: String,
    /// Write the pulled content as an OCI layout under this directory.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Load the pulled image into the local Docker daemon instead.
    #[arg(long, conflicts_with = "output")]
    pub daemon: bool,
    /// Use plain HTTP against the source registry.
    #[arg(long)]
    pub plain_http: bool,
}

#[derive(Serialize)]
struct OkEnvelope<T> {
    status: &'static str,
    data: T,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    status: &'static str,
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
}

/// Serialize `data` as a `{"status":"ok","data":...}` envelope on stdout.
///
/// # Errors
/// Returns [`lazyoci_core::Error::Json`] if `data` cannot be serialized.
pub fn print_json<T: Serialize>(data: &T) -> lazyoci_core::Result<()> {
    let envelope = OkEnvelope { status: "ok", data };
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

/// The CLI's own error type: every library error is folded into one of
/// three dispositions before it reaches the terminal.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// The build file or mirror config failed to load or validate.
    #[error("{message}")]
    #[diagnostic(code(lazyoci::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The operation itself failed: a registry, subprocess, or credential error.
    #[error("{message}")]
    #[diagnostic(code(lazyoci::run))]
    Run {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Anything that does not fit the two categories above.
    #[error("{message}")]
    #[diagnostic(code(lazyoci::other))]
    Other {
        message: String,
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn run(message: impl Into<String>) -> Self {
        Self::Run {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    #[must_use]
    pub fn with_help(self, help: impl Into<String>) -> Self {
        let help = Some(help.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Run { message, .. } => Self::Run { message, help },
            Self::Other { message, .. } => Self::Other { message, help },
        }
    }

    #[must_use]
    fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Run { .. } => "run",
            Self::Other { .. } => "other",
        }
    }
}

impl From<lazyoci_core::Error> for CliError {
    fn from(err: lazyoci_core::Error) -> Self {
        match &err {
            lazyoci_core::Error::Configuration { .. } => Self::config(err.to_string()),
            lazyoci_core::Error::CredentialsNotFound(host) => {
                Self::run(err.to_string()).with_help(format!("no backend had a credential for '{host}'; falling back to anonymous access may still work"))
            }
            lazyoci_core::Error::CredentialsDenied(..) => {
                Self::run(err.to_string()).with_help("check the credential stored for this registry, or pass --force to retry anonymously where supported")
            }
            lazyoci_core::Error::Reference { .. } => Self::config(err.to_string()),
            lazyoci_core::Error::Transport(_)
            | lazyoci_core::Error::Subprocess { .. }
            | lazyoci_core::Error::Format { .. }
            | lazyoci_core::Error::Template(_)
            | lazyoci_core::Error::NotImplemented(_)
            | lazyoci_core::Error::Io(_)
            | lazyoci_core::Error::Json(_) => Self::run(err.to_string()),
        }
    }
}

/// Exit code that corresponds to `err`'s variant.
#[must_use]
pub fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CONFIG,
        CliError::Run { .. } => EXIT_RUN,
        CliError::Other { .. } => EXIT_OTHER,
    }
}

/// Print `err` to stderr, as a JSON envelope when `json_mode` is set,
/// otherwise as a `miette` diagnostic report.
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let envelope = ErrorEnvelope {
            status: "error",
            error: ErrorBody {
                code: err.code(),
                message: err.to_string(),
            },
        };
        if let Ok(rendered) = serde_json::to_string(&envelope) {
            eprintln!("{rendered}");
        }
    } else {
        let report = miette::Report::new(err.clone());
        eprintln!("{report:?}");
    }
    let _ = std::io::stderr().flush();
}
