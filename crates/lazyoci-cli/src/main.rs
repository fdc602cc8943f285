//! Entry point: initializes logging, parses arguments, dispatches to the
//! matching subcommand, and translates its result into an exit code.

use clap::Parser;

use lazyoci_cli::cli::Commands;
use lazyoci_cli::{cli, commands};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("lazyoci panicked: {info}");
    }));

    let args = cli::Cli::parse();
    init_logging(args.verbose);

    let exit_code = run(&args).await;
    std::process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(args: &cli::Cli) -> i32 {
    let result = match &args.command {
        Commands::Build(build_args) => commands::build::run(build_args)
            .await
            .map(|report| serde_json::to_value(&report).unwrap_or(serde_json::Value::Null)),
        Commands::Mirror(mirror_args) => commands::mirror::run(mirror_args)
            .await
            .map(|summary| serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null)),
        Commands::Pull(pull_args) => commands::pull::run(pull_args)
            .await
            .map(|path| serde_json::json!({ "path": path.display().to_string() })),
    };

    match result {
        Ok(value) => {
            if args.json {
                let _ = cli::print_json(&value);
            } else if let Ok(pretty) = serde_json::to_string_pretty(&value) {
                println!("{pretty}");
            }
            0
        }
        Err(err) => {
            cli::render_error(&err, args.json);
            cli::exit_code_for(&err)
        }
    }
}
