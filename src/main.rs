mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_cache, run_capture, run_responsive};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Capture { args: capture, viewport } => {
            run_capture(&raw_args, args.config, capture, viewport).await
        }
        Commands::Responsive {
            args: capture,
            viewports,
        } => run_responsive(&raw_args, args.config, capture, viewports).await,
        Commands::Cache { action, format } => run_cache(args.config, action, format),
    }
}
