//! asinopt - rewrite Amazon product listings into optimized copy

use clap::Parser;
use tracing_subscriber::EnvFilter;

use asinopt::cli::{Cli, Commands};
use asinopt::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("\nHint: {}", hint);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--json` output stays clean
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("asinopt=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("asinopt=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Optimize { asin, degraded, offline, json } => {
            commands::cmd_optimize(&asin, degraded, offline, json)
        }
        Commands::Extract { asin, file, json } => {
            commands::cmd_extract(&asin, file.as_deref(), json)
        }
        Commands::Normalize { file } => commands::cmd_normalize(file.as_deref()),
        Commands::History { asin, limit, json } => {
            commands::cmd_history(asin.as_deref(), limit, json)
        }
        Commands::Show { id, json } => commands::cmd_show(id, json),
        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
