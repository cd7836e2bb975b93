//! Fedgraph CLI: the `fedgraph` command.

mod cli;
mod commands;
mod config;
mod gateway;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries command output only.
fn setup_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("FEDGRAPH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Compose { config, out, json } => commands::compose::run(config, out, json),

        Commands::Validate { config, json } => commands::validate::run(config, json),

        Commands::Resolve {
            representations,
            config,
            timeout_ms,
        } => commands::resolve::run(representations, config, timeout_ms),
    }
}
