//! Ampoule CLI - packs a Ruby application into one executable

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

/// Failures carry the fixed packaging code as the process exit status.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ampoule::Error>()
        .map(ampoule::Error::code)
        .unwrap_or(ampoule::error::GENERIC_ERROR_CODE)
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ampoule=debug")
    } else {
        EnvFilter::new("ampoule=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Execute command
    match cli.command {
        Commands::Setup(args) => commands::setup::execute(args),
        Commands::Press(args) => commands::press::execute(args),
        Commands::Clean(args) => commands::clean::execute(args),
        Commands::Versions => commands::versions::execute(),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
