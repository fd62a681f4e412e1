//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use ampoule::LogLevel;

/// Ampoule - presses a Ruby application into a single self-contained executable
#[derive(Parser)]
#[command(name = "ampoule")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure and build the Ruby runtime and packaging dependencies
    Setup(SetupArgs),

    /// Press the application into a single executable package
    Press(PressArgs),

    /// Remove the dependency and output trees under the prefix
    Clean(CleanArgs),

    /// List supported Ruby versions
    Versions,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct SetupArgs {
    /// Packaging prefix; 'PWD' selects the current directory
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Ruby version to package
    #[arg(short = 'R', long = "ruby", alias = "Ruby")]
    pub ruby: Option<String>,
}

#[derive(Args)]
pub struct PressArgs {
    /// Packaging prefix; 'PWD' selects the current directory
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Project root containing the application to pack
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Application entry point
    #[arg(short, long)]
    pub entry_point: PathBuf,

    /// Package file name (defaults to the entry point's base name)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ruby version to package
    #[arg(short = 'R', long = "ruby", alias = "Ruby")]
    pub ruby: Option<String>,

    /// Log level for the packed-filesystem tooling
    #[arg(short, long, value_enum)]
    pub log_level: Option<LogLevel>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Packaging prefix; 'PWD' selects the current directory
    #[arg(short, long)]
    pub prefix: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
