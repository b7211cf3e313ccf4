//! Photocache CLI - offline diagnostics for the cache decision engine.
//!
//! Photo files are JSON arrays of `{id, longitude, latitude, captured_at}`
//! objects. Nothing here talks to a real provider: `resolve` replays a JSON
//! fixture as the upstream.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use photocache::config::ConfigFile;
use photocache::logging::init_logging;

use commands::{resolve, sample, score};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "photocache", version, about = "Coverage-driven photo cache diagnostics")]
struct Cli {
    /// Config file (defaults to ~/.photocache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compute the distribution score of a photo file for a bounding box
    Score(score::ScoreArgs),

    /// Spatially sample a photo file down to a target count
    Sample(sample::SampleArgs),

    /// Run the decision engine against a fixture standing in for the provider
    Resolve(resolve::ResolveArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    config.apply_env()?;

    let _guard = init_logging(&config.logging)?;
    tracing::debug!(cache_enabled = config.cache.enabled, "Configuration loaded");

    match cli.command {
        Commands::Score(args) => score::run(args, &config),
        Commands::Sample(args) => sample::run(args, &config),
        Commands::Resolve(args) => resolve::run(args, &config),
    }
}
