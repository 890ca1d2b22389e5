//! rex CLI - regex assembly preprocessor.
//!
//! Provides commands for:
//! - `assemble`: resolve a data file into one minimized pattern
//! - `preprocess`: resolve nested blocks and print the flat line stream

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{AssembleArgs, PreprocessArgs};
use output::Output;

/// rex - regex assembly preprocessor.
#[derive(Parser)]
#[command(name = "rex", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a data file into a single minimized pattern.
    Assemble(AssembleArgs),
    /// Resolve nested blocks and print the flat line stream.
    Preprocess(PreprocessArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to WARN
    let verbose = match &cli.command {
        Commands::Assemble(args) => args.common.verbose,
        Commands::Preprocess(args) => args.common.verbose,
    };
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Assemble(args) => args.execute(&output),
        Commands::Preprocess(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
