//! CLI command implementations.

pub(crate) mod assemble;
pub(crate) mod preprocess;

pub(crate) use assemble::AssembleArgs;
pub(crate) use preprocess::PreprocessArgs;

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use rex_config::{CliSettings, Config};
use rex_engine::CommandEngine;

use crate::error::CliError;

/// Options shared by all commands.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Data file to read (stdin when omitted).
    pub(crate) file: Option<PathBuf>,

    /// Path to rex.toml (discovered in parent directories when omitted).
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Union engine program to invoke.
    #[arg(long)]
    pub(crate) engine: Option<String>,

    /// Engine wait budget in seconds.
    #[arg(long)]
    pub(crate) timeout: Option<u64>,

    /// Enable debug logging.
    #[arg(long, short)]
    pub(crate) verbose: bool,
}

impl CommonArgs {
    /// Read the input text from the data file or stdin.
    pub(crate) fn read_source(&self) -> Result<String, CliError> {
        match &self.file {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
        }
    }

    /// Build the union engine from config and CLI overrides.
    pub(crate) fn build_engine(&self) -> Result<CommandEngine, CliError> {
        let settings = CliSettings {
            engine_program: self.engine.clone(),
            engine_timeout_secs: self.timeout,
        };
        let config = Config::load(self.config.as_deref(), Some(&settings))?;
        tracing::debug!(
            program = %config.engine.program,
            timeout_secs = config.engine.timeout_secs,
            "union engine configured"
        );
        Ok(CommandEngine::new(config.engine.program.as_str())
            .args(&config.engine.args)
            .timeout(Duration::from_secs(config.engine.timeout_secs)))
    }
}
