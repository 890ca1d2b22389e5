//! `preprocess` command.

use std::io::Write;

use clap::Args;
use rex_assembler::{Assembler, LineCursor};

use super::CommonArgs;
use crate::error::CliError;

/// Arguments for the `preprocess` command.
#[derive(Args)]
pub(crate) struct PreprocessArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
}

impl PreprocessArgs {
    pub(crate) fn execute(&self) -> Result<(), CliError> {
        let source = self.common.read_source()?;
        let engine = self.common.build_engine()?;

        let mut assembler = Assembler::new(&engine);
        let mut cursor = LineCursor::new(&source);
        let lines = assembler.preprocess(&mut cursor)?;

        let mut stdout = std::io::stdout().lock();
        for line in &lines {
            writeln!(stdout, "{line}")?;
        }
        Ok(())
    }
}
