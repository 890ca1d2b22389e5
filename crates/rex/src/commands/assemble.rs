//! `assemble` command.

use std::io::Write;

use clap::Args;
use rex_assembler::{Assembler, LineCursor};

use super::CommonArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the `assemble` command.
#[derive(Args)]
pub(crate) struct AssembleArgs {
    #[command(flatten)]
    pub(crate) common: CommonArgs,
}

impl AssembleArgs {
    pub(crate) fn execute(&self, output: &Output) -> Result<(), CliError> {
        let source = self.common.read_source()?;
        let engine = self.common.build_engine()?;

        let mut assembler = Assembler::new(&engine);
        let mut cursor = LineCursor::new(&source);
        match assembler.run(&mut cursor)? {
            Some(pattern) => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{pattern}")?;
            }
            None => output.warning("input produced no pattern"),
        }
        Ok(())
    }
}
