//! Nesting dispatcher.
//!
//! Walks a flat line stream, recursively resolving `##!>`/`##!<` blocks into
//! their single-line results and splicing those back into the stream where
//! each block began. The recursion depth equals the nesting depth; the call
//! stack is the frame stack.

use rex_engine::UnionEngine;

use crate::cursor::LineCursor;
use crate::directive::Directive;
use crate::error::AssembleError;
use crate::final_assemble::FinalAssemble;
use crate::processor::{Processor, ProcessorRegistry, RunContext};

/// Nesting depth guard; real data files stay in single digits.
const MAX_DEPTH: usize = 32;

/// Resolves one data file into its assembled form.
///
/// An assembler owns the run-scoped context (and with it the stash), so it
/// must not be reused across independent inputs; create one per run.
pub struct Assembler<'a> {
    registry: ProcessorRegistry,
    ctx: RunContext<'a>,
}

impl<'a> Assembler<'a> {
    /// Create an assembler with the default block registry.
    #[must_use]
    pub fn new(engine: &'a dyn UnionEngine) -> Self {
        Self::with_registry(engine, ProcessorRegistry::with_defaults())
    }

    /// Create an assembler with a custom block registry.
    #[must_use]
    pub fn with_registry(engine: &'a dyn UnionEngine, registry: ProcessorRegistry) -> Self {
        Self {
            registry,
            ctx: RunContext::new(engine),
        }
    }

    /// Resolve all nested blocks, returning the flat line sequence.
    ///
    /// Comment and blank lines are dropped; every block collapses to at most
    /// one line, spliced in at the position the block occupied; all other
    /// lines pass through untouched.
    pub fn preprocess(&mut self, cursor: &mut LineCursor<'_>) -> Result<Vec<String>, AssembleError> {
        let (lines, _) = self.resolve(cursor, 0)?;
        Ok(lines)
    }

    /// Run the full assembly: resolve blocks, then feed the flat sequence
    /// through the outermost finalize processor.
    ///
    /// Returns the single finalized pattern, or `None` when the input
    /// contributes nothing.
    pub fn run(&mut self, cursor: &mut LineCursor<'_>) -> Result<Option<String>, AssembleError> {
        let lines = self.preprocess(cursor)?;
        let mut outermost = FinalAssemble::new();
        for line in &lines {
            outermost.process_line(&mut self.ctx, line)?;
        }
        outermost.complete(&mut self.ctx)
    }

    /// Consume lines for one nesting level.
    ///
    /// Returns the resolved lines and whether the level was closed by an
    /// explicit end marker (as opposed to running out of input).
    fn resolve(
        &mut self,
        cursor: &mut LineCursor<'_>,
        depth: usize,
    ) -> Result<(Vec<String>, bool), AssembleError> {
        let mut lines = Vec::new();
        while let Some(line) = cursor.peek() {
            if line.trim().is_empty() {
                cursor.next();
                continue;
            }
            match Directive::parse(line) {
                Directive::Comment => {
                    cursor.next();
                }
                Directive::BlockStart { name, args } => {
                    cursor.next();
                    let produced = self.dispatch_block(cursor, name, &args, depth + 1)?;
                    lines.extend(produced);
                }
                Directive::BlockEnd => {
                    if depth == 0 {
                        return Err(AssembleError::UnmatchedEnd {
                            line: cursor.line_number() + 1,
                        });
                    }
                    cursor.next();
                    return Ok((lines, true));
                }
                _ => {
                    cursor.next();
                    lines.push(line.to_owned());
                }
            }
        }
        Ok((lines, false))
    }

    /// Run one named block: create its processor, resolve its lines
    /// (recursing into nested blocks), feed them through, and complete.
    fn dispatch_block(
        &mut self,
        cursor: &mut LineCursor<'_>,
        name: &str,
        args: &[&str],
        depth: usize,
    ) -> Result<Vec<String>, AssembleError> {
        if depth > MAX_DEPTH {
            return Err(AssembleError::NestingTooDeep { max: MAX_DEPTH });
        }
        tracing::debug!(name, depth, "entering block");
        let mut processor = self.registry.create(name, args)?;
        let (block_lines, closed) = self.resolve(cursor, depth)?;
        // Only the block directly under the outermost context may be closed
        // implicitly by the end of input; deeper blocks must close before
        // their enclosing block does.
        if !closed && depth > 1 {
            return Err(AssembleError::UnterminatedBlock {
                name: name.to_owned(),
            });
        }
        for line in &block_lines {
            processor.process_line(&mut self.ctx, line)?;
        }
        let result = processor.complete(&mut self.ctx)?;
        tracing::debug!(name, produced = result.is_some(), "leaving block");
        Ok(result.into_iter().collect())
    }
}
