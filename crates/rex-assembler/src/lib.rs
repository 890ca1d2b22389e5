//! Directive-driven regex assembly pipeline.
//!
//! Turns a data file of literal pattern fragments and `##!` control markers
//! into a single minimized pattern. Nested `##!>`/`##!<` blocks are resolved
//! recursively, each block collapsing to at most one line; the actual set
//! union/minimization is delegated to an external engine through the
//! [`UnionEngine`](rex_engine::UnionEngine) trait.
//!
//! # Architecture
//!
//! - [`LineCursor`]: lookahead cursor over the input lines
//! - [`Directive`]: classification of one line against the marker grammar
//! - [`Assembler`]: nesting dispatcher, resolves blocks and splices results
//! - [`Assemble`]: leaf processor accumulating fragments and stash operations
//! - [`FinalAssemble`]: outermost processor adding flags, prefix/suffix and
//!   output normalization
//! - [`ProcessorRegistry`]: block name → processor constructor
//!
//! # Example
//!
//! ```ignore
//! use rex_assembler::{Assembler, LineCursor};
//! use rex_engine::CommandEngine;
//!
//! let engine = CommandEngine::default();
//! let mut assembler = Assembler::new(&engine);
//! let mut cursor = LineCursor::new("a\nb\n");
//! let pattern = assembler.run(&mut cursor)?;
//! ```

mod assemble;
mod assembler;
mod cursor;
mod directive;
mod error;
mod final_assemble;
mod processor;

pub use assemble::Assemble;
pub use assembler::Assembler;
pub use cursor::LineCursor;
pub use directive::Directive;
pub use error::AssembleError;
pub use final_assemble::FinalAssemble;
pub use processor::{Processor, ProcessorFactory, ProcessorRegistry, RunContext};

#[cfg(test)]
pub(crate) mod testing;
