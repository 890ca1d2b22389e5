//! Processor interface and block registry.

use std::collections::HashMap;

use rex_engine::UnionEngine;

use crate::assemble::Assemble;
use crate::error::AssembleError;

/// Run-scoped state threaded through every processor call.
///
/// Owns the stash shared by store/recall directives for the lifetime of one
/// dispatcher run. A context is never reused across runs, so independent
/// runs cannot leak stored expressions into each other.
pub struct RunContext<'a> {
    pub(crate) stash: HashMap<String, String>,
    pub(crate) engine: &'a dyn UnionEngine,
}

impl<'a> RunContext<'a> {
    /// Create a fresh context around `engine`.
    #[must_use]
    pub fn new(engine: &'a dyn UnionEngine) -> Self {
        Self {
            stash: HashMap::new(),
            engine,
        }
    }
}

/// A processor consumes the lines of one block and yields at most one line.
///
/// The dispatcher depends only on this interface; concrete processors are
/// reached through the [`ProcessorRegistry`].
pub trait Processor: std::fmt::Debug {
    /// Feed one input line.
    fn process_line(
        &mut self,
        ctx: &mut RunContext<'_>,
        line: &str,
    ) -> Result<(), AssembleError>;

    /// Finish the block, returning its result line if any.
    fn complete(&mut self, ctx: &mut RunContext<'_>) -> Result<Option<String>, AssembleError>;
}

/// Constructor for a named block processor.
///
/// `args` carries the words following the block name on the `##!>` line.
pub type ProcessorFactory = fn(args: &[&str]) -> Box<dyn Processor>;

/// Registry mapping block names to processor constructors.
///
/// Adding a block type means registering a constructor here; the dispatcher
/// never matches on concrete processor types.
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// Registry with the built-in block types.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("assemble", |_args| Box::new(Assemble::new()));
        registry
    }

    /// Register a processor constructor under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: ProcessorFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Construct the processor registered under `name`.
    pub(crate) fn create(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<Box<dyn Processor>, AssembleError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| AssembleError::UnknownProcessor(name.to_owned()))?;
        Ok(factory(args))
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
