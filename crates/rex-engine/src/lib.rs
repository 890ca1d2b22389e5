//! Union engine client.
//!
//! The union engine is an external process that reads one regular expression
//! per input line and prints a single minimized expression matching their
//! union. This crate hides the process behind the [`UnionEngine`] trait so
//! the assembly pipeline never depends on a concrete backend and tests can
//! substitute a double.
//!
//! The subprocess backend is [`CommandEngine`].

mod command;
mod error;

pub use command::{CommandEngine, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
pub use error::EngineError;

/// Computes the minimized union of a list of expressions.
pub trait UnionEngine {
    /// Submit `inputs` and return the single minimized union expression.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the engine cannot be reached, reports a
    /// failure, or exceeds its wait budget. No failure is retried.
    fn union(&self, inputs: &[String]) -> Result<String, EngineError>;
}
