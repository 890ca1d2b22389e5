//! Assembly error types.

use rex_engine::EngineError;

/// Fault raised while assembling a data file.
///
/// Every fault is fatal to the whole run; nothing is retried and no partial
/// output is produced.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// `##!<` with no open block.
    #[error("unmatched block end marker at line {line}")]
    UnmatchedEnd {
        /// 1-indexed input line of the stray marker.
        line: usize,
    },

    /// A nested block was still open when the input ended.
    #[error("block '{name}' not terminated before end of input")]
    UnterminatedBlock {
        /// Name of the unterminated block.
        name: String,
    },

    /// Nesting recursion guard tripped.
    #[error("block nesting deeper than {max} levels")]
    NestingTooDeep {
        /// Configured depth limit.
        max: usize,
    },

    /// Store directive without an identifier.
    #[error("store directive is missing an identifier")]
    MissingIdentifier,

    /// Recall of an identifier that was never stored.
    #[error("recall of unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// `##!>` names a processor that is not registered.
    #[error("unknown block processor '{0}'")]
    UnknownProcessor(String),

    /// Union engine failure.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
