//! Engine error types.

use std::io;
use std::string::FromUtf8Error;
use std::time::Duration;

/// Union engine failure.
///
/// Every variant is fatal to the surrounding run; the caller reports the
/// diagnostic and aborts.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine binary could not be started.
    #[error("failed to start union engine '{program}': {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },

    /// The engine exceeded its wait budget and was killed.
    #[error("union engine timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The engine wrote to its error stream. Treated as failure regardless
    /// of exit status.
    #[error("union engine failed: {stderr}")]
    Failed {
        /// Captured error stream output.
        stderr: String,
    },

    /// I/O error while communicating with the engine.
    #[error("union engine I/O error: {0}")]
    Io(#[from] io::Error),

    /// The engine produced output that is not valid UTF-8.
    #[error("union engine produced invalid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}
