//! Error types for the insert engine.

use thiserror::Error;

/// Errors raised by the engine itself.
///
/// A failing [`Executor`](crate::Executor) call is not an error: it is retried.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A worker task panicked or was aborted before reporting.
    #[error("Worker {worker} of batch '{batch}' did not finish: {reason}")]
    WorkerPanicked {
        batch: String,
        worker: usize,
        reason: String,
    },
}
