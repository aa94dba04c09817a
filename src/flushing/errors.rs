//! Error types for `flushing` module

use std::time::Duration;

/// Failure of a single client flush.
///
/// These never escape a sweep: they end up in the [`super::SweepReport`].
#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The client did not finish within the bound of the sweep.
    #[error("flush timed out after {0:?}")]
    Timeout(Duration),
    /// The sink behind the target rejected the batch.
    #[error("sink failure: {0}")]
    Sink(String),
    /// The flush task panicked or was cancelled before finishing.
    #[error("flush task aborted: {0}")]
    Aborted(String),
}
