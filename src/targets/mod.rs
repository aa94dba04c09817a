//! Log targets and the capability of being flushed lazily.

mod buffered;
mod console;
mod entry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::flushing::FlushError;
use crate::manager::WriteContext;

pub use buffered::{BufferedTarget, FileSink, Sink};
pub use console::ConsoleTarget;
pub use entry::LogEntry;

/// A destination for log entries.
pub trait Target: Send + Sync {
    fn name(&self) -> &str;

    /// Accepts one entry. Must not block on I/O for buffering targets.
    fn write(&self, context: &WriteContext, entry: &LogEntry);

    /// Capability query: the flushable view of this target, if it buffers.
    fn as_lazy_flushable(self: Arc<Self>) -> Option<Arc<dyn LazyFlushable>> {
        None
    }
}

/// A target that keeps entries in memory until told to drain them.
///
/// Implementations own the synchronisation between appending and draining,
/// so `lazy_flush` may run while writes to the same target are in progress.
/// Draining an empty buffer is a successful no-op.
#[async_trait]
pub trait LazyFlushable: Send + Sync {
    /// Name used when reporting the outcome of a flush.
    fn client_name(&self) -> &str;

    async fn lazy_flush(&self, context: &WriteContext) -> Result<(), FlushError>;
}
