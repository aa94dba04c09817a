use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::flushing::FlushError;
use crate::manager::WriteContext;
use crate::targets::{LazyFlushable, LogEntry, Target};

/// Where a buffered target hands its entries when drained.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write_batch(&self, context: &WriteContext, lines: &[String])
    -> Result<(), FlushError>;
}

/// Appends drained batches to a file, one JSON line per entry.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write_batch(
        &self,
        _context: &WriteContext,
        lines: &[String],
    ) -> Result<(), FlushError> {
        let mut payload = lines.join("\n");
        payload.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps serialized entries in memory and drains them into a [`Sink`] on
/// every lazy flush.
///
/// The buffer is bounded: once `capacity` entries are waiting the oldest are
/// dropped. A batch the sink rejects, or a flush cancelled before the sink
/// accepted it, is put back in front of newer entries so the next sweep
/// retries it.
pub struct BufferedTarget<S> {
    name: String,
    capacity: usize,
    buffer: Mutex<VecDeque<String>>,
    dropped: AtomicU64,
    sink: S,
}

impl<S: Sink + 'static> BufferedTarget<S> {
    #[must_use]
    pub fn new(name: impl Into<String>, sink: S, capacity: usize) -> Self {
        BufferedTarget {
            name: name.into(),
            capacity: capacity.max(1),
            buffer: Mutex::new(VecDeque::new()),
            dropped: AtomicU64::new(0),
            sink,
        }
    }

    /// Entries currently waiting for a flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Entries discarded because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn trim(&self, buffer: &mut VecDeque<String>) {
        while buffer.len() > self.capacity {
            buffer.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn requeue(&self, batch: Vec<String>) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        for line in batch.into_iter().rev() {
            buffer.push_front(line);
        }
        self.trim(&mut buffer);
    }
}

impl<S: Sink + 'static> Target for BufferedTarget<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, context: &WriteContext, entry: &LogEntry) {
        let line = entry.to_json_line(context);
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.push_back(line);
        self.trim(&mut buffer);
    }

    fn as_lazy_flushable(self: Arc<Self>) -> Option<Arc<dyn LazyFlushable>> {
        Some(self)
    }
}

#[async_trait]
impl<S: Sink + 'static> LazyFlushable for BufferedTarget<S> {
    fn client_name(&self) -> &str {
        &self.name
    }

    async fn lazy_flush(&self, context: &WriteContext) -> Result<(), FlushError> {
        let batch: Vec<String> = {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            buffer.drain(..).collect()
        };
        if batch.is_empty() {
            return Ok(());
        }

        debug!("BUFFERED_TARGET | {} draining {} entries", self.name, batch.len());
        // put back unless the sink took it, also when this future is dropped
        let mut pending = PendingBatch {
            target: self,
            lines: Some(batch),
        };
        let result = self.sink.write_batch(context, pending.lines()).await;
        match result {
            Ok(()) => {
                pending.lines = None;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "BUFFERED_TARGET | {} failed to drain, keeping {} entries: {e}",
                    self.name,
                    pending.lines().len()
                );
                Err(e)
            }
        }
    }
}

/// A drained batch not yet accepted by the sink.
struct PendingBatch<'a, S: Sink + 'static> {
    target: &'a BufferedTarget<S>,
    lines: Option<Vec<String>>,
}

impl<S: Sink + 'static> PendingBatch<'_, S> {
    fn lines(&self) -> &[String] {
        self.lines.as_deref().unwrap_or_default()
    }
}

impl<S: Sink + 'static> Drop for PendingBatch<'_, S> {
    fn drop(&mut self) {
        if let Some(lines) = self.lines.take() {
            debug!(
                "BUFFERED_TARGET | {} requeued {} entries",
                self.target.name,
                lines.len()
            );
            self.target.requeue(lines);
        }
    }
}

impl<S> std::fmt::Debug for BufferedTarget<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedTarget")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
