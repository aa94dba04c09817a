#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lazyflush::config::log_level::LogLevel;
use lazyflush::flushing::FlushError;
use lazyflush::manager::{Manager, WriteContext};
use lazyflush::targets::{LazyFlushable, LogEntry, Target};

/// Flushable target that sleeps, then succeeds, fails or panics, and
/// remembers the context of every flush it served.
pub struct MockClient {
    name: String,
    delay: Duration,
    fail: bool,
    panics: bool,
    pub completed: AtomicUsize,
    pub contexts: Mutex<Vec<WriteContext>>,
}

impl MockClient {
    pub fn ok(name: &str) -> Arc<Self> {
        Self::build(name, Duration::ZERO, false)
    }

    pub fn delayed(name: &str, delay: Duration, fail: bool) -> Arc<Self> {
        Self::build(name, delay, fail)
    }

    pub fn panicking(name: &str) -> Arc<Self> {
        Arc::new(MockClient {
            panics: true,
            ..Self::plain(name, Duration::ZERO, false)
        })
    }

    fn build(name: &str, delay: Duration, fail: bool) -> Arc<Self> {
        Arc::new(Self::plain(name, delay, fail))
    }

    fn plain(name: &str, delay: Duration, fail: bool) -> Self {
        MockClient {
            name: name.to_string(),
            delay,
            fail,
            panics: false,
            completed: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn completions(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<WriteContext> {
        self.contexts.lock().unwrap().clone()
    }
}

impl Target for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, _context: &WriteContext, _entry: &LogEntry) {}

    fn as_lazy_flushable(self: Arc<Self>) -> Option<Arc<dyn LazyFlushable>> {
        Some(self)
    }
}

#[async_trait]
impl LazyFlushable for MockClient {
    fn client_name(&self) -> &str {
        &self.name
    }

    async fn lazy_flush(&self, context: &WriteContext) -> Result<(), FlushError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("{} crashed while flushing", self.name);
        }
        self.contexts.lock().unwrap().push(context.clone());
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FlushError::Sink(format!("{} rejected the batch", self.name)));
        }
        Ok(())
    }
}

/// A manager routing every level to `clients`, with one logger created so
/// the clients are resolved.
pub fn manager_with(clients: &[Arc<MockClient>]) -> Arc<Manager> {
    let builder = clients.iter().fold(Manager::builder(), |builder, client| {
        builder.target(LogLevel::Trace, client.clone())
    });
    let manager = builder.build();
    manager.logger("app");
    manager
}
