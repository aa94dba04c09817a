use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::config::log_level::LogLevel;
use crate::manager::WriteContext;
use crate::targets::{LogEntry, Target};

/// A target wired to a logger together with the least severe level it accepts.
#[derive(Clone)]
pub(crate) struct Route {
    pub(crate) threshold: LogLevel,
    pub(crate) target: Arc<dyn Target>,
}

/// Named entry point that fans entries out to the targets of its manager.
pub struct Logger {
    name: String,
    context: WriteContext,
    routes: Vec<Route>,
    sequence: AtomicU64,
}

impl Logger {
    pub(crate) fn new(name: String, context: WriteContext, routes: Vec<Route>) -> Self {
        Logger {
            name,
            context,
            routes,
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved targets of this logger, regardless of level.
    #[must_use]
    pub fn targets(&self) -> Vec<Arc<dyn Target>> {
        self.routes.iter().map(|r| Arc::clone(&r.target)).collect()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let mut admitted = self
            .routes
            .iter()
            .filter(|r| r.threshold.admits(level))
            .peekable();
        if admitted.peek().is_none() {
            return;
        }
        let entry = LogEntry {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            level,
            logger: self.name.clone(),
            message: message.into(),
        };
        for route in admitted {
            route.target.write(&self.context, &entry);
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("targets", &self.routes.len())
            .finish_non_exhaustive()
    }
}
