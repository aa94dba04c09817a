use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::debug;

use crate::config::log_level::LogLevel;
use crate::manager::logger::{Logger, Route};
use crate::manager::{LogManager, LoggerListener, ManagerId, WriteContext};
use crate::targets::Target;

#[derive(Default)]
pub struct ManagerBuilder {
    session_id: Option<String>,
    routes: Vec<Route>,
}

impl ManagerBuilder {
    /// Wires `target` to every logger, accepting entries at `threshold` or
    /// more severe.
    #[must_use]
    pub fn target(mut self, threshold: LogLevel, target: Arc<dyn Target>) -> Self {
        self.routes.push(Route { threshold, target });
        self
    }

    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<Manager> {
        let id = ManagerId::next();
        let session_id = self
            .session_id
            .unwrap_or_else(|| format!("{}-{}", std::process::id(), id.as_u64()));
        Arc::new(Manager {
            id,
            session_id,
            state: Mutex::new(ManagerState {
                routes: self.routes,
                ..ManagerState::default()
            }),
        })
    }
}

#[derive(Default)]
struct ManagerState {
    routes: Vec<Route>,
    loggers: HashMap<String, Arc<Logger>>,
    listeners: Vec<Weak<dyn LoggerListener>>,
}

/// Minimal logging manager: hands out named loggers sharing one set of
/// routes and tells its listeners about every logger it creates.
///
/// A logger resolves its targets when created; routes added later only apply
/// to loggers created after them.
pub struct Manager {
    id: ManagerId,
    session_id: String,
    state: Mutex<ManagerState>,
}

impl Manager {
    #[must_use]
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::default()
    }

    /// Returns the logger called `name`, creating it on first use.
    ///
    /// Listeners have seen a new logger by the time this returns.
    pub fn logger(&self, name: &str) -> Arc<Logger> {
        let (logger, listeners) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = state.loggers.get(name) {
                return Arc::clone(existing);
            }
            let logger = Arc::new(Logger::new(
                name.to_string(),
                self.write_context(),
                state.routes.clone(),
            ));
            state.loggers.insert(name.to_string(), Arc::clone(&logger));
            state.listeners.retain(|l| l.strong_count() > 0);
            (logger, state.listeners.clone())
        };

        debug!("MANAGER | {} created logger {}", self.id, name);
        for listener in listeners.iter().filter_map(Weak::upgrade) {
            listener.on_logger_created(&logger);
        }
        logger
    }

    /// Wires `target` to loggers created from now on.
    pub fn add_target(&self, threshold: LogLevel, target: Arc<dyn Target>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.routes.push(Route { threshold, target });
    }
}

impl LogManager for Manager {
    fn id(&self) -> ManagerId {
        self.id
    }

    fn write_context(&self) -> WriteContext {
        WriteContext {
            manager_id: self.id,
            session_id: self.session_id.clone(),
            process_id: std::process::id(),
        }
    }

    fn add_listener(&self, listener: Weak<dyn LoggerListener>) {
        let existing: Vec<Arc<Logger>> = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.listeners.push(listener.clone());
            state.loggers.values().cloned().collect()
        };
        if let Some(listener) = listener.upgrade() {
            for logger in &existing {
                listener.on_logger_created(logger);
            }
        }
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("id", &self.id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::LogEntry;

    #[derive(Default)]
    struct Recording {
        entries: Mutex<Vec<(WriteContext, LogEntry)>>,
    }

    impl Target for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn write(&self, context: &WriteContext, entry: &LogEntry) {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((context.clone(), entry.clone()));
        }
    }

    #[derive(Default)]
    struct CountingListener {
        seen: Mutex<Vec<String>>,
    }

    impl LoggerListener for CountingListener {
        fn on_logger_created(&self, logger: &Arc<Logger>) {
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(logger.name().to_string());
        }
    }

    #[test]
    fn logger_is_created_once_per_name() {
        let manager = Manager::builder().build();
        let a = manager.logger("app");
        let b = manager.logger("app");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn listeners_see_new_and_existing_loggers() {
        let manager = Manager::builder().build();
        manager.logger("early");

        let listener = Arc::new(CountingListener::default());
        let weak = Arc::downgrade(&listener);
        manager.add_listener(weak);
        manager.logger("late");
        manager.logger("late");

        let seen = listener.seen.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(*seen, vec!["early".to_string(), "late".to_string()]);
    }

    #[test]
    fn routes_filter_by_threshold() {
        let errors_only = Arc::new(Recording::default());
        let everything = Arc::new(Recording::default());
        let manager = Manager::builder()
            .session_id("session")
            .target(LogLevel::Error, errors_only.clone())
            .target(LogLevel::Trace, everything.clone())
            .build();

        let logger = manager.logger("app");
        logger.info("hello");
        logger.error("boom");

        let everything = everything.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let errors_only = errors_only.entries.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(everything.len(), 2);
        assert_eq!(errors_only.len(), 1);
        assert_eq!(errors_only[0].1.message, "boom");
        assert_eq!(errors_only[0].0.session_id, "session");
        assert_eq!(errors_only[0].0.manager_id, manager.id());
    }

    #[test]
    fn added_targets_apply_to_new_loggers_only() {
        let manager = Manager::builder().build();
        let before = manager.logger("before");
        manager.add_target(LogLevel::Info, Arc::new(Recording::default()));
        let after = manager.logger("after");

        assert!(before.targets().is_empty());
        assert_eq!(after.targets().len(), 1);
    }
}
