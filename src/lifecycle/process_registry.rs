use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::flushing::{FlushAllReport, FlushCoordinator, FlushSettings};
use crate::lifecycle::SuspensionBridge;
use crate::manager::{LogManager, ManagerId};

/// Every flush coordinator of the process, keyed by the manager it serves.
///
/// Created once by the host and shared as an `Arc`. Registering the first
/// manager arms the attached [`SuspensionBridge`].
pub struct ProcessRegistry {
    settings: FlushSettings,
    coordinators: Mutex<HashMap<ManagerId, Arc<FlushCoordinator>>>,
    bridge: Option<Arc<SuspensionBridge>>,
}

impl ProcessRegistry {
    #[must_use]
    pub fn new(settings: FlushSettings) -> Arc<Self> {
        Arc::new(ProcessRegistry {
            settings,
            coordinators: Mutex::new(HashMap::new()),
            bridge: None,
        })
    }

    #[must_use]
    pub fn with_bridge(settings: FlushSettings, bridge: Arc<SuspensionBridge>) -> Arc<Self> {
        Arc::new(ProcessRegistry {
            settings,
            coordinators: Mutex::new(HashMap::new()),
            bridge: Some(bridge),
        })
    }

    /// Starts a coordinator for `manager` and keeps it for [`Self::flush_all`].
    ///
    /// A manager registered again gets a fresh coordinator; the previous one
    /// stops its timer.
    pub fn register<M: LogManager + 'static>(
        self: &Arc<Self>,
        manager: &Arc<M>,
    ) -> Arc<FlushCoordinator> {
        let coordinator = FlushCoordinator::start(manager, self.settings);
        let id = coordinator.manager_id();

        let replaced = self
            .lock_coordinators()
            .insert(id, Arc::clone(&coordinator));
        if let Some(previous) = replaced {
            warn!("PROCESS_REGISTRY | {id} registered twice, replacing its coordinator");
            previous.stop();
        } else {
            debug!("PROCESS_REGISTRY | registered {id}");
        }

        if let Some(bridge) = &self.bridge {
            if bridge.ensure_subscribed(self) {
                debug!("PROCESS_REGISTRY | suspension hook armed");
            }
        }
        coordinator
    }

    #[must_use]
    pub fn coordinator(&self, id: ManagerId) -> Option<Arc<FlushCoordinator>> {
        self.lock_coordinators().get(&id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_coordinators().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_coordinators().is_empty()
    }

    /// Flushes every registered coordinator concurrently, each with its own
    /// manager's context, and waits for all of them.
    pub async fn flush_all(&self, client_timeout: Option<Duration>) -> FlushAllReport {
        let mut coordinators: Vec<(ManagerId, Arc<FlushCoordinator>)> = self
            .lock_coordinators()
            .iter()
            .map(|(id, c)| (*id, Arc::clone(c)))
            .collect();
        coordinators.sort_by_key(|(id, _)| *id);

        let sweeps = join_all(coordinators.into_iter().map(|(id, coordinator)| async move {
            (id, coordinator.flush_owned(client_timeout).await)
        }))
        .await;

        let report = FlushAllReport { sweeps };
        debug!(
            "PROCESS_REGISTRY | flushed {} clients, {} failed",
            report.invoked(),
            report.failed()
        );
        report
    }

    fn lock_coordinators(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ManagerId, Arc<FlushCoordinator>>> {
        self.coordinators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("settings", &self.settings)
            .field("coordinators", &self.len())
            .field("bridge", &self.bridge.is_some())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::config::log_level::LogLevel;
    use crate::flushing::FlushError;
    use crate::manager::{Manager, WriteContext};
    use crate::targets::{LazyFlushable, LogEntry, Target};

    /// Remembers the manager of every context it was flushed with.
    #[derive(Default)]
    struct ContextProbe {
        seen: Mutex<Vec<ManagerId>>,
        flushes: AtomicUsize,
    }

    impl Target for ContextProbe {
        fn name(&self) -> &str {
            "context-probe"
        }

        fn write(&self, _context: &WriteContext, _entry: &LogEntry) {}

        fn as_lazy_flushable(self: Arc<Self>) -> Option<Arc<dyn LazyFlushable>> {
            Some(self)
        }
    }

    #[async_trait]
    impl LazyFlushable for ContextProbe {
        fn client_name(&self) -> &str {
            "context-probe"
        }

        async fn lazy_flush(&self, context: &WriteContext) -> Result<(), FlushError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(context.manager_id);
            Ok(())
        }
    }

    fn manager_with(probe: &Arc<ContextProbe>) -> Arc<Manager> {
        let manager = Manager::builder()
            .target(LogLevel::Info, probe.clone())
            .build();
        manager.logger("app");
        manager
    }

    const NO_TIMER: FlushSettings = FlushSettings { interval: None };

    #[tokio::test]
    async fn test_empty_registry_flush_all() {
        let registry = ProcessRegistry::new(NO_TIMER);
        let report = registry.flush_all(None).await;
        assert!(registry.is_empty());
        assert_eq!(report.invoked(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_flush_all_uses_each_managers_context() {
        let registry = ProcessRegistry::new(NO_TIMER);
        let probe_a = Arc::new(ContextProbe::default());
        let probe_b = Arc::new(ContextProbe::default());
        let manager_a = manager_with(&probe_a);
        let manager_b = manager_with(&probe_b);
        registry.register(&manager_a);
        registry.register(&manager_b);

        let report = registry.flush_all(None).await;

        assert_eq!(registry.len(), 2);
        assert_eq!(report.invoked(), 2);
        assert_eq!(*probe_a.seen.lock().unwrap(), vec![manager_a.id()]);
        assert_eq!(*probe_b.seen.lock().unwrap(), vec![manager_b.id()]);
        assert!(report.sweep(manager_a.id()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_twice_replaces_coordinator() {
        let registry = ProcessRegistry::new(FlushSettings {
            interval: Some(Duration::from_secs(1)),
        });
        let probe = Arc::new(ContextProbe::default());
        let manager = manager_with(&probe);

        let first = registry.register(&manager);
        let second = registry.register(&manager);

        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(
            &registry.coordinator(manager.id()).unwrap(),
            &second
        ));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!first.is_timer_running());
        assert!(second.is_timer_running());
        // only the live coordinator's timer flushed
        assert_eq!(probe.flushes.load(Ordering::SeqCst), 1);
    }
}
