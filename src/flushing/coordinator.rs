use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::DEFAULT_FLUSH_INTERVAL_MS;
use crate::flushing::FlushError;
use crate::flushing::registry::ClientRegistry;
use crate::flushing::report::{ClientOutcome, SweepReport};
use crate::manager::{LogManager, Logger, LoggerListener, ManagerId, WriteContext};
use crate::targets::LazyFlushable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushSettings {
    /// Period of the background sweep, `None` disables the timer.
    pub interval: Option<Duration>,
}

impl Default for FlushSettings {
    fn default() -> Self {
        FlushSettings {
            interval: Some(Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS)),
        }
    }
}

/// Keeps track of the flushable targets of one logging manager and drains
/// them, on a timer and on demand.
///
/// The registry lock is only held to add a client or copy the client list;
/// flushes run on the copy, so a slow target never blocks registration.
pub struct FlushCoordinator {
    manager: Weak<dyn LogManager>,
    manager_id: ManagerId,
    clients: Mutex<ClientRegistry>,
    cancel: CancellationToken,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl FlushCoordinator {
    /// Creates the coordinator for `manager`, subscribes it to logger
    /// creation and starts the periodic sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<M: LogManager + 'static>(manager: &Arc<M>, settings: FlushSettings) -> Arc<Self> {
        let weak_manager = Arc::downgrade(manager);
        let weak_manager: Weak<dyn LogManager> = weak_manager;
        let coordinator = Arc::new(FlushCoordinator {
            manager: weak_manager,
            manager_id: manager.id(),
            clients: Mutex::new(ClientRegistry::new()),
            cancel: CancellationToken::new(),
            timer: Mutex::new(None),
        });

        let listener = Arc::downgrade(&coordinator);
        manager.add_listener(listener);

        if let Some(period) = settings.interval {
            let handle = spawn_timer(
                Arc::downgrade(&coordinator),
                period,
                coordinator.cancel.clone(),
            );
            *coordinator
                .timer
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(handle);
            debug!(
                "LAZY_FLUSH | {} periodic flush every {}ms",
                coordinator.manager_id,
                period.as_millis()
            );
        }

        coordinator
    }

    #[must_use]
    pub fn manager_id(&self) -> ManagerId {
        self.manager_id
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.lock_clients().len()
    }

    /// Returns `true` while the periodic sweep is scheduled.
    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stops the periodic sweep. On-demand flushes keep working.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn lock_clients(&self) -> std::sync::MutexGuard<'_, ClientRegistry> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<dyn LazyFlushable>> {
        self.lock_clients().snapshot()
    }

    fn owner_context(&self) -> Option<WriteContext> {
        self.manager.upgrade().map(|m| m.write_context())
    }

    /// Flushes every client registered when the call starts and waits for all
    /// of them.
    ///
    /// Each client runs in its own task, bounded by `client_timeout` when
    /// given. A failing, hanging or panicking client only affects its own
    /// outcome.
    pub async fn flush_now(
        &self,
        context: &WriteContext,
        client_timeout: Option<Duration>,
    ) -> SweepReport {
        let clients = self.snapshot();
        if clients.is_empty() {
            return SweepReport::default();
        }

        let started = Instant::now();
        debug!(
            "LAZY_FLUSH | {} flushing {} clients",
            self.manager_id,
            clients.len()
        );

        let mut pending: Vec<String> = Vec::with_capacity(clients.len());
        let mut joinset = JoinSet::new();
        for client in clients {
            pending.push(client.client_name().to_string());
            joinset.spawn(flush_client(client, context.clone(), client_timeout));
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        let mut aborted = Vec::new();
        while let Some(result) = joinset.join_next().await {
            match result {
                Ok(outcome) => {
                    if let Some(pos) = pending.iter().position(|n| *n == outcome.client) {
                        pending.swap_remove(pos);
                    }
                    if let Err(e) = &outcome.result {
                        warn!(
                            "LAZY_FLUSH | {} client {} failed to flush: {e}",
                            self.manager_id, outcome.client
                        );
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    error!("LAZY_FLUSH | {} flush task error {e:?}", self.manager_id);
                    aborted.push(e.to_string());
                }
            }
        }
        // whatever is still pending belongs to a task that never returned
        for (client, reason) in pending.into_iter().zip(aborted) {
            outcomes.push(ClientOutcome {
                client,
                result: Err(FlushError::Aborted(reason)),
                elapsed: started.elapsed(),
            });
        }

        SweepReport {
            outcomes,
            elapsed: started.elapsed(),
        }
    }

    /// [`Self::flush_now`] with a write context from this coordinator's own
    /// manager. Nothing is flushed once the manager is gone.
    pub async fn flush_owned(&self, client_timeout: Option<Duration>) -> SweepReport {
        let Some(context) = self.owner_context() else {
            debug!(
                "LAZY_FLUSH | {} manager dropped, skipping flush",
                self.manager_id
            );
            return SweepReport::default();
        };
        self.flush_now(&context, client_timeout).await
    }

    /// Timer callback: one unbounded sweep, failures only reported.
    pub async fn run_scheduled_flush(&self) {
        let report = self.flush_owned(None).await;
        if report.invoked() == 0 {
            return;
        }
        let failed = report.failures().count();
        if failed > 0 {
            warn!(
                "LAZY_FLUSH | {} scheduled flush: {failed} of {} clients failed",
                self.manager_id,
                report.invoked()
            );
        } else {
            debug!(
                "LAZY_FLUSH | {} scheduled flush of {} clients in {}ms",
                self.manager_id,
                report.invoked(),
                report.elapsed.as_millis()
            );
        }
    }
}

impl LoggerListener for FlushCoordinator {
    fn on_logger_created(&self, logger: &Arc<Logger>) {
        let flushable: Vec<Arc<dyn LazyFlushable>> = logger
            .targets()
            .into_iter()
            .filter_map(|t| t.as_lazy_flushable())
            .collect();
        if flushable.is_empty() {
            return;
        }

        let added: Vec<String> = {
            let mut clients = self.lock_clients();
            flushable
                .into_iter()
                .filter_map(|client| {
                    let name = client.client_name().to_string();
                    clients.add(client).then_some(name)
                })
                .collect()
        };
        for name in added {
            debug!(
                "LAZY_FLUSH | {} registered client {} from logger {}",
                self.manager_id,
                name,
                logger.name()
            );
        }
    }
}

impl Drop for FlushCoordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for FlushCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushCoordinator")
            .field("manager_id", &self.manager_id)
            .field("clients", &*self.lock_clients())
            .finish_non_exhaustive()
    }
}

async fn flush_client(
    client: Arc<dyn LazyFlushable>,
    context: WriteContext,
    timeout: Option<Duration>,
) -> ClientOutcome {
    let started = Instant::now();
    let flush = client.lazy_flush(&context);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, flush)
            .await
            .unwrap_or(Err(FlushError::Timeout(limit))),
        None => flush.await,
    };
    ClientOutcome {
        client: client.client_name().to_string(),
        result,
        elapsed: started.elapsed(),
    }
}

fn spawn_timer(
    coordinator: Weak<FlushCoordinator>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await; // discard first tick, which is instantaneous
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let Some(coordinator) = coordinator.upgrade() else {
                        break;
                    };
                    coordinator.run_scheduled_flush().await;
                }
            }
        }
        debug!("LAZY_FLUSH | periodic flush stopped");
    })
}
