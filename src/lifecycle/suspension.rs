use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::lifecycle::{LifecycleSignal, ProcessRegistry, SuspensionSettings};

enum BridgeState {
    Unsubscribed(Box<dyn LifecycleSignal>),
    Subscribed(Weak<ProcessRegistry>),
}

/// Flushes every registered coordinator once the host signals it is going
/// away, then lets the host know it may exit.
///
/// Dormant until [`Self::ensure_subscribed`] is called, which the
/// [`ProcessRegistry`] does on its first registration. A bridge serves the
/// one registry that armed it; attaching it to a second registry has no
/// effect beyond a warning.
pub struct SuspensionBridge {
    settings: SuspensionSettings,
    state: Mutex<BridgeState>,
    flushed: watch::Sender<bool>,
}

impl SuspensionBridge {
    #[must_use]
    pub fn new(signal: impl LifecycleSignal + 'static, settings: SuspensionSettings) -> Arc<Self> {
        let (flushed, _) = watch::channel(false);
        Arc::new(SuspensionBridge {
            settings,
            state: Mutex::new(BridgeState::Unsubscribed(Box::new(signal))),
            flushed,
        })
    }

    /// Starts listening for the lifecycle signal on behalf of `registry`.
    ///
    /// Only the first call subscribes and returns `true`.
    pub fn ensure_subscribed(self: &Arc<Self>, registry: &Arc<ProcessRegistry>) -> bool {
        let served = Arc::downgrade(registry);
        let signal = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let BridgeState::Subscribed(current) = &*state {
                if !current.ptr_eq(&served) {
                    warn!("SUSPENSION | bridge already serves another registry, ignoring");
                }
                return false;
            }
            match std::mem::replace(&mut *state, BridgeState::Subscribed(served.clone())) {
                BridgeState::Unsubscribed(signal) => signal,
                BridgeState::Subscribed(_) => return false,
            }
        };

        tokio::spawn(Arc::clone(self).run(signal, served));
        debug!("SUSPENSION | subscribed to lifecycle signal");
        true
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            BridgeState::Subscribed(_)
        )
    }

    /// Returns `true` if `registry` is the one flushed on suspension.
    #[must_use]
    pub fn serves(&self, registry: &Arc<ProcessRegistry>) -> bool {
        match &*self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            BridgeState::Subscribed(current) => {
                std::ptr::eq(current.as_ptr(), Arc::as_ptr(registry))
            }
            BridgeState::Unsubscribed(_) => false,
        }
    }

    /// Returns `true` once the suspension flush is over.
    #[must_use]
    pub fn has_flushed(&self) -> bool {
        *self.flushed.borrow()
    }

    /// Waits until the suspension flush completed or gave up.
    ///
    /// Never resolves if the bridge is not subscribed or the signal never
    /// arrives.
    pub async fn flushed(&self) {
        let mut rx = self.flushed.subscribe();
        if rx.wait_for(|done| *done).await.is_err() {
            error!("SUSPENSION | completion channel closed");
        }
    }

    async fn run(self: Arc<Self>, signal: Box<dyn LifecycleSignal>, registry: Weak<ProcessRegistry>) {
        signal.suspending().await;
        info!("SUSPENSION | host is suspending, flushing buffered logs");

        match registry.upgrade() {
            Some(registry) => {
                let flush = registry.flush_all(Some(self.settings.flush_timeout));
                match tokio::time::timeout(self.settings.shutdown_timeout, flush).await {
                    Ok(report) if report.failed() > 0 => warn!(
                        "SUSPENSION | {} of {} clients failed to flush",
                        report.failed(),
                        report.invoked()
                    ),
                    Ok(report) => info!("SUSPENSION | flushed {} clients", report.invoked()),
                    Err(_) => warn!(
                        "SUSPENSION | flush did not finish within {}ms, giving up",
                        self.settings.shutdown_timeout.as_millis()
                    ),
                }
            }
            None => debug!("SUSPENSION | registry dropped, nothing to flush"),
        }

        self.flushed.send_replace(true);
    }
}

impl std::fmt::Debug for SuspensionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuspensionBridge")
            .field("settings", &self.settings)
            .field("subscribed", &self.is_subscribed())
            .field("flushed", &self.has_flushed())
            .finish()
    }
}
