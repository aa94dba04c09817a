//! Process-level view of the flush coordinators and the hook that drains
//! them before the host suspends or terminates.

mod process_registry;
mod signals;
mod suspension;

use std::time::Duration;

use async_trait::async_trait;

pub use process_registry::ProcessRegistry;
pub use signals::OsSignals;
pub use suspension::SuspensionBridge;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuspensionSettings {
    /// Bound on each client's flush once the host suspends.
    pub flush_timeout: Duration,
    /// Bound on the whole suspension flush.
    pub shutdown_timeout: Duration,
}

impl Default for SuspensionSettings {
    fn default() -> Self {
        SuspensionSettings {
            flush_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Tells the bridge the host is about to suspend or terminate.
#[async_trait]
pub trait LifecycleSignal: Send + Sync {
    /// Completes when the host is going away.
    async fn suspending(&self);
}
