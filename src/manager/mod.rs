//! Contracts the flush coordination consumes from a logging manager, plus a
//! minimal manager implementing them.

mod log_manager;
mod logger;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

pub use log_manager::{Manager, ManagerBuilder};
pub use logger::Logger;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a logging manager instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(u64);

impl ManagerId {
    #[must_use]
    pub fn next() -> Self {
        ManagerId(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manager-{}", self.0)
    }
}

/// Ambient values a manager hands to its targets on every write and flush.
///
/// The coordination layer never inspects it, it only passes it through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteContext {
    pub manager_id: ManagerId,
    pub session_id: String,
    pub process_id: u32,
}

/// Receives loggers as their owning manager creates them.
pub trait LoggerListener: Send + Sync {
    fn on_logger_created(&self, logger: &Arc<Logger>);
}

/// What a flush coordinator needs from its logging manager.
pub trait LogManager: Send + Sync {
    fn id(&self) -> ManagerId;

    fn write_context(&self) -> WriteContext;

    /// Registers `listener` for logger creations. Loggers that already exist
    /// are delivered to it before this returns.
    fn add_listener(&self, listener: Weak<dyn LoggerListener>);
}
