//! Outcomes of flush sweeps.

use std::time::Duration;

use crate::flushing::FlushError;
use crate::manager::ManagerId;

/// Result of flushing a single client.
#[derive(Debug)]
pub struct ClientOutcome {
    pub client: String,
    pub result: Result<(), FlushError>,
    pub elapsed: Duration,
}

impl ClientOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every client outcome of one coordinator sweep, in completion order.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub outcomes: Vec<ClientOutcome>,
    pub elapsed: Duration,
}

impl SweepReport {
    /// Number of clients the sweep dispatched a flush to.
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ClientOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    #[must_use]
    pub fn outcome(&self, client: &str) -> Option<&ClientOutcome> {
        self.outcomes.iter().find(|o| o.client == client)
    }
}

/// Sweeps of every coordinator in a process-wide flush.
#[derive(Debug, Default)]
pub struct FlushAllReport {
    pub sweeps: Vec<(ManagerId, SweepReport)>,
}

impl FlushAllReport {
    #[must_use]
    pub fn invoked(&self) -> usize {
        self.sweeps.iter().map(|(_, s)| s.invoked()).sum()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.sweeps.iter().map(|(_, s)| s.failures().count()).sum()
    }

    #[must_use]
    pub fn sweep(&self, manager: ManagerId) -> Option<&SweepReport> {
        self.sweeps
            .iter()
            .find(|(id, _)| *id == manager)
            .map(|(_, s)| s)
    }
}
