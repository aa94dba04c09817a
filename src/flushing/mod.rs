//! Lazy flushing of buffered log targets.
//!
//! A [`FlushCoordinator`] is attached to one logging manager. It learns about
//! flushable targets as loggers are created and drains them periodically or
//! on request.

mod coordinator;
mod errors;
mod registry;
mod report;

pub use coordinator::{FlushCoordinator, FlushSettings};
pub use errors::FlushError;
pub use registry::ClientRegistry;
pub use report::{ClientOutcome, FlushAllReport, SweepReport};
