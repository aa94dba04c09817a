//! Crate for the `lazyflush` project
//!
//! Coordinates draining of buffered log targets: periodically on a timer and
//! synchronously when the host process is about to suspend or terminate.
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_copy_implementations)]
#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod flushing;
pub mod lifecycle;
pub mod logger;
pub mod manager;
pub mod targets;

pub const CONFIG_FILE_NAME: &str = "lazyflush.yaml";
pub const ENV_PREFIX: &str = "LAZYFLUSH_";

/// Cadence of the periodic sweep when no flush strategy is configured.
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 2 * 60 * 1000;
