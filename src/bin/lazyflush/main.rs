#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]

use std::io::{Error, ErrorKind, Result};
use std::sync::Arc;
use std::time::Duration;

use lazyflush::{
    config::{self, Config, log_level::LogLevel},
    lifecycle::{LifecycleSignal, OsSignals, ProcessRegistry, SuspensionBridge},
    logger,
    manager::{LogManager, Logger, Manager},
    targets::{BufferedTarget, ConsoleTarget, FileSink},
};
use tracing::{debug, info};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    logger::init(config.log_level)
        .map_err(|e| Error::other(format!("failed to enable logging: {e}")))?;
    debug!("Logging subsystem enabled");

    let bridge = config
        .flush_on_suspend
        .then(|| SuspensionBridge::new(OsSignals, config.suspension_settings()));
    let registry = match &bridge {
        Some(bridge) => ProcessRegistry::with_bridge(config.flush_settings(), Arc::clone(bridge)),
        None => ProcessRegistry::new(config.flush_settings()),
    };

    let file = Arc::new(BufferedTarget::new(
        "file",
        FileSink::new(&config.log_file),
        config.buffer_capacity,
    ));
    let manager = Manager::builder()
        .target(LogLevel::Trace, file)
        .target(LogLevel::Warn, Arc::new(ConsoleTarget))
        .build();
    registry.register(&manager);
    info!(
        "lazyflush started as {}, buffering to {}",
        manager.id(),
        config.log_file
    );

    let heartbeat = manager.logger("heartbeat");
    let signal = OsSignals;
    let exit = async {
        match &bridge {
            Some(bridge) => bridge.flushed().await,
            None => signal.suspending().await,
        }
    };
    let beats = heartbeat_until(exit, &heartbeat, HEARTBEAT_INTERVAL).await;

    info!("lazyflush exiting after {beats} heartbeats");
    Ok(())
}

/// Logs a heartbeat every `period` until `exit` completes and returns the
/// number of beats.
async fn heartbeat_until(
    exit: impl Future<Output = ()>,
    logger: &Logger,
    period: Duration,
) -> u64 {
    let mut interval = tokio::time::interval(period);
    let mut beats: u64 = 0;
    // polled across iterations, signal listeners stay installed
    tokio::pin!(exit);
    loop {
        tokio::select! {
            () = &mut exit => break,
            _ = interval.tick() => {
                beats += 1;
                logger.info(format!("beat {beats}"));
            }
        }
    }
    beats
}

fn load_config() -> Result<Config> {
    let directory = std::env::current_dir()?;
    config::get_config(&directory).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Error loading configuration: {e}"),
        )
    })
}
