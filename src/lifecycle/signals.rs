use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::lifecycle::LifecycleSignal;

/// Termination signals of the operating system.
///
/// On Unix SIGINT, SIGTERM and SIGQUIT are handled, elsewhere only Ctrl-C.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[async_trait]
impl LifecycleSignal for OsSignals {
    async fn suspending(&self) {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!("SUSPENSION | failed to install signal handlers: {e}");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("SUSPENSION | failed to listen for ctrl-c: {e}");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Lets an embedding host trigger the suspension flush itself.
#[async_trait]
impl LifecycleSignal for CancellationToken {
    async fn suspending(&self) {
        self.cancelled().await;
    }
}
