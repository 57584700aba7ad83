//! Signal handling for graceful shutdown.

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// SIGTERM and SIGINT handlers, installed up front so that a failure to
/// install them is reported at startup.
pub struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Completes when a shutdown signal is received.
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = self.sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }
}

/// Spawns a task that flips `shutdown_tx` to `true` on the first signal.
pub fn spawn_shutdown_handler(
    signals: ShutdownSignals,
    shutdown_tx: watch::Sender<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        signals.recv().await;
        if shutdown_tx.send(true).is_err() {
            tracing::debug!("Watcher already stopped");
        }
    })
}
