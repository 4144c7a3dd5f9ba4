//! Shutdown signal handling for the workers.

use std::future::Future;
use std::io;

use log::{error, info};
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum ShutdownSignalError {
    #[error("failed to install Ctrl+C handler: {0}")]
    CtrlC(#[source] io::Error),

    #[cfg(unix)]
    #[error("failed to install SIGTERM handler: {0}")]
    SigTerm(#[source] io::Error),
}

/// Waits for Ctrl+C or SIGTERM.
pub async fn wait_for_signal() -> Result<(), ShutdownSignalError> {
    let ctrl_c = async { signal::ctrl_c().await.map_err(ShutdownSignalError::CtrlC) };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(ShutdownSignalError::SigTerm)?
            .recv()
            .await;
        Ok::<(), ShutdownSignalError>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), ShutdownSignalError>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("ctrl_c signal received");
        }
        result = terminate => {
            result?;
            info!("terminate signal received");
        }
    }
    Ok(())
}

/// Flips `shutdown` to `true` once a shutdown signal arrives.
///
/// When no signal handler can be installed the flag is never flipped and the
/// sender is held until every receiver is gone.
pub async fn listen(shutdown: watch::Sender<bool>) {
    forward(wait_for_signal(), shutdown).await
}

/// Spawns [`listen`] and returns the flag it drives.
pub fn spawn_listener() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(listen(shutdown_tx));
    shutdown_rx
}

async fn forward<F>(signal: F, shutdown: watch::Sender<bool>)
where
    F: Future<Output = Result<(), ShutdownSignalError>>,
{
    match signal.await {
        Ok(()) => {
            // Receivers may already be gone when the worker stopped on its own.
            let _ = shutdown.send(true);
        }
        Err(e) => {
            error!("Failed to listen for shutdown signals, running until stopped: {}", e);
            shutdown.closed().await;
        }
    }
}
