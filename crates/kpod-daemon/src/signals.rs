//! Signal handling for graceful shutdown.

use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::info;

/// Set up signal handlers for graceful shutdown.
///
/// Returns a receiver that yields once SIGTERM or SIGINT is received.
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel(1);

    let mut term = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let tx_term = tx.clone();
    tokio::spawn(async move {
        term.recv().await;
        info!("Received SIGTERM");
        let _ = tx_term.send(()).await;
    });

    let tx_int = tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx_int.send(()).await;
        }
    });

    Ok(rx)
}
