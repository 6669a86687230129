//! # Cross-platform OS signal handling.
//!
//! Provides [`shutdown_requested`], an async helper that completes when the
//! process receives a termination signal, and never completes when signal
//! handling is disabled or cannot be set up.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

/// Completes on the first termination signal if `enabled`.
///
/// Registration failures are logged and treated as "no signal ever arrives",
/// so the application keeps running under its other shutdown paths.
pub async fn shutdown_requested(enabled: bool) {
    if !enabled {
        return std::future::pending().await;
    }
    match wait_for_shutdown_signal().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for shutdown signals");
            std::future::pending::<()>().await;
        }
    }
}

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
