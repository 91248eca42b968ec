/// Shutdown signal handling
use crate::error::Result;
use std::future::Future;

/// Register SIGINT and SIGTERM handlers and return a future that resolves
/// on the first of them
///
/// The handlers are installed before this returns, so a signal that arrives
/// while the daemon is still starting up is held until the future is polled
/// instead of killing the process.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
        tracing::info!("Received shutdown signal");
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
    })
}
