// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
//
// Both cancel the process-wide token; every transfer session runs on a
// child of it and stops at its next fetch or write.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Start signal handlers (Unix only)
///
/// Registration happens before returning so a failure surfaces at startup.
///
/// # Errors
///
/// Fails when a signal handler cannot be registered.
#[cfg(unix)]
pub fn start_signal_handler(shutdown: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    info!("[SIGNAL] Handlers registered (SIGTERM, SIGINT), pid {}", std::process::id());

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("[SIGNAL] SIGTERM received, shutting down gracefully"),
            _ = sigint.recv() => info!("[SIGNAL] SIGINT received (Ctrl+C), shutting down gracefully"),
            () = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });
    Ok(())
}

/// Windows fallback - only handles Ctrl+C
///
/// # Errors
///
/// Never fails; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn start_signal_handler(shutdown: CancellationToken) -> std::io::Result<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("[SIGNAL] Ctrl+C received, shutting down gracefully");
                    shutdown.cancel();
                }
            }
            () = shutdown.cancelled() => {}
        }
    });
    Ok(())
}
