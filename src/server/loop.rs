// Server loop module
// Accepts connections until shutdown, then drains active connections

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::connection::accept_connection;
use crate::config::AppState;

/// Poll interval while waiting for connections to drain
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept connections until the shutdown token fires.
///
/// After shutdown the listener is closed and the loop waits up to
/// `performance.shutdown_grace` seconds for active connections to finish.
pub async fn run_server_loop(listener: TcpListener, state: Arc<AppState>) {
    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => error!("Failed to accept connection: {e}"),
                }
            }

            () = state.shutdown.cancelled() => {
                info!("[SHUTDOWN] No longer accepting connections");
                break;
            }
        }
    }

    drop(listener);
    drain_connections(&state).await;
}

async fn drain_connections(state: &AppState) {
    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    let deadline = Instant::now() + grace;

    loop {
        let active = state.active_connections.load(Ordering::SeqCst);
        if active == 0 {
            info!("[SHUTDOWN] All connections closed");
            return;
        }
        if Instant::now() >= deadline {
            warn!(
                "[SHUTDOWN] Grace period of {}s elapsed with {active} active connections",
                grace.as_secs()
            );
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::logger::testing::RecordingLog;
    use crate::server::create_reusable_listener;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_loop_stops_on_shutdown() {
        let mut config = Config::with_bucket("media").unwrap();
        config.performance.shutdown_grace = 1;
        let state = Arc::new(AppState::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingLog::default()),
        ));
        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();

        let server = tokio::spawn(run_server_loop(listener, Arc::clone(&state)));
        state.shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_grace() {
        let mut config = Config::with_bucket("media").unwrap();
        config.performance.shutdown_grace = 0;
        let state = AppState::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingLog::default()),
        );
        state.active_connections.store(3, Ordering::SeqCst);

        tokio::time::timeout(Duration::from_secs(5), drain_connections(&state))
            .await
            .expect("drain did not honour the grace period");
    }
}
