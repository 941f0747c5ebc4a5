// Server loop module
// Accepts connections until shutdown, then drains in-flight connections

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::{accept_connection, ConnectionTracker};
use crate::config::AppState;
use crate::logger;

/// Run the accept loop until `shutdown` resolves.
///
/// After shutdown the listener is closed, open connections are asked to
/// finish their current request, and the loop waits up to
/// `performance.write_timeout` seconds for them before returning.
pub async fn start_server_loop<S>(listener: TcpListener, state: Arc<AppState>, shutdown: S)
where
    S: Future<Output = ()>,
{
    let tracker = Arc::new(ConnectionTracker::new());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &tracker, &shutdown_rx);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = &mut shutdown => break,
        }
    }

    drop(listener);
    let active = tracker.active();
    logger::log_info(&format!(
        "Shutting down, waiting for {active} open connection(s)"
    ));
    let _ = shutdown_tx.send(true);

    let grace = Duration::from_secs(state.config.performance.write_timeout);
    if tokio::time::timeout(grace, tracker.wait_idle()).await.is_err() {
        logger::log_warning(&format!(
            "{} connection(s) still open after {}s, exiting anyway",
            tracker.active(),
            grace.as_secs()
        ));
    } else {
        logger::log_info("All connections closed");
    }
}
