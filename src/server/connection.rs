// Connection handling module
// Accepts a TCP connection, enforces the connection limit and serves HTTP/1.1 on it

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::TcpStream;
use tokio::sync::{watch, Notify};

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Counts live connections and signals when the count drops to zero
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    active: AtomicUsize,
    idle: Notify,
}

/// Held by a connection task for its lifetime
#[derive(Debug)]
pub struct ConnectionGuard(Arc<ConnectionTracker>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if self.0.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Register a connection unless `limit` is already reached.
    /// On rejection returns the count that was observed.
    pub fn try_acquire(self: &Arc<Self>, limit: Option<u64>) -> Result<ConnectionGuard, usize> {
        // Increment first, then check, so concurrent accepts cannot both slip under the limit
        let prev = self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ConnectionGuard(Arc::clone(self));
        if let Some(max) = limit {
            if prev >= usize::try_from(max).unwrap_or(usize::MAX) {
                drop(guard);
                return Err(prev);
            }
        }
        Ok(guard)
    }

    /// Resolve once no connection is active
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Accept a connection: check the limit, log, and hand it to a serving task
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    tracker: &Arc<ConnectionTracker>,
    shutdown: &watch::Receiver<bool>,
) {
    let guard = match tracker.try_acquire(state.config.performance.max_connections) {
        Ok(guard) => guard,
        Err(count) => {
            logger::log_warning(&format!(
                "Max connections reached: {count}/{}. Connection from {peer_addr} rejected.",
                state.config.performance.max_connections.unwrap_or_default()
            ));
            drop(stream);
            return;
        }
    };

    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(state), guard, shutdown.clone());
}

/// Serve one connection in its own task.
///
/// Keep-alive follows `performance.keep_alive_timeout` (0 disables it). The
/// whole connection is bounded by max(read_timeout, write_timeout). When the
/// shutdown flag flips, in-flight requests finish and the connection closes.
fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    guard: ConnectionGuard,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let _guard = guard;
        let io = TokioIo::new(stream);

        let perf = &state.config.performance;
        let timeout_duration = Duration::from_secs(perf.read_timeout.max(perf.write_timeout));

        let mut builder = http1::Builder::new();
        builder.keep_alive(perf.keep_alive_timeout > 0);
        if perf.keep_alive_timeout > 0 {
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(Duration::from_secs(perf.keep_alive_timeout));
        }

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                handler::handle_request(req, Arc::clone(&service_state), peer_addr)
            }),
        );
        tokio::pin!(conn);

        let serve = async {
            let mut draining = false;
            loop {
                tokio::select! {
                    res = conn.as_mut() => break res,
                    _ = shutdown.changed(), if !draining => {
                        draining = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }
        };

        match tokio::time::timeout(timeout_duration, serve).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout_duration.as_secs()
            )),
        }
    });
}
