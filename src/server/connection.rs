// Connection module
// Serves one accepted TCP connection over HTTP/1.1

use super::service::{handle_request, HttpApp};
use crate::logger;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::io::{self, ErrorKind};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Serves the connection with keep-alive enabled
/// 3. Logs connection-level errors; request-level errors never reach here
pub fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, app: Arc<HttpApp>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(true);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handle_request(req, peer_addr, Arc::clone(&app))),
        );

        if let Err(err) = conn.await {
            logger::log_connection_error(&err);
        }
    });
}

/// Pause after an accept error that is not tied to one connection
/// (descriptor exhaustion and the like), so the loop does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop; runs until the task is aborted.
pub async fn accept_loop(listener: TcpListener, app: Arc<HttpApp>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                logger::log_debug(&format!("Accepting connection from {peer_addr}"));
                handle_connection(stream, peer_addr, Arc::clone(&app));
            }
            Err(e) => {
                logger::log_error(&format!("Failed to accept connection: {e}"));
                if let Some(pause) = accept_backoff(&e) {
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }
}

/// Errors of a single aborted handshake are retried at once
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::ConnectionRefused => {
            None
        }
        _ => Some(ACCEPT_ERROR_BACKOFF),
    }
}
