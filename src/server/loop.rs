// Accept loop
// Hands every accepted connection to its own task until shutdown resolves

use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::handle_connection;
use crate::logger;
use crate::middleware::Handler;

/// Accept connections on `listener` until `shutdown` completes.
///
/// Accept errors are logged and the loop keeps going.
pub async fn start_server_loop<F>(listener: TcpListener, handler: Arc<dyn Handler>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, _peer_addr)) => {
                        handle_connection(stream, Arc::clone(&handler));
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => break,
        }
    }
}
