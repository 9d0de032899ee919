// Connection handling
// One spawned task per accepted TCP connection

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;

use crate::error::ServeError;
use crate::logger;
use crate::middleware::Handler;

/// Serve one connection on its own task.
///
/// HTTP/1.1 with keep-alive; every request on the connection goes through
/// `handler`. Request bodies are never read, so they are dropped up front.
pub fn handle_connection(stream: tokio::net::TcpStream, handler: Arc<dyn Handler>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(true);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let handler = Arc::clone(&handler);
                async move { Ok::<_, Infallible>(handler.handle(req.map(|_| ())).await) }
            }),
        );

        if let Err(err) = conn.await {
            logger::log_transport_error(&ServeError::TransportWrite(err));
        }
    });
}
