//! Error taxonomy
//!
//! Request-path failures (`NotFound`, `PermissionDenied`, `Io`) never reach the
//! client verbatim: the file handler turns every one of them into a 404.
//! Startup failures (`Config`, `InvalidHeader`, `ListenerBind`, `Metrics`) bubble
//! up to `main` and end the process with a non-zero status.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServeError>;

#[derive(Debug, Error)]
pub enum ServeError {
    /// Missing file, directory with listing disabled, or a path outside the root
    #[error("not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("I/O error: {0}")]
    Io(io::Error),

    /// Client went away while the response was being written
    #[error("failed to write response: {0}")]
    TransportWrite(#[source] hyper::Error),

    #[error("failed to bind {addr}: {source}")]
    ListenerBind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid value for {name} header: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl From<io::Error> for ServeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}
