// Server module entry point
// Builds the handler chain, binds listeners and runs the accept loops

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module gets another name
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::create_listener;
pub use server_loop::start_server_loop;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{Result, ServeError};
use crate::fs::RestrictedFs;
use crate::handler::FileHandler;
use crate::logger;
use crate::metrics::{Metrics, MetricsEndpoint, MetricsLayer};
use crate::middleware::{
    ConditionalResponse, HeaderInjection, Handler, MiddlewareChain, RequestLogging,
};

/// Compose the request pipeline for `config`.
///
/// Outermost first: metrics, request log, header injection, ETag
/// handling, then the file handler. Disabled features are left out.
pub fn build_chain(config: &ServerConfig, metrics: Option<Arc<Metrics>>) -> Result<Arc<dyn Handler>> {
    let fs = RestrictedFs::new(config.directory.clone(), config.dir_index_enabled);
    let mut chain = MiddlewareChain::new(Arc::new(FileHandler::new(fs, &config.base_uri)));

    if let Some(metrics) = metrics {
        chain.add_middleware(Arc::new(MetricsLayer::new(metrics, &config.base_uri)));
    }
    if config.log_enabled {
        chain.add_middleware(Arc::new(RequestLogging::new()));
    }
    chain.add_middleware(Arc::new(HeaderInjection::new(
        config.keep_alive.as_deref(),
        config.cache_control.as_deref(),
    )?));
    if config.etag_enabled {
        chain.add_middleware(Arc::new(ConditionalResponse::new()));
    }

    Ok(chain.build())
}

/// Run the server until a shutdown signal arrives.
pub async fn run(config: ServerConfig) -> Result<()> {
    run_until(config, async {
        signal::shutdown_signal().await;
        logger::log_shutdown();
    })
    .await
}

/// Run the server until `shutdown` completes.
///
/// Failing to bind the main port is fatal. Failing to bind the metrics port
/// is logged and the main server keeps running.
pub async fn run_until<F>(config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let metrics = if config.metrics_enabled {
        Some(Arc::new(Metrics::new()?))
    } else {
        None
    };
    let handler = build_chain(&config, metrics.clone())?;

    let addr = config.socket_addr();
    let listener = create_listener(addr).map_err(|source| ServeError::ListenerBind { addr, source })?;
    logger::log_server_start(&addr, &config);

    if let Some(metrics) = metrics {
        spawn_metrics_server(config.metrics_socket_addr(), metrics);
    }

    start_server_loop(listener, handler, shutdown).await;
    Ok(())
}

fn spawn_metrics_server(addr: SocketAddr, metrics: Arc<Metrics>) {
    let listener = match create_listener(addr) {
        Ok(l) => l,
        Err(source) => {
            logger::log_bind_failed(&ServeError::ListenerBind { addr, source });
            return;
        }
    };
    logger::log_metrics_start(&addr);

    let endpoint: Arc<dyn Handler> = Arc::new(MetricsEndpoint::new(metrics));
    tokio::spawn(start_server_loop(listener, endpoint, std::future::pending()));
}
