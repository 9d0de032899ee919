//! Request interceptor chain
//!
//! Every layer implements [`Middleware`]: it receives the request and the rest
//! of the chain as `next`, may work before delegating, may short-circuit, and
//! may rewrite the response on the way back out. A [`MiddlewareChain`] is
//! assembled once at startup, outermost layer first, and compiled into a
//! single [`Handler`] that the listener calls for every request.

mod conditional;
mod headers;
mod logging;

pub use conditional::ConditionalResponse;
pub use headers::HeaderInjection;
pub use logging::RequestLogging;

use crate::http::ResponseBody;
use async_trait::async_trait;
use hyper::{Request, Response};
use std::sync::Arc;

/// Inbound request as seen by the chain: URL, method and headers. Static
/// serving never reads request bodies.
pub type ServeRequest = Request<()>;

/// Produces a response for a request; failures are already turned into
/// error responses
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: ServeRequest) -> Response<ResponseBody>;
}

#[async_trait]
impl<T: Handler + ?Sized> Handler for Arc<T> {
    async fn handle(&self, request: ServeRequest) -> Response<ResponseBody> {
        (**self).handle(request).await
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn process(&self, request: ServeRequest, next: Arc<dyn Handler>)
        -> Response<ResponseBody>;
}

/// Ordered list of middleware wrapped around a terminal handler
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn Handler>,
}

impl MiddlewareChain {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            middlewares: Vec::new(),
            handler,
        }
    }

    /// Append a layer; layers added first run first on the way in
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Compose into a single entry point
    pub fn build(self) -> Arc<dyn Handler> {
        self.middlewares
            .into_iter()
            .rev()
            .fold(self.handler, |next, middleware| {
                Arc::new(Layer { middleware, next }) as Arc<dyn Handler>
            })
    }
}

/// One middleware bound to the remainder of the chain
struct Layer {
    middleware: Arc<dyn Middleware>,
    next: Arc<dyn Handler>,
}

#[async_trait]
impl Handler for Layer {
    async fn handle(&self, request: ServeRequest) -> Response<ResponseBody> {
        self.middleware
            .process(request, Arc::clone(&self.next))
            .await
    }
}
