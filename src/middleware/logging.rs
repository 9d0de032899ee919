//! Request logging layer

use super::{Handler, Middleware, ServeRequest};
use crate::http::ResponseBody;
use crate::logger;
use async_trait::async_trait;
use hyper::Response;
use std::sync::Arc;

/// Writes one `[Request] METHOD /path?query` line before delegating
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestLogging;

impl RequestLogging {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for RequestLogging {
    async fn process(&self, request: ServeRequest, next: Arc<dyn Handler>) -> Response<ResponseBody> {
        logger::log_request(request.method(), request.uri());
        next.handle(request).await
    }
}
