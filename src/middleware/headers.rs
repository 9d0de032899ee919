//! Static response headers (`Keep-Alive`, `Cache-Control`)

use super::{Handler, Middleware, ServeRequest};
use crate::error::{Result, ServeError};
use crate::http::ResponseBody;
use async_trait::async_trait;
use hyper::header::{HeaderName, HeaderValue, CACHE_CONTROL};
use hyper::Response;
use std::sync::Arc;

const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Adds the configured headers to every response, whatever its status
#[derive(Debug, Clone, Default)]
pub struct HeaderInjection {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl HeaderInjection {
    /// Values are used verbatim; `None` or blank values are skipped
    pub fn new(keep_alive: Option<&str>, cache_control: Option<&str>) -> Result<Self> {
        let mut headers = Vec::new();
        if let Some(value) = parse_value("Keep-Alive", keep_alive)? {
            headers.push((KEEP_ALIVE, value));
        }
        if let Some(value) = parse_value("Cache-Control", cache_control)? {
            headers.push((CACHE_CONTROL, value));
        }
        Ok(Self { headers })
    }
}

fn parse_value(name: &'static str, value: Option<&str>) -> Result<Option<HeaderValue>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => HeaderValue::from_str(v)
            .map(Some)
            .map_err(|_| ServeError::InvalidHeader {
                name,
                value: v.to_string(),
            }),
    }
}

#[async_trait]
impl Middleware for HeaderInjection {
    async fn process(&self, request: ServeRequest, next: Arc<dyn Handler>) -> Response<ResponseBody> {
        let mut response = next.handle(request).await;
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }
        response
    }
}
