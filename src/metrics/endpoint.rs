// Pull endpoint for the metrics listener

use super::Metrics;
use crate::http::{self, body, ResponseBody};
use crate::logger;
use crate::middleware::{Handler, ServeRequest};
use async_trait::async_trait;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Response};
use prometheus::TEXT_FORMAT;
use std::sync::Arc;

pub const METRICS_PATH: &str = "/metrics";

/// Serves `GET /metrics`; everything else is a 404
pub struct MetricsEndpoint {
    metrics: Arc<Metrics>,
}

impl MetricsEndpoint {
    pub const fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Handler for MetricsEndpoint {
    async fn handle(&self, request: ServeRequest) -> Response<ResponseBody> {
        if request.uri().path() != METRICS_PATH {
            return http::build_404_response();
        }
        if request.method() != Method::GET && request.method() != Method::HEAD {
            return http::build_405_response();
        }

        let text = match self.metrics.gather() {
            Ok(text) => text,
            Err(e) => {
                logger::log_error(&format!("Failed to encode metrics: {e}"));
                return http::build_500_response();
            }
        };
        let body = if request.method() == Method::HEAD {
            body::empty()
        } else {
            body::full(text)
        };
        let mut response = Response::new(body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_FORMAT));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::{Request, StatusCode};
    use std::time::Duration;

    fn get(path: &str) -> ServeRequest {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_text_format() {
        let metrics = Arc::new(Metrics::new().unwrap());
        metrics.request_started("/");
        metrics.request_finished("/", "GET", "200", Duration::from_millis(1), 10);
        metrics.request_ended("/");

        let response = MetricsEndpoint::new(metrics).handle(get("/metrics")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], TEXT_FORMAT);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("# TYPE http_requests_total counter"));
    }

    #[tokio::test]
    async fn test_other_paths_are_404() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let response = MetricsEndpoint::new(metrics).handle(get("/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
