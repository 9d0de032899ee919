//! Conditional-response layer
//!
//! Buffers the whole downstream body while folding it into a SHA-1
//! fingerprint, then either answers `304 Not Modified` (the client's
//! `If-None-Match` matched) or sends the buffered body with an `ETag` header.
//! The header has to go out before the body, so nothing is forwarded until the
//! digest is complete.

use super::{Handler, Middleware, ServeRequest};
use crate::http::cache::{self, Fingerprinter};
use crate::http::{self, body, ResponseBody};
use crate::logger;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::header::{
    HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_NONE_MATCH,
    LAST_MODIFIED, TRANSFER_ENCODING,
};
use hyper::http::response::Parts;
use hyper::{Method, Response, StatusCode};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalResponse;

impl ConditionalResponse {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for ConditionalResponse {
    async fn process(&self, request: ServeRequest, next: Arc<dyn Handler>) -> Response<ResponseBody> {
        let if_none_match = request
            .headers()
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        // HEAD is fingerprinted over the GET body so both methods agree on the ETag
        let is_head = request.method() == Method::HEAD;
        let mut request = request;
        if is_head {
            *request.method_mut() = Method::GET;
        }

        let response = next.handle(request).await;
        if response.status() != StatusCode::OK {
            return response;
        }

        let (parts, downstream) = response.into_parts();
        let captured = match BufferedBody::capture(downstream).await {
            Ok(captured) => captured,
            Err(e) => {
                logger::log_error(&format!("Failed to read response body: {e}"));
                return http::build_500_response();
            }
        };

        respond(parts, captured, if_none_match.as_deref(), is_head)
    }
}

/// Per-request capture of the downstream body: the bytes plus their fingerprint.
/// Owned by the task serving the request and dropped with it.
struct BufferedBody {
    bytes: Bytes,
    etag: String,
}

impl BufferedBody {
    async fn capture(mut downstream: ResponseBody) -> std::io::Result<Self> {
        let mut buffer = BytesMut::new();
        let mut fingerprinter = Fingerprinter::new();

        while let Some(frame) = downstream.frame().await {
            if let Ok(chunk) = frame?.into_data() {
                fingerprinter.update(&chunk);
                buffer.extend_from_slice(&chunk);
            }
        }

        Ok(Self {
            bytes: buffer.freeze(),
            etag: fingerprinter.finish(),
        })
    }
}

fn respond(
    mut parts: Parts,
    captured: BufferedBody,
    if_none_match: Option<&str>,
    is_head: bool,
) -> Response<ResponseBody> {
    let etag = match HeaderValue::from_str(&captured.etag) {
        Ok(value) => value,
        Err(e) => {
            logger::log_error(&format!("Failed to build ETag header: {e}"));
            return http::build_500_response();
        }
    };

    if cache::check_etag_match(if_none_match, &captured.etag) {
        // Headers describing a body have no place on a 304
        for name in [
            CONTENT_TYPE,
            CONTENT_LENGTH,
            CONTENT_RANGE,
            ACCEPT_RANGES,
            TRANSFER_ENCODING,
            LAST_MODIFIED,
        ] {
            parts.headers.remove(name);
        }
        parts.status = StatusCode::NOT_MODIFIED;
        parts.headers.insert(ETAG, etag);
        return Response::from_parts(parts, body::empty());
    }

    parts.headers.insert(ETAG, etag);
    parts.headers.remove(TRANSFER_ENCODING);
    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(captured.bytes.len()));

    let body = if is_head {
        body::empty()
    } else {
        body::full(captured.bytes)
    };
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::cache::fingerprint;
    use hyper::header::CACHE_CONTROL;
    use hyper::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Streams a fixed body in two chunks and records the methods it saw
    struct Fixed {
        status: StatusCode,
        content: &'static [u8],
        calls: AtomicUsize,
        saw_head: AtomicUsize,
    }

    impl Fixed {
        fn new(status: StatusCode, content: &'static [u8]) -> Arc<Self> {
            Arc::new(Self {
                status,
                content,
                calls: AtomicUsize::new(0),
                saw_head: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Handler for Fixed {
        async fn handle(&self, request: ServeRequest) -> Response<ResponseBody> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.method() == Method::HEAD {
                self.saw_head.fetch_add(1, Ordering::SeqCst);
            }
            let (a, b) = self.content.split_at(self.content.len() / 2);
            let stream = futures_util::stream::iter(vec![
                Ok::<_, std::io::Error>(hyper::body::Frame::data(Bytes::from_static(a))),
                Ok(hyper::body::Frame::data(Bytes::from_static(b))),
            ]);
            let mut response = Response::new(http_body_util::StreamBody::new(stream).boxed_unsync());
            *response.status_mut() = self.status;
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
            response
        }
    }

    fn request(method: Method, if_none_match: Option<&str>) -> ServeRequest {
        let mut builder = Request::builder().method(method).uri("/file.txt");
        if let Some(tag) = if_none_match {
            builder = builder.header(IF_NONE_MATCH, tag);
        }
        builder.body(()).unwrap()
    }

    async fn body_bytes(response: Response<ResponseBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_adds_etag_of_full_body() {
        let handler = Fixed::new(StatusCode::OK, b"hello world");
        let response = ConditionalResponse::new()
            .process(request(Method::GET, None), handler)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ETAG], fingerprint(b"hello world").as_str());
        assert_eq!(response.headers()[CONTENT_LENGTH], "11");
        assert_eq!(&body_bytes(response).await[..], b"hello world");
    }

    #[tokio::test]
    async fn test_etag_is_stable_across_requests() {
        let handler = Fixed::new(StatusCode::OK, b"same content");
        let layer = ConditionalResponse::new();
        let first = layer.process(request(Method::GET, None), handler.clone()).await;
        let second = layer.process(request(Method::GET, None), handler).await;
        assert_eq!(first.headers()[ETAG], second.headers()[ETAG]);
    }

    #[tokio::test]
    async fn test_matching_tag_short_circuits_to_304() {
        let handler = Fixed::new(StatusCode::OK, b"hello world");
        let tag = fingerprint(b"hello world");
        let response = ConditionalResponse::new()
            .process(request(Method::GET, Some(&tag)), handler)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(response.headers()[ETAG], tag.as_str());
        assert!(!response.headers().contains_key(CONTENT_TYPE));
        assert!(!response.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(response.headers()[CACHE_CONTROL], "max-age=60");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_tag_gets_full_body() {
        let handler = Fixed::new(StatusCode::OK, b"new content");
        let response = ConditionalResponse::new()
            .process(request(Method::GET, Some("\"0000\"")), handler)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ETAG], fingerprint(b"new content").as_str());
        assert_eq!(&body_bytes(response).await[..], b"new content");
    }

    #[tokio::test]
    async fn test_empty_body_has_well_defined_tag() {
        let handler = Fixed::new(StatusCode::OK, b"");
        let response = ConditionalResponse::new()
            .process(request(Method::GET, None), handler)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[ETAG],
            "\"da39a3ee5e6b4b0d3255bfef95601890afd80709\""
        );
        assert_eq!(response.headers()[CONTENT_LENGTH], "0");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_head_uses_get_fingerprint_and_drops_body() {
        let handler = Fixed::new(StatusCode::OK, b"hello world");
        let response = ConditionalResponse::new()
            .process(request(Method::HEAD, None), handler.clone())
            .await;

        assert_eq!(handler.saw_head.load(Ordering::SeqCst), 0);
        assert_eq!(response.headers()[ETAG], fingerprint(b"hello world").as_str());
        assert_eq!(response.headers()[CONTENT_LENGTH], "11");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_200_passes_through() {
        let handler = Fixed::new(StatusCode::NOT_FOUND, b"404 page not found\n");
        let response = ConditionalResponse::new()
            .process(request(Method::GET, None), handler.clone())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key(ETAG));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
