// Metrics layer: observes the whole chain, never touches the response
//
// A request stays in flight until its response body has been sent or dropped.
// Latency and size are recorded at that point, so streaming time is included.

use super::Metrics;
use crate::http::ResponseBody;
use crate::middleware::{Handler, Middleware, ServeRequest};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::{Body, Frame, SizeHint};
use hyper::Response;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

pub struct MetricsLayer {
    metrics: Arc<Metrics>,
    /// Route label, the configured base URI
    handler_label: String,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<Metrics>, handler_label: impl Into<String>) -> Self {
        Self {
            metrics,
            handler_label: handler_label.into(),
        }
    }
}

#[async_trait]
impl Middleware for MetricsLayer {
    async fn process(&self, request: ServeRequest, next: Arc<dyn Handler>) -> Response<ResponseBody> {
        let method = request.method().as_str().to_string();
        let started = Instant::now();
        // Lowered on drop, including when this future is cancelled
        let inflight = InFlight::enter(Arc::clone(&self.metrics), &self.handler_label);

        let response = next.handle(request).await;

        let (parts, body) = response.into_parts();
        let record = Completion {
            method,
            code: parts.status.as_str().to_string(),
            started,
            sent: 0,
            inflight,
        };
        let body = MeteredBody {
            inner: body,
            record: Some(record),
        };
        Response::from_parts(parts, body.boxed_unsync())
    }
}

struct InFlight {
    metrics: Arc<Metrics>,
    handler: String,
}

impl InFlight {
    fn enter(metrics: Arc<Metrics>, handler: &str) -> Self {
        metrics.request_started(handler);
        Self {
            metrics,
            handler: handler.to_string(),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.metrics.request_ended(&self.handler);
    }
}

/// Counters for one response, flushed when dropped
struct Completion {
    method: String,
    code: String,
    started: Instant,
    sent: u64,
    inflight: InFlight,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.inflight.metrics.request_finished(
            &self.inflight.handler,
            &self.method,
            &self.code,
            self.started.elapsed(),
            self.sent,
        );
    }
}

/// Passes frames through untouched while counting data bytes
struct MeteredBody {
    inner: ResponseBody,
    record: Option<Completion>,
}

impl Body for MeteredBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let (Some(data), Some(record)) = (frame.data_ref(), this.record.as_mut()) {
                    record.sent += u64::try_from(data.len()).unwrap_or(u64::MAX);
                }
            }
            Poll::Ready(None) => {
                this.record.take();
            }
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
