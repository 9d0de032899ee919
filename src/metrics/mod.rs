//! Prometheus metrics
//!
//! A [`Metrics`] value owns its own registry. The same instance is shared by
//! the [`MetricsLayer`] that records every request and the [`MetricsEndpoint`]
//! served on the secondary listener.

mod endpoint;
mod layer;

pub use endpoint::{MetricsEndpoint, METRICS_PATH};
pub use layer::MetricsLayer;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

const REQUEST_LABELS: [&str; 3] = ["handler", "method", "code"];

pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    response_size: HistogramVec,
    requests_inflight: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &REQUEST_LABELS,
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "The latency of the HTTP requests",
            ),
            &REQUEST_LABELS,
        )?;
        let response_size = HistogramVec::new(
            HistogramOpts::new("http_response_size_bytes", "The size of the HTTP responses")
                .buckets(prometheus::exponential_buckets(100.0, 10.0, 8)?),
            &REQUEST_LABELS,
        )?;
        let requests_inflight = IntGaugeVec::new(
            Opts::new(
                "http_requests_inflight",
                "The number of inflight requests being handled at the same time",
            ),
            &["handler"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(response_size.clone()))?;
        registry.register(Box::new(requests_inflight.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            response_size,
            requests_inflight,
        })
    }

    pub(crate) fn request_started(&self, handler: &str) {
        self.requests_inflight.with_label_values(&[handler]).inc();
    }

    pub(crate) fn request_ended(&self, handler: &str) {
        self.requests_inflight.with_label_values(&[handler]).dec();
    }

    /// Record a completed response; `size` is the number of body bytes sent
    pub(crate) fn request_finished(
        &self,
        handler: &str,
        method: &str,
        code: &str,
        elapsed: Duration,
        size: u64,
    ) {
        let labels = [handler, method, code];
        self.requests_total.with_label_values(&labels).inc();
        self.request_duration
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        #[allow(clippy::cast_precision_loss)]
        self.response_size
            .with_label_values(&labels)
            .observe(size as f64);
    }

    /// Render every series in the Prometheus text exposition format
    pub fn gather(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(metrics: &Metrics) -> String {
        String::from_utf8(metrics.gather().unwrap()).unwrap()
    }

    #[test]
    fn test_records_request_series() {
        let metrics = Metrics::new().unwrap();
        metrics.request_started("/");
        metrics.request_finished("/", "GET", "200", Duration::from_millis(5), 1234);
        metrics.request_ended("/");

        let text = render(&metrics);
        assert!(text.contains(r#"http_requests_total{code="200",handler="/",method="GET"} 1"#));
        assert!(text.contains("http_request_duration_seconds_bucket"));
        assert!(text.contains(r#"http_response_size_bytes_sum{code="200",handler="/",method="GET"} 1234"#));
        assert!(text.contains(r#"http_requests_inflight{handler="/"} 0"#));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.request_started("/");
        a.request_finished("/", "GET", "404", Duration::ZERO, 0);
        a.request_ended("/");
        assert!(!render(&b).contains("http_requests_total{"));
    }
}
