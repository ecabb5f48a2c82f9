use std::time::Duration;

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

pub mod labels {
    pub const METHOD: &str = "method";
    pub const STATUS_CODE: &str = "status_code";
    pub const ROUTE: &str = "route";
}

/// Instruments recorded by the HTTP helpers and the server loop
#[derive(Clone)]
pub struct HttpMetrics {
    pub requests_total: Counter<u64>,
    pub request_duration_seconds: Histogram<f64>,
    pub panics_total: Counter<u64>,
}

impl HttpMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            requests_total: meter
                .u64_counter("lookout_http_requests_total")
                .with_description("Total number of HTTP requests handled")
                .build(),
            request_duration_seconds: meter
                .f64_histogram("lookout_http_request_duration_seconds")
                .with_description("HTTP request duration in seconds")
                .with_unit("s")
                .build(),
            panics_total: meter
                .u64_counter("lookout_http_panics_total")
                .with_description("Handlers that panicked and were answered with a 500")
                .build(),
        }
    }

    pub fn record_request(&self, method: &str, status_code: u16, route: &str, duration: Duration) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, i64::from(status_code)),
            KeyValue::new(labels::ROUTE, route.to_string()),
        ];
        self.requests_total.add(1, &attrs);
        self.request_duration_seconds.record(duration.as_secs_f64(), &attrs);
    }

    pub fn record_panic(&self, route: &str) {
        self.panics_total
            .add(1, &[KeyValue::new(labels::ROUTE, route.to_string())]);
    }
}
