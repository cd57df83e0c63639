//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_total` (counter): admitted requests by status
//! - `guard_request_duration_seconds` (histogram): handler latency
//! - `guard_rejections_total` (counter): refused requests by reason
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("guard_requests_total", "status" => status.to_string()).increment(1);
    histogram!("guard_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("guard_rejections_total", "reason" => reason).increment(1);
}
