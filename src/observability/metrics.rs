//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, status
//! - `api_request_duration_seconds` (histogram): latency distribution
//! - `api_rate_limited_total` (counter): requests rejected with 429
//! - `api_panics_total` (counter): handler panics turned into 500s
//! - `api_tracked_clients` (gauge): entries in the rate-limit table
//! - `api_evicted_clients_total` (counter): idle clients swept out
//! - `api_active_connections` (gauge): open client connections
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [("method", method.to_string()), ("status", status.to_string())];
    counter!("api_requests_total", &labels).increment(1);
    histogram!("api_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("api_rate_limited_total").increment(1);
}

pub fn record_panic() {
    counter!("api_panics_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("api_tracked_clients").set(count as f64);
}

pub fn record_evicted_clients(count: usize) {
    counter!("api_evicted_clients_total").increment(count as u64);
}

pub fn record_active_connections(count: u64) {
    gauge!("api_active_connections").set(count as f64);
}
