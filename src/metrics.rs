//! Prometheus metrics for the key-value service.
//!
//! Metrics are exposed at `GET /metrics` in Prometheus text format.
//!
//! # Metrics Exposed
//! - `kv_http_requests_total` - HTTP requests (labels: method, path, status)
//! - `kv_http_request_duration_seconds` - Request duration histogram
//! - `kv_operations_total` - Repository operations (labels: operation)
//! - `kv_sweeper_evictions_total` - Keys evicted by the expiry sweeper
//! - `kv_sweeper_failures_total` - Per-key eviction failures and failed passes
//! - `kv_sweep_duration_seconds` - Sweep pass duration histogram

use std::sync::OnceLock;

use ::metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Process-wide Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder.
///
/// Must be called once at startup before recording any metrics; until then
/// every recording call is a no-op.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_metrics();
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    Ok(handle)
}

/// Registers all metric descriptions.
fn register_metrics() {
    describe_counter!("kv_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "kv_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!("kv_operations_total", "Total key-value repository operations");
    describe_counter!(
        "kv_sweeper_evictions_total",
        "Keys evicted by the expiry sweeper"
    );
    describe_counter!(
        "kv_sweeper_failures_total",
        "Expiry sweeper failures (per key or per pass)"
    );
    describe_histogram!(
        "kv_sweep_duration_seconds",
        "Expiry sweep pass duration in seconds"
    );
}

/// Records an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let path = normalize_path(path);

    counter!(
        "kv_http_requests_total",
        "method" => method.to_string(),
        "path" => path.clone(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "kv_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path
    )
    .record(duration_secs);
}

/// Collapses per-key paths so label cardinality stays bounded.
fn normalize_path(path: &str) -> String {
    match path.strip_prefix("/api/keys/") {
        Some(rest) if !rest.is_empty() => "/api/keys/:id".to_string(),
        _ => path.to_string(),
    }
}

/// Records a repository operation.
pub fn record_kv_operation(operation: &'static str) {
    counter!("kv_operations_total", "operation" => operation).increment(1);
}

/// Records the outcome of one sweep pass.
pub fn record_sweep(evicted: u64, failed: u64, duration_secs: f64) {
    counter!("kv_sweeper_evictions_total").increment(evicted);
    counter!("kv_sweeper_failures_total").increment(failed);
    histogram!("kv_sweep_duration_seconds").record(duration_secs);
}

/// Renders metrics in Prometheus text format.
pub fn render_metrics() -> String {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}
