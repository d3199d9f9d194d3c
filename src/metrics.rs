//! Observability metrics for channel harvesting
//!
//! Counters and histograms for API usage, quota consumption, credential
//! rotation, transient retries and per-channel outcomes.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter for a scrape endpoint, only when an address is given
//! - Recording without an installed exporter is a no-op

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls return `Ok(())` without reinstalling.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "127.0.0.1:9090")
///
/// # Returns
/// Ok(()) if metrics initialized successfully, Err if binding fails
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "Total number of requests made to the video platform API"
    );

    describe_counter!(
        "api_quota_units_total",
        Unit::Count,
        "Quota units consumed, by endpoint"
    );

    describe_histogram!(
        "api_request_duration_seconds",
        Unit::Seconds,
        "API request duration in seconds"
    );

    describe_counter!(
        "credential_rotations_total",
        Unit::Count,
        "Times the active credential was replaced after a quota rejection"
    );

    describe_counter!(
        "transient_retries_total",
        Unit::Count,
        "Retries after transient failures"
    );

    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );

    describe_counter!(
        "transient_failures_total",
        Unit::Count,
        "Operations abandoned after exhausting their retries"
    );

    describe_counter!(
        "channels_processed_total",
        Unit::Count,
        "Channels summarized and written"
    );

    describe_counter!(
        "channels_skipped_total",
        Unit::Count,
        "Channels skipped, by reason"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record one API request; `status` is `None` for transport failures
pub fn record_api_request(
    endpoint: &'static str,
    quota_cost: u64,
    status: Option<u16>,
    duration: Duration,
) {
    let status = status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "network_error".to_string());

    counter!(
        "api_requests_total",
        "endpoint" => endpoint,
        "status" => status,
    )
    .increment(1);

    counter!("api_quota_units_total", "endpoint" => endpoint).increment(quota_cost);

    histogram!("api_request_duration_seconds", "endpoint" => endpoint)
        .record(duration.as_secs_f64());
}

/// Record a credential rotation to `index` (0-based)
pub fn record_credential_rotation(index: usize) {
    counter!("credential_rotations_total").increment(1);
    debug!(credential = index + 1, "Credential rotation recorded");
}

/// Record a retry about to wait `backoff`
pub fn record_retry(operation: &str, backoff: Duration) {
    counter!("transient_retries_total", "operation" => operation_kind(operation)).increment(1);
    histogram!("retry_backoff_duration_seconds").record(backoff.as_secs_f64());
}

/// Record an operation abandoned after its retries
pub fn record_transient_failure(operation: &str) {
    counter!("transient_failures_total", "operation" => operation_kind(operation)).increment(1);
}

/// Record a channel written to the output
pub fn record_channel_processed() {
    counter!("channels_processed_total").increment(1);
}

/// Record a skipped channel
pub fn record_channel_skipped(reason: &'static str) {
    counter!("channels_skipped_total", "reason" => reason).increment(1);
}

/// Endpoint part of an operation label ("videos.list batch 2/3" -> "videos.list")
///
/// Keeps label cardinality bounded.
fn operation_kind(operation: &str) -> String {
    operation
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_string()
}
