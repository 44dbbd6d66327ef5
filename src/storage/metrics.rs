//! Metrics recording for key-value operations.

use std::time::Instant;

/// Records operation metrics for a façade call.
///
/// Two metrics are emitted per call:
/// 1. `kv_operations_total` - counter by backend, operation and status
/// 2. `kv_operation_duration_ms` - latency histogram with the same labels
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use sqlkv::storage::record_operation_metrics;
///
/// let start = Instant::now();
/// record_operation_metrics("sqlite", "kv_get", start, "success");
/// ```
pub fn record_operation_metrics(
    backend: &'static str,
    operation: &'static str,
    start: Instant,
    status: &'static str,
) {
    metrics::counter!(
        "kv_operations_total",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "kv_operation_duration_ms",
        "backend" => backend,
        "operation" => operation,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);
}
