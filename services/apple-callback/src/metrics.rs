//! Prometheus metrics exposition
//!
//! - `apple_callback_requests_total` (counter): label `outcome`
//! - `apple_callback_duration_seconds` (histogram): label `outcome`
//! - `apple_callback_upstream_errors_total` (counter): labels `target`, `kind`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Callback latency covers two sequential outbound calls (10s + 15s budgets).
const DURATION_BUCKETS: &[f64] = &[
    0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 25.0, 30.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("apple_callback_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )
        .expect("histogram buckets are non-empty")
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a finished callback. `outcome` is `success` or a `CallbackError::kind()`.
pub fn record_callback(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("apple_callback_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("apple_callback_duration_seconds", "outcome" => outcome)
        .record(duration_secs);
}

/// Record a failed outbound call.
pub fn record_upstream_error(target: &'static str, kind: &'static str) {
    metrics::counter!("apple_callback_upstream_errors_total", "target" => target, "kind" => kind)
        .increment(1);
}
