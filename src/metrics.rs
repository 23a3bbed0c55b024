// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for reconciliation activity, exposed under `/metrics`.

use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};
use std::sync::LazyLock;

const METRICS_NAMESPACE: &str = "dns_reconciler";

/// The process-wide metrics registry, grounded in the teacher's `LazyLock`
/// registry pattern rather than a global default registry.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Total sync attempts, labeled by owner and trigger (`cron`, `webhook`,
/// `manual`, `status`).
pub static SYNC_ATTEMPTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("sync_attempts_total", "Total reconciliation sync attempts").namespace(METRICS_NAMESPACE),
        &["owner_id", "trigger"],
    )
    .expect("metric options are valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric is registered once");
    counter
});

/// Total sync failures, labeled by owner and trigger.
pub static SYNC_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("sync_failures_total", "Total reconciliation sync failures").namespace(METRICS_NAMESPACE),
        &["owner_id", "trigger"],
    )
    .expect("metric options are valid");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric is registered once");
    counter
});

/// Sync wall-clock duration in seconds, labeled by owner.
pub static SYNC_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let histogram = HistogramVec::new(
        prometheus::HistogramOpts::new("sync_duration_seconds", "Sync wall-clock duration").namespace(METRICS_NAMESPACE),
        &["owner_id"],
    )
    .expect("metric options are valid");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric is registered once");
    histogram
});

/// Size of the last batch call's create/delete operation count, labeled by
/// owner and operation kind (`create`, `delete`).
pub static BATCH_SIZE: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    let gauge = IntGaugeVec::new(
        Opts::new("batch_operation_count", "Operation count in the last batch call").namespace(METRICS_NAMESPACE),
        &["owner_id", "operation"],
    )
    .expect("metric options are valid");
    METRICS_REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("metric is registered once");
    gauge
});

/// Record a completed sync's outcome and timing against the registered
/// metrics.
pub fn record_sync(owner_id: &str, trigger: &str, succeeded: bool, duration_secs: f64, added: i64, deleted: i64) {
    SYNC_ATTEMPTS_TOTAL.with_label_values(&[owner_id, trigger]).inc();
    if !succeeded {
        SYNC_FAILURES_TOTAL.with_label_values(&[owner_id, trigger]).inc();
    }
    SYNC_DURATION_SECONDS.with_label_values(&[owner_id]).observe(duration_secs);
    BATCH_SIZE.with_label_values(&[owner_id, "create"]).set(added);
    BATCH_SIZE.with_label_values(&[owner_id, "delete"]).set(deleted);
}

/// Render the registry's current state in the Prometheus text exposition
/// format.
pub fn encode() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).expect("text encoding does not fail");
    String::from_utf8(buffer).expect("prometheus output is valid utf8")
}
