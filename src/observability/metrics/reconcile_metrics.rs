//! # Reconcile Metrics
//!
//! Metrics for cluster reconcile passes and the resource applier.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::{Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge};
use std::sync::LazyLock;

// Cluster reconcile metrics
static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "kas_fleet_manager_reconciliations_total",
        "Total number of cluster reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kas_fleet_manager_reconciliation_errors_total",
            "Total number of cluster reconciliation errors",
        ),
        &["reason"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "kas_fleet_manager_reconciliation_duration_seconds",
            "Duration of a cluster reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static CLUSTERS_MANAGED: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "kas_fleet_manager_clusters_managed",
        "Current number of data plane clusters being reconciled",
    )
    .expect("Failed to create CLUSTERS_MANAGED metric - this should never happen")
});

// Applier metrics
static RESOURCES_APPLIED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kas_fleet_manager_resources_applied_total",
            "Total number of resources created or replaced on data plane clusters",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create RESOURCES_APPLIED_TOTAL metric - this should never happen")
});

static RESOURCES_SKIPPED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kas_fleet_manager_resources_skipped_total",
            "Total number of resources left unchanged because the last applied configuration matched",
        ),
        &["kind"],
    )
    .expect("Failed to create RESOURCES_SKIPPED_TOTAL metric - this should never happen")
});

static RESOURCE_APPLY_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kas_fleet_manager_resource_apply_errors_total",
            "Total number of resource apply failures",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create RESOURCE_APPLY_ERRORS_TOTAL metric - this should never happen")
});

static RESOURCE_APPLY_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "kas_fleet_manager_resource_apply_duration_seconds",
            "Duration of applying one resource in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["kind"],
    )
    .expect("Failed to create RESOURCE_APPLY_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kas_fleet_manager_requeues_total",
            "Total number of cluster reconciliation requeues",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

/// Register reconcile metrics with the registry
pub(crate) fn register_reconcile_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(CLUSTERS_MANAGED.clone()))?;
    REGISTRY.register(Box::new(RESOURCES_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCES_SKIPPED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_APPLY_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_APPLY_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(reason: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn set_clusters_managed(count: i64) {
    CLUSTERS_MANAGED.set(count);
}

/// `operation` is `create` or `replace`
pub fn increment_resources_applied(kind: &str, operation: &str) {
    RESOURCES_APPLIED_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
}

pub fn increment_resources_skipped(kind: &str) {
    RESOURCES_SKIPPED_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_resource_apply_errors(kind: &str, reason: &str) {
    RESOURCE_APPLY_ERRORS_TOTAL
        .with_label_values(&[kind, reason])
        .inc();
}

pub fn observe_resource_apply_duration(kind: &str, duration: f64) {
    RESOURCE_APPLY_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
