//! # Validation Metrics
//!
//! Failures of the validation pipelines, by pipeline and error reason code.

use crate::observability::metrics::registry::REGISTRY;
use anyhow::Result;
use prometheus::IntCounterVec;
use std::sync::LazyLock;

static VALIDATION_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "kas_fleet_manager_validation_failures_total",
            "Total number of rejected requests per validation pipeline",
        ),
        &["pipeline", "reason"],
    )
    .expect("Failed to create VALIDATION_FAILURES_TOTAL metric - this should never happen")
});

pub(crate) fn register_validation_metrics() -> Result<()> {
    REGISTRY.register(Box::new(VALIDATION_FAILURES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_validation_failures(pipeline: &str, reason: &str) {
    VALIDATION_FAILURES_TOTAL
        .with_label_values(&[pipeline, reason])
        .inc();
}
