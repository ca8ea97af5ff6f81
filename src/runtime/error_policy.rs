//! # Error Policy
//!
//! Error handling and backoff for the reconcile loop. Backoff state is kept per
//! cluster so one failing cluster never delays the others.

use crate::controller::backoff::BackoffState;
use crate::controller::reconciler::ApplyError;
use crate::error::ServiceError;
use crate::observability;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Reason label for a reconcile failure
pub fn classify_error(error: &anyhow::Error) -> &'static str {
    if let Some(apply_error) = error.downcast_ref::<ApplyError>() {
        return apply_error.as_str();
    }
    if let Some(service_error) = error.downcast_ref::<ServiceError>() {
        return service_error.kind.as_str();
    }
    "unknown"
}

/// Per-cluster error backoff
#[derive(Debug)]
pub struct BackoffRegistry {
    min_secs: u64,
    max_secs: u64,
    states: Mutex<BTreeMap<String, BackoffState>>,
}

impl BackoffRegistry {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            max_secs,
            states: Mutex::new(BTreeMap::new()),
        }
    }

    /// Whether `cluster_id` is still waiting out its backoff
    pub fn is_waiting(&self, cluster_id: &str, now: Instant) -> bool {
        match self.states.lock() {
            Ok(states) => states
                .get(cluster_id)
                .is_some_and(|state| state.is_waiting(now)),
            Err(e) => {
                warn!("Failed to lock backoff states: {}, not delaying cluster", e);
                false
            }
        }
    }

    /// Clear the backoff of a cluster that reconciled successfully
    pub fn reset(&self, cluster_id: &str) {
        if let Ok(mut states) = self.states.lock() {
            if let Some(state) = states.get_mut(cluster_id) {
                if state.error_count > 0 {
                    info!("✅ Cluster {} recovered after {} errors", cluster_id, state.error_count);
                }
                state.reset();
            }
        }
    }

    /// Record a failure and return the delay and consecutive error count
    fn record_failure(&self, cluster_id: &str, now: Instant) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(cluster_id.to_string())
                    .or_insert_with(|| BackoffState::new(self.min_secs, self.max_secs));
                let delay = state.record_failure(now);
                (delay, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (Duration::from_secs(self.min_secs), 0)
            }
        }
    }
}

/// Log a reconcile failure, record it in the metrics and schedule the retry
pub fn handle_reconciliation_error(
    cluster_id: &str,
    error: &anyhow::Error,
    backoff: &BackoffRegistry,
) -> Duration {
    let reason = classify_error(error);
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "fleet_manager.reconcile.error",
        cluster.id = cluster_id,
        reason = reason
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for cluster {}: {:#}", cluster_id, error);
    if let Some(apply_error) = error.downcast_ref::<ApplyError>() {
        if apply_error.is_transient() {
            warn!("🔁 Transient failure, will retry: {}", apply_error.remediation());
        } else {
            error!("🛠️  {}", apply_error.remediation());
        }
    }
    observability::metrics::increment_reconciliation_errors(reason);

    let (delay, error_count) = backoff.record_failure(cluster_id, Instant::now());
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "🔄 Retrying with Fibonacci backoff: {}s (error count: {})",
        delay.as_secs(),
        error_count
    );
    info!(
        "📅 Next retry scheduled: {} (in {}s)",
        next_trigger_time.to_rfc3339(),
        delay.as_secs()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    delay
}
