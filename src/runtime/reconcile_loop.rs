//! # Reconcile Loop
//!
//! Periodically walks the clusters on record and drives each one forward:
//! polls the provider for its status, then installs the strimzi operator and
//! the fleet-shard agent once the cluster is provisioned. A cluster whose
//! reconcile fails is retried after a per-cluster Fibonacci backoff and does
//! not hold up the others.

use crate::api::{Cluster, ClusterStatus};
use crate::config::FleetManagerConfig;
use crate::observability;
use crate::provider::ProviderFactory;
use crate::runtime::error_policy::{handle_reconciliation_error, BackoffRegistry};
use crate::services::{ClusterService, FleetshardOperatorAddon};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub struct ClusterReconciler {
    providers: ProviderFactory,
    clusters: Arc<dyn ClusterService>,
    addon: Arc<dyn FleetshardOperatorAddon>,
    backoff: BackoffRegistry,
    reconcile_interval: Duration,
}

impl std::fmt::Debug for ClusterReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterReconciler")
            .field("providers", &self.providers)
            .field("backoff", &self.backoff)
            .field("reconcile_interval", &self.reconcile_interval)
            .finish_non_exhaustive()
    }
}

impl ClusterReconciler {
    pub fn new(
        providers: ProviderFactory,
        clusters: Arc<dyn ClusterService>,
        addon: Arc<dyn FleetshardOperatorAddon>,
        config: &FleetManagerConfig,
    ) -> Self {
        Self {
            providers,
            clusters,
            addon,
            backoff: BackoffRegistry::new(config.backoff_min_secs, config.backoff_max_secs),
            reconcile_interval: Duration::from_secs(config.reconcile_interval_secs.max(1)),
        }
    }

    pub fn backoff(&self) -> &BackoffRegistry {
        &self.backoff
    }

    /// Status currently on record for `cluster_id`, `None` once the record is gone
    async fn stored_status(&self, cluster_id: &str) -> Result<Option<ClusterStatus>> {
        let cluster = self
            .clusters
            .find_cluster_by_id(cluster_id)
            .await
            .with_context(|| format!("Failed to load cluster {cluster_id}"))?;
        Ok(cluster.map(|cluster| cluster.status))
    }

    /// Re-read the stored status, `None` when the cluster has been deregistered meanwhile
    async fn active_status(&self, cluster_id: &str) -> Result<Option<ClusterStatus>> {
        match self.stored_status(cluster_id).await? {
            Some(status) if !status.is_deletion() => Ok(Some(status)),
            Some(status) => {
                info!("Cluster {} is {}, stopping reconcile", cluster_id, status);
                Ok(None)
            }
            None => {
                info!("Cluster {} is no longer on record, stopping reconcile", cluster_id);
                Ok(None)
            }
        }
    }

    /// Drive one cluster forward and return the status it was left in.
    ///
    /// `cluster` only names the cluster; its status is re-read from the store
    /// before each step so a deregistration during the pass is never undone.
    pub async fn reconcile_cluster(
        &self,
        cluster: &Cluster,
        cancel: &CancellationToken,
    ) -> Result<ClusterStatus> {
        let cluster_id = cluster.cluster_id.as_str();
        let Some(mut status) = self.active_status(cluster_id).await? else {
            return self.final_status(cluster).await;
        };

        let provider = self.providers.get_provider(cluster.provider_type)?;
        let mut current = cluster.spec();
        current.status = status;
        let spec = provider
            .check_status(current)
            .await
            .with_context(|| format!("Failed to check status of cluster {cluster_id}"))?;

        if spec.status != status {
            if status.can_transition_to(spec.status) {
                self.clusters.update_status(cluster_id, spec.status).await?;
                info!("📋 Cluster {} moved from {} to {}", cluster_id, status, spec.status);
                status = spec.status;
            } else {
                warn!(
                    "Ignoring status {} reported for cluster {} in status {}",
                    spec.status, cluster_id, status
                );
            }
        }

        if !matches!(status, ClusterStatus::Provisioned | ClusterStatus::Ready) {
            debug!("Cluster {} is {}, nothing to install yet", cluster_id, status);
            return Ok(status);
        }

        if self.active_status(cluster_id).await?.is_none() {
            return self.final_status(cluster).await;
        }
        let base_installed = provider
            .install_base_operator(&spec, cancel)
            .await
            .with_context(|| format!("Failed to install strimzi operator on cluster {cluster_id}"))?;
        let params = self.addon.get_addon_params(cluster).await?;
        let agent_installed = provider
            .install_agent(&spec, &params, cancel)
            .await
            .with_context(|| format!("Failed to install fleet-shard agent on cluster {cluster_id}"))?;

        let Some(status) = self.active_status(cluster_id).await? else {
            return self.final_status(cluster).await;
        };
        if base_installed && agent_installed && status == ClusterStatus::Provisioned {
            self.clusters
                .update_status(cluster_id, ClusterStatus::Ready)
                .await?;
            info!("✅ Cluster {} is ready", cluster_id);
            return Ok(ClusterStatus::Ready);
        }
        Ok(status)
    }

    async fn final_status(&self, cluster: &Cluster) -> Result<ClusterStatus> {
        Ok(self
            .stored_status(&cluster.cluster_id)
            .await?
            .unwrap_or(cluster.status))
    }

    /// Reconcile every active cluster once. Returns the number reconciled successfully.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<usize> {
        let clusters = self
            .clusters
            .list_clusters()
            .await
            .context("Failed to list clusters")?;
        let active: Vec<Cluster> = clusters
            .into_iter()
            .filter(|cluster| !cluster.status.is_deletion())
            .collect();
        observability::metrics::set_clusters_managed(
            i64::try_from(active.len()).unwrap_or(i64::MAX),
        );

        let mut reconciled = 0;
        for cluster in &active {
            if cancel.is_cancelled() {
                info!("Reconcile pass cancelled");
                break;
            }
            if self.backoff.is_waiting(&cluster.cluster_id, Instant::now()) {
                debug!("Cluster {} is backing off, skipping", cluster.cluster_id);
                continue;
            }

            let span = info_span!(
                "fleet_manager.reconcile",
                cluster.id = %cluster.cluster_id,
                provider = %cluster.provider_type,
                status = %cluster.status
            );
            let start = Instant::now();
            observability::metrics::increment_reconciliations();

            match self.reconcile_cluster(cluster, cancel).instrument(span).await {
                Ok(_) => {
                    self.backoff.reset(&cluster.cluster_id);
                    reconciled += 1;
                }
                Err(e) => {
                    handle_reconciliation_error(&cluster.cluster_id, &e, &self.backoff);
                }
            }
            observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        }
        Ok(reconciled)
    }

    /// Reconcile on an interval until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "🚀 Starting reconcile loop (interval: {}s)",
            self.reconcile_interval.as_secs()
        );
        loop {
            match self.run_once(&cancel).await {
                Ok(count) => debug!("Reconcile pass finished, {} clusters reconciled", count),
                Err(e) => error!("Reconcile pass failed: {:#}", e),
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.reconcile_interval) => {}
            }
        }
        info!("🛑 Reconcile loop stopped");
    }
}
