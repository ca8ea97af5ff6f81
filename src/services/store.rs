//! # In-Memory Cluster Store
//!
//! Cluster records held in process, keyed by cluster id. Seeded from the
//! dataplane configuration at startup.

use super::{ClusterInstanceCount, ClusterService, ClusterStore, RegionRecord};
use crate::api::{Cluster, ClusterProviderType, ClusterStatus, ClusterType};
use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct InMemoryClusterStore {
    clusters: RwLock<BTreeMap<String, Cluster>>,
    kafka_counts: RwLock<BTreeMap<String, i64>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clusters(clusters: impl IntoIterator<Item = Cluster>) -> Self {
        Self {
            clusters: RwLock::new(
                clusters
                    .into_iter()
                    .map(|cluster| (cluster.cluster_id.clone(), cluster))
                    .collect(),
            ),
            kafka_counts: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn insert(&self, cluster: Cluster) {
        self.clusters
            .write()
            .await
            .insert(cluster.cluster_id.clone(), cluster);
    }

    pub async fn set_kafka_instance_count(&self, cluster_id: &str, count: i64) {
        self.kafka_counts
            .write()
            .await
            .insert(cluster_id.to_string(), count);
    }

    async fn matching(
        &self,
        provider_type: ClusterProviderType,
        excluded: &[ClusterStatus],
    ) -> Vec<Cluster> {
        self.clusters
            .read()
            .await
            .values()
            .filter(|cluster| {
                cluster.provider_type == provider_type && !excluded.contains(&cluster.status)
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn distinct_cloud_providers(
        &self,
        provider_type: ClusterProviderType,
        excluded: &[ClusterStatus],
    ) -> anyhow::Result<Vec<String>> {
        let providers: BTreeSet<String> = self
            .matching(provider_type, excluded)
            .await
            .into_iter()
            .map(|cluster| cluster.cloud_provider)
            .collect();
        Ok(providers.into_iter().collect())
    }

    async fn distinct_regions(
        &self,
        cloud_provider: &str,
        provider_type: ClusterProviderType,
        excluded: &[ClusterStatus],
    ) -> anyhow::Result<Vec<RegionRecord>> {
        let regions: BTreeSet<RegionRecord> = self
            .matching(provider_type, excluded)
            .await
            .into_iter()
            .filter(|cluster| cluster.cloud_provider == cloud_provider)
            .map(|cluster| RegionRecord {
                region: cluster.region,
                multi_az: cluster.multi_az,
            })
            .collect();
        Ok(regions.into_iter().collect())
    }
}

#[async_trait]
impl ClusterService for InMemoryClusterStore {
    async fn find_cluster_by_id(&self, cluster_id: &str) -> ServiceResult<Option<Cluster>> {
        Ok(self.clusters.read().await.get(cluster_id).cloned())
    }

    async fn list_clusters(&self) -> ServiceResult<Vec<Cluster>> {
        Ok(self.clusters.read().await.values().cloned().collect())
    }

    async fn update_status(&self, cluster_id: &str, status: ClusterStatus) -> ServiceResult<()> {
        let mut clusters = self.clusters.write().await;
        let cluster = clusters
            .get_mut(cluster_id)
            .ok_or_else(|| ServiceError::not_found(format!("cluster with id={cluster_id:?} not found")))?;
        if !cluster.status.can_transition_to(status) {
            return Err(ServiceError::conflict(format!(
                "cluster {} cannot transition from {} to {}",
                cluster_id, cluster.status, status
            )));
        }
        cluster.status = status;
        Ok(())
    }

    async fn find_kafka_instance_count(
        &self,
        cluster_ids: &[String],
    ) -> ServiceResult<Vec<ClusterInstanceCount>> {
        let counts = self.kafka_counts.read().await;
        Ok(cluster_ids
            .iter()
            .map(|cluster_id| ClusterInstanceCount {
                cluster_id: cluster_id.clone(),
                count: counts.get(cluster_id).copied().unwrap_or_default(),
            })
            .collect())
    }

    async fn register_cluster_job(&self, cluster: Cluster) -> ServiceResult<()> {
        let mut clusters = self.clusters.write().await;
        if clusters.contains_key(&cluster.cluster_id) {
            return Err(ServiceError::new(
                crate::error::ErrorKind::DuplicateClusterId,
                format!("cluster {} is already registered", cluster.cluster_id),
            ));
        }
        info!("📝 Registered cluster {}", cluster.cluster_id);
        clusters.insert(cluster.cluster_id.clone(), cluster);
        Ok(())
    }

    async fn deregister_cluster_job(&self, cluster_id: &str) -> ServiceResult<()> {
        let mut clusters = self.clusters.write().await;
        let cluster = clusters
            .get_mut(cluster_id)
            .ok_or_else(|| ServiceError::not_found(format!("cluster with id={cluster_id:?} not found")))?;
        if cluster.status.is_deletion() {
            debug!("Cluster {} is already {}", cluster_id, cluster.status);
            return Ok(());
        }
        cluster.status = ClusterStatus::Deprovisioning;
        info!("🗑️  Deregistering cluster {}", cluster_id);
        Ok(())
    }

    async fn list_enterprise_clusters(&self, organization_id: &str) -> ServiceResult<Vec<Cluster>> {
        Ok(self
            .clusters
            .read()
            .await
            .values()
            .filter(|cluster| {
                cluster.cluster_type == ClusterType::Enterprise
                    && cluster.organization_id == organization_id
            })
            .cloned()
            .collect())
    }
}
