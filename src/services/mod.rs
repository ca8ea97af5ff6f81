//! # Services
//!
//! Collaborators the providers and validators consult: the cluster store,
//! kafka and quota services, authorization and the fleet-shard addon.
//!
//! Lookups return `Ok(None)` when nothing matches; an `Err` is always a real failure.

mod addon;
mod store;

pub use addon::ConfiguredFleetshardAddon;
pub use store::InMemoryClusterStore;

use crate::api::{Cluster, ClusterProviderType, ClusterStatus, Parameter};
use crate::error::ServiceResult;
use async_trait::async_trait;

/// Distinct region of a provider's clusters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RegionRecord {
    pub region: String,
    pub multi_az: bool,
}

/// Number of kafka instances placed on a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInstanceCount {
    pub cluster_id: String,
    pub count: i64,
}

/// Predicate queries over recorded clusters
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Distinct cloud providers of clusters of `provider_type` whose status is not in `excluded`
    async fn distinct_cloud_providers(
        &self,
        provider_type: ClusterProviderType,
        excluded: &[ClusterStatus],
    ) -> anyhow::Result<Vec<String>>;

    /// Distinct (region, multi-AZ) pairs of such clusters in `cloud_provider`
    async fn distinct_regions(
        &self,
        cloud_provider: &str,
        provider_type: ClusterProviderType,
        excluded: &[ClusterStatus],
    ) -> anyhow::Result<Vec<RegionRecord>>;
}

#[async_trait]
pub trait ClusterService: Send + Sync {
    async fn find_cluster_by_id(&self, cluster_id: &str) -> ServiceResult<Option<Cluster>>;

    async fn list_clusters(&self) -> ServiceResult<Vec<Cluster>>;

    async fn update_status(&self, cluster_id: &str, status: ClusterStatus) -> ServiceResult<()>;

    async fn find_kafka_instance_count(
        &self,
        cluster_ids: &[String],
    ) -> ServiceResult<Vec<ClusterInstanceCount>>;

    /// Record a cluster and schedule its installation
    async fn register_cluster_job(&self, cluster: Cluster) -> ServiceResult<()>;

    /// Schedule a cluster's removal
    async fn deregister_cluster_job(&self, cluster_id: &str) -> ServiceResult<()>;

    async fn list_enterprise_clusters(&self, organization_id: &str) -> ServiceResult<Vec<Cluster>>;

    /// Whether `cluster` runs strimzi `strimzi_version` supporting the given kafka and IBP versions
    async fn is_strimzi_kafka_version_available_in_cluster(
        &self,
        cluster: &Cluster,
        strimzi_version: &str,
        kafka_version: &str,
        ibp_version: &str,
    ) -> ServiceResult<bool> {
        Ok(cluster
            .available_strimzi_versions
            .iter()
            .find(|version| version.version == strimzi_version)
            .is_some_and(|version| {
                version.kafka_versions.iter().any(|v| v == kafka_version)
                    && version.kafka_ibp_versions.iter().any(|v| v == ibp_version)
            }))
    }

    async fn check_strimzi_version_ready(
        &self,
        cluster: &Cluster,
        strimzi_version: &str,
    ) -> ServiceResult<bool> {
        Ok(cluster
            .available_strimzi_versions
            .iter()
            .any(|version| version.version == strimzi_version && version.ready))
    }
}

#[async_trait]
pub trait KafkaService: Send + Sync {
    /// Number of kafka instances named `name`
    async fn count_by_name(&self, name: &str) -> ServiceResult<u64>;
}

#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Instance type the user is entitled to
    async fn assign_instance_type(&self, owner: &str, organisation_id: &str) -> ServiceResult<String>;

    async fn validate_billing_account(
        &self,
        organisation_id: &str,
        instance_type: &str,
        billing_model: &str,
        billing_cloud_account_id: &str,
        marketplace: Option<&str>,
    ) -> ServiceResult<()>;
}

#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Whether `username` is an active user of `organisation_id`
    async fn check_user_valid(&self, username: &str, organisation_id: &str) -> ServiceResult<bool>;
}

#[async_trait]
pub trait FleetshardOperatorAddon: Send + Sync {
    /// Parameters the fleet-shard agent on `cluster` is installed with
    async fn get_addon_params(&self, cluster: &Cluster) -> ServiceResult<Vec<Parameter>>;
}
