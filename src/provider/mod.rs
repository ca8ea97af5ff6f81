//! # Cluster Providers
//!
//! A provider drives the lifecycle of data plane clusters of one provider type:
//! - `standalone`: clusters registered through configuration, managed by applying
//!   resources directly through the reconciling applier
//! - `factory`: resolves the provider registered for a provider type
//!
//! Providers backed by a managed service (OCM) implement the same trait and are
//! registered with the factory at startup.

mod factory;
mod standalone;

pub use factory::ProviderFactory;
pub use standalone::StandaloneProvider;

use crate::api::{
    CloudProviderInfo, CloudProviderInfoList, CloudProviderRegionInfoList, ClusterProviderType,
    ClusterRequest, ClusterSpec, IdentityProviderInfo, MachinePoolInfo, MachinePoolRequest,
    Parameter, QuotaCost,
};
use crate::controller::reconciler::ResourceSet;
use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Lifecycle contract every cluster provider satisfies
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    fn provider_type(&self) -> ClusterProviderType;

    /// Request a new cluster. `None` when the provider does not create clusters.
    async fn create(&self, request: &ClusterRequest) -> Result<Option<ClusterSpec>>;

    /// Start removing a cluster. Returns whether removal has completed.
    async fn delete(&self, spec: &ClusterSpec) -> Result<bool>;

    /// Current status of the cluster. Safe to call repeatedly.
    async fn check_status(&self, spec: ClusterSpec) -> Result<ClusterSpec>;

    /// Install the strimzi operator bundle. Returns whether installation has completed.
    async fn install_base_operator(
        &self,
        spec: &ClusterSpec,
        cancel: &CancellationToken,
    ) -> Result<bool>;

    /// Install the fleet-shard agent with `params` materialized as a secret
    async fn install_agent(
        &self,
        spec: &ClusterSpec,
        params: &[Parameter],
        cancel: &CancellationToken,
    ) -> Result<bool>;

    async fn install_cluster_logging(
        &self,
        spec: &ClusterSpec,
        params: &[Parameter],
        cancel: &CancellationToken,
    ) -> Result<bool>;

    /// Register an OpenID identity provider on the cluster
    async fn add_identity_provider(
        &self,
        spec: &ClusterSpec,
        identity_provider: IdentityProviderInfo,
        cancel: &CancellationToken,
    ) -> Result<IdentityProviderInfo>;

    async fn apply_resources(
        &self,
        spec: &ClusterSpec,
        resources: ResourceSet,
        cancel: &CancellationToken,
    ) -> Result<ResourceSet>;

    async fn remove_resources(&self, spec: &ClusterSpec, sync_set_name: &str) -> Result<()>;

    async fn get_cluster_dns(&self, spec: &ClusterSpec) -> Result<String>;

    /// Spec of a cluster known to the provider, `None` when it is unknown
    async fn get_cluster_spec(&self, cluster_id: &str) -> Result<Option<ClusterSpec>>;

    async fn get_cloud_providers(&self) -> Result<CloudProviderInfoList>;

    async fn get_cloud_provider_regions(
        &self,
        provider: &CloudProviderInfo,
    ) -> Result<CloudProviderRegionInfoList>;

    async fn get_machine_pool(
        &self,
        cluster_id: &str,
        machine_pool_id: &str,
    ) -> Result<Option<MachinePoolInfo>>;

    async fn create_machine_pool(
        &self,
        request: &MachinePoolRequest,
    ) -> Result<Option<MachinePoolRequest>>;

    /// Quota consumption of the cluster's organisation, empty when not billed through the provider
    async fn get_cluster_resource_quota_costs(&self, spec: &ClusterSpec) -> Result<Vec<QuotaCost>>;
}
