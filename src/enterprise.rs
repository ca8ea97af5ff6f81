//! # Enterprise Clusters
//!
//! Customer organisations register their own OpenShift clusters as dedicated
//! data plane clusters. Registration is only possible through the OCM provider
//! and only for multi-AZ clusters that are fully provisioned. Every read is
//! scoped to the caller's organisation: a cluster of another organisation is
//! reported as not found.

use crate::api::{
    find_param, require_claims, Claims, Cluster, ClusterProviderType, ClusterStatus, ClusterType,
    DynamicCapacityInfo, Parameter,
};
use crate::constants::{
    API_BASE_PATH, CLUSTER_ID_LENGTH, FLEETSHARD_PARAM_SERVICE_ACCOUNT_ID,
    FLEETSHARD_PARAM_SERVICE_ACCOUNT_SECRET, MIN_KAFKA_MACHINE_POOL_NODES,
};
use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::provider::{ClusterProvider, ProviderFactory};
use crate::services::{ClusterService, FleetshardOperatorAddon};
use crate::validation::{
    run_validations, validate_dns_name, validate_kafka_claims, validate_length,
    validate_not_empty, validate_organisation_id, Validation,
};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Instance type enterprise clusters are registered for
const ENTERPRISE_SUPPORTED_INSTANCE_TYPE: &str = "standard";

/// Registration request for a customer-owned cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnterpriseClusterPayload {
    pub cluster_id: String,
    pub cluster_ingress_dns_name: String,
    pub kafka_machine_pool_node_count: i32,
    pub access_kafkas_via_private_network: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseCluster {
    pub id: String,
    pub kind: String,
    pub href: String,
    pub cluster_id: String,
    pub status: String,
    pub access_kafkas_via_private_network: bool,
}

impl From<&Cluster> for EnterpriseCluster {
    fn from(cluster: &Cluster) -> Self {
        Self {
            id: cluster.cluster_id.clone(),
            kind: "Cluster".to_string(),
            href: format!("{API_BASE_PATH}/clusters/{}", cluster.cluster_id),
            cluster_id: cluster.cluster_id.clone(),
            status: cluster.status.as_str().to_string(),
            access_kafkas_via_private_network: cluster.access_kafkas_via_private_network,
        }
    }
}

/// Fleet-shard parameter as returned to the registering organisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetshardParameter {
    pub id: String,
    pub value: String,
}

/// Enterprise cluster together with the parameters its fleet-shard agent needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseClusterWithAddonParameters {
    #[serde(flatten)]
    pub cluster: EnterpriseCluster,
    pub fleetshard_parameters: Vec<FleetshardParameter>,
}

impl EnterpriseClusterWithAddonParameters {
    fn new(cluster: &Cluster, params: &[Parameter]) -> Self {
        Self {
            cluster: EnterpriseCluster::from(cluster),
            fleetshard_parameters: params
                .iter()
                .map(|param| FleetshardParameter {
                    id: param.id.clone(),
                    value: param.value.expose().to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterpriseClusterList {
    pub kind: String,
    pub page: i32,
    pub size: i32,
    pub total: i32,
    pub items: Vec<EnterpriseCluster>,
}

/// Kafka machine pool must have at least three nodes, in multiples of three
pub fn validate_kafka_machine_pool_node_count(node_count: i32) -> ServiceResult<()> {
    if node_count < MIN_KAFKA_MACHINE_POOL_NODES {
        return Err(ServiceError::validation(format!(
            "failed to register cluster. Kafka machine pool node count: {node_count} should be greater or equal to {MIN_KAFKA_MACHINE_POOL_NODES}"
        )));
    }
    if node_count % 3 != 0 {
        return Err(ServiceError::validation(format!(
            "failed to register cluster. Kafka machine pool node count: {node_count} should be in multiple of 3"
        )));
    }
    Ok(())
}

/// No cluster with `cluster_id` may be known yet
pub async fn validate_cluster_id_is_unique(
    cluster_service: &dyn ClusterService,
    cluster_id: &str,
) -> ServiceResult<()> {
    if cluster_service.find_cluster_by_id(cluster_id).await?.is_some() {
        return Err(ServiceError::new(
            ErrorKind::DuplicateClusterId,
            format!("cluster id {cluster_id:?} is already registered"),
        ));
    }
    Ok(())
}

fn require_org_admin(claims: &Claims) -> ServiceResult<&str> {
    let org_id = claims.org_id()?;
    if !claims.is_org_admin {
        return Err(ServiceError::unauthorized(
            "non admin user not authorized to perform this action",
        ));
    }
    Ok(org_id)
}

/// Registration, removal and lookup of enterprise clusters
#[derive(Clone)]
pub struct EnterpriseClusterService {
    providers: ProviderFactory,
    cluster_service: Arc<dyn ClusterService>,
    addon: Arc<dyn FleetshardOperatorAddon>,
}

impl std::fmt::Debug for EnterpriseClusterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnterpriseClusterService")
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

impl EnterpriseClusterService {
    pub fn new(
        providers: ProviderFactory,
        cluster_service: Arc<dyn ClusterService>,
        addon: Arc<dyn FleetshardOperatorAddon>,
    ) -> Self {
        Self {
            providers,
            cluster_service,
            addon,
        }
    }

    /// Register a customer cluster and return the parameters its fleet-shard agent is installed with
    #[instrument(skip(self, claims, payload), fields(cluster_id = %payload.cluster_id))]
    pub async fn register_enterprise_cluster(
        &self,
        claims: Option<&Claims>,
        payload: &EnterpriseClusterPayload,
    ) -> ServiceResult<EnterpriseClusterWithAddonParameters> {
        let provider = self.providers.get_provider(ClusterProviderType::Ocm);
        let cluster_service = self.cluster_service.as_ref();

        let validations: Vec<Validation<'_>> = vec![
            async {
                if provider.is_err() {
                    return Err(ServiceError::general(
                        "unexpected error occurred. failed to validate the request",
                    ));
                }
                Ok(())
            }
            .boxed(),
            async {
                validate_length(
                    &payload.cluster_id,
                    "cluster id",
                    CLUSTER_ID_LENGTH,
                    Some(CLUSTER_ID_LENGTH),
                )
            }
            .boxed(),
            async { validate_not_empty(&payload.cluster_id, "cluster id") }.boxed(),
            validate_cluster_id_is_unique(cluster_service, &payload.cluster_id).boxed(),
            async { validate_dns_name(&payload.cluster_ingress_dns_name, "cluster dns name") }
                .boxed(),
            async { validate_kafka_machine_pool_node_count(payload.kafka_machine_pool_node_count) }
                .boxed(),
        ];
        run_validations("enterprise_registration", validations).await?;

        let provider = provider?;
        let cluster = self.build_cluster(provider.as_ref(), claims, payload).await?;

        let params = self.addon.get_addon_params(&cluster).await?;
        let mut cluster = cluster;
        cluster.client_id = find_param(&params, FLEETSHARD_PARAM_SERVICE_ACCOUNT_ID)
            .unwrap_or_default()
            .to_string();
        cluster.client_secret = find_param(&params, FLEETSHARD_PARAM_SERVICE_ACCOUNT_SECRET)
            .unwrap_or_default()
            .into();

        self.cluster_service.register_cluster_job(cluster.clone()).await?;
        info!(
            "🏢 Registered enterprise cluster {} for organisation {}",
            cluster.cluster_id, cluster.organization_id
        );
        Ok(EnterpriseClusterWithAddonParameters::new(&cluster, &params))
    }

    async fn build_cluster(
        &self,
        provider: &dyn ClusterProvider,
        claims: Option<&Claims>,
        payload: &EnterpriseClusterPayload,
    ) -> ServiceResult<Cluster> {
        let spec = provider
            .get_cluster_spec(&payload.cluster_id)
            .await
            .map_err(|e| {
                ServiceError::with_cause(
                    ErrorKind::General,
                    e,
                    format!("failed to get cluster by ID: {}", payload.cluster_id),
                )
            })?
            .ok_or_else(|| {
                ServiceError::general(format!(
                    "failed to get cluster by ID: {}",
                    payload.cluster_id
                ))
            })?;

        if !spec.multi_az {
            return Err(ServiceError::bad_request("single AZ clusters are not supported"));
        }
        if spec.status != ClusterStatus::Provisioned {
            return Err(ServiceError::bad_request(
                "cluster that are not yet fully provisioned are not accepted",
            ));
        }

        let claims = require_claims(claims)?;
        let org_id = require_org_admin(claims)?;

        let mut cluster = Cluster::new(
            payload.cluster_id.as_str(),
            ClusterProviderType::Ocm,
            ClusterStatus::Accepted,
        );
        cluster.cluster_type = ClusterType::Enterprise;
        cluster.organization_id = org_id.to_string();
        cluster.external_id = spec.external_id;
        cluster.cloud_provider = spec.cloud_provider;
        cluster.region = spec.region;
        cluster.multi_az = spec.multi_az;
        cluster.cluster_dns = payload.cluster_ingress_dns_name.clone();
        cluster.access_kafkas_via_private_network = payload.access_kafkas_via_private_network;
        cluster.supported_instance_type = ENTERPRISE_SUPPORTED_INSTANCE_TYPE.to_string();
        cluster.dynamic_capacity_info = BTreeMap::from([(
            ENTERPRISE_SUPPORTED_INSTANCE_TYPE.to_string(),
            DynamicCapacityInfo {
                max_nodes: payload.kafka_machine_pool_node_count,
            },
        )]);
        Ok(cluster)
    }

    /// Schedule removal of an enterprise cluster that no longer hosts kafka instances
    #[instrument(skip(self, claims))]
    pub async fn deregister_enterprise_cluster(
        &self,
        claims: Option<&Claims>,
        cluster_id: &str,
    ) -> ServiceResult<()> {
        let validations: Vec<Validation<'_>> = vec![
            async { validate_kafka_claims(claims, &[validate_organisation_id]) }.boxed(),
            self.validate_eligible_for_deregistration(claims, cluster_id)
                .boxed(),
            self.validate_has_no_kafkas(cluster_id).boxed(),
        ];
        run_validations("enterprise_deregistration", validations).await?;

        self.cluster_service.deregister_cluster_job(cluster_id).await?;
        info!("🏢 Deregistered enterprise cluster {}", cluster_id);
        Ok(())
    }

    async fn validate_eligible_for_deregistration(
        &self,
        claims: Option<&Claims>,
        cluster_id: &str,
    ) -> ServiceResult<()> {
        let claims = require_claims(claims)?;
        let org_id = require_org_admin(claims)?;

        let cluster = self
            .cluster_service
            .find_cluster_by_id(cluster_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("cluster with id={cluster_id:?} not found")))?;
        if cluster.organization_id != org_id {
            return Err(ServiceError::forbidden(
                "unable to deregister cluster from different organization",
            ));
        }
        if cluster.cluster_type != ClusterType::Enterprise {
            return Err(ServiceError::forbidden(format!(
                "unable to deregister cluster whose type is not: {:?}",
                ClusterType::Enterprise.as_str()
            )));
        }
        Ok(())
    }

    async fn validate_has_no_kafkas(&self, cluster_id: &str) -> ServiceResult<()> {
        let counts = self
            .cluster_service
            .find_kafka_instance_count(&[cluster_id.to_string()])
            .await
            .map_err(|err| {
                ServiceError::with_cause(
                    ErrorKind::General,
                    err.into(),
                    format!("error querying kafka instances for clusterID: {cluster_id}"),
                )
            })?;
        if counts
            .iter()
            .any(|count| count.cluster_id == cluster_id && count.count > 0)
        {
            return Err(ServiceError::forbidden(
                "unable to deregister cluster with kafka instances",
            ));
        }
        Ok(())
    }

    /// Enterprise cluster of the caller's organisation
    pub async fn get_enterprise_cluster(
        &self,
        claims: Option<&Claims>,
        cluster_id: &str,
    ) -> ServiceResult<EnterpriseCluster> {
        let cluster = self.find_own_cluster(claims, cluster_id, false).await?;
        Ok(EnterpriseCluster::from(&cluster))
    }

    /// Enterprise cluster of the caller's organisation with its fleet-shard parameters. Org admins only.
    pub async fn get_enterprise_cluster_with_addon_params(
        &self,
        claims: Option<&Claims>,
        cluster_id: &str,
    ) -> ServiceResult<EnterpriseClusterWithAddonParameters> {
        let cluster = self.find_own_cluster(claims, cluster_id, true).await?;
        let params = self.addon.get_addon_params(&cluster).await?;
        Ok(EnterpriseClusterWithAddonParameters::new(&cluster, &params))
    }

    async fn find_own_cluster(
        &self,
        claims: Option<&Claims>,
        cluster_id: &str,
        admin_only: bool,
    ) -> ServiceResult<Cluster> {
        validate_not_empty(cluster_id, "cluster id")?;
        validate_kafka_claims(claims, &[validate_organisation_id])?;
        let claims = require_claims(claims)?;
        let org_id = if admin_only {
            require_org_admin(claims)?
        } else {
            claims.org_id()?
        };

        match self.cluster_service.find_cluster_by_id(cluster_id).await? {
            Some(cluster)
                if cluster.organization_id == org_id
                    && cluster.cluster_type == ClusterType::Enterprise =>
            {
                Ok(cluster)
            }
            _ => Err(ServiceError::not_found(format!(
                "enterprise data plane cluster with id={cluster_id:?} not found within organization: {org_id}"
            ))),
        }
    }

    /// Enterprise clusters of the caller's organisation
    pub async fn list_enterprise_clusters(
        &self,
        claims: Option<&Claims>,
    ) -> ServiceResult<EnterpriseClusterList> {
        validate_kafka_claims(claims, &[validate_organisation_id])?;
        let org_id = require_claims(claims)?.org_id()?;

        let items: Vec<EnterpriseCluster> = self
            .cluster_service
            .list_enterprise_clusters(org_id)
            .await?
            .iter()
            .map(EnterpriseCluster::from)
            .collect();
        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        Ok(EnterpriseClusterList {
            kind: "ClusterList".to_string(),
            page: 1,
            size: count,
            total: count,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        CloudProviderInfo, CloudProviderInfoList, CloudProviderRegionInfoList, ClusterRequest,
        ClusterSpec, IdentityProviderInfo, MachinePoolInfo, MachinePoolRequest, QuotaCost,
    };
    use crate::config::FleetshardAgentConfig;
    use crate::controller::reconciler::ResourceSet;
    use crate::services::{ConfiguredFleetshardAddon, InMemoryClusterStore};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    const CLUSTER_ID: &str = "1234abcd1234abcd1234abcd1234abcd";

    struct OcmClusters {
        specs: Vec<ClusterSpec>,
        unreachable: bool,
    }

    #[async_trait]
    impl ClusterProvider for OcmClusters {
        fn provider_type(&self) -> ClusterProviderType {
            ClusterProviderType::Ocm
        }

        async fn create(&self, _request: &ClusterRequest) -> anyhow::Result<Option<ClusterSpec>> {
            Ok(None)
        }

        async fn delete(&self, _spec: &ClusterSpec) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn check_status(&self, spec: ClusterSpec) -> anyhow::Result<ClusterSpec> {
            Ok(spec)
        }

        async fn install_base_operator(
            &self,
            _spec: &ClusterSpec,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn install_agent(
            &self,
            _spec: &ClusterSpec,
            _params: &[Parameter],
            _cancel: &CancellationToken,
        ) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn install_cluster_logging(
            &self,
            _spec: &ClusterSpec,
            _params: &[Parameter],
            _cancel: &CancellationToken,
        ) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn add_identity_provider(
            &self,
            _spec: &ClusterSpec,
            identity_provider: IdentityProviderInfo,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<IdentityProviderInfo> {
            Ok(identity_provider)
        }

        async fn apply_resources(
            &self,
            _spec: &ClusterSpec,
            resources: ResourceSet,
            _cancel: &CancellationToken,
        ) -> anyhow::Result<ResourceSet> {
            Ok(resources)
        }

        async fn remove_resources(&self, _spec: &ClusterSpec, _sync_set_name: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_cluster_dns(&self, _spec: &ClusterSpec) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn get_cluster_spec(&self, cluster_id: &str) -> anyhow::Result<Option<ClusterSpec>> {
            if self.unreachable {
                anyhow::bail!("ocm api unavailable");
            }
            Ok(self
                .specs
                .iter()
                .find(|spec| spec.internal_id == cluster_id)
                .cloned())
        }

        async fn get_cloud_providers(&self) -> anyhow::Result<CloudProviderInfoList> {
            Ok(CloudProviderInfoList::default())
        }

        async fn get_cloud_provider_regions(
            &self,
            _provider: &CloudProviderInfo,
        ) -> anyhow::Result<CloudProviderRegionInfoList> {
            Ok(CloudProviderRegionInfoList::default())
        }

        async fn get_machine_pool(
            &self,
            _cluster_id: &str,
            _machine_pool_id: &str,
        ) -> anyhow::Result<Option<MachinePoolInfo>> {
            Ok(None)
        }

        async fn create_machine_pool(
            &self,
            _request: &MachinePoolRequest,
        ) -> anyhow::Result<Option<MachinePoolRequest>> {
            Ok(None)
        }

        async fn get_cluster_resource_quota_costs(&self, _spec: &ClusterSpec) -> anyhow::Result<Vec<QuotaCost>> {
            Ok(Vec::new())
        }
    }

    fn provisioned_spec(multi_az: bool) -> ClusterSpec {
        ClusterSpec {
            external_id: "ocm-ext-1".to_string(),
            multi_az,
            cloud_provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            ..ClusterSpec::new(CLUSTER_ID, ClusterStatus::Provisioned)
        }
    }

    fn service(store: Arc<InMemoryClusterStore>, specs: Vec<ClusterSpec>) -> EnterpriseClusterService {
        service_with_provider(store, OcmClusters { specs, unreachable: false })
    }

    fn service_with_provider(
        store: Arc<InMemoryClusterStore>,
        provider: OcmClusters,
    ) -> EnterpriseClusterService {
        let providers = ProviderFactory::new().register(Arc::new(provider));
        let addon = ConfiguredFleetshardAddon::new(FleetshardAgentConfig {
            sso_client_id: "fleetshard-client".to_string(),
            sso_client_secret: "fleetshard-secret".into(),
            ..Default::default()
        });
        EnterpriseClusterService::new(providers, store, Arc::new(addon))
    }

    fn payload() -> EnterpriseClusterPayload {
        EnterpriseClusterPayload {
            cluster_id: CLUSTER_ID.to_string(),
            cluster_ingress_dns_name: "apps.enterprise.example.com".to_string(),
            kafka_machine_pool_node_count: 6,
            access_kafkas_via_private_network: true,
        }
    }

    fn admin() -> Claims {
        Claims::new("alice", "org-1", true)
    }

    #[test]
    fn test_node_count_rules() {
        assert!(validate_kafka_machine_pool_node_count(3).is_ok());
        assert!(validate_kafka_machine_pool_node_count(6).is_ok());
        assert!(validate_kafka_machine_pool_node_count(2).is_err());
        assert!(validate_kafka_machine_pool_node_count(5).is_err());
        assert!(validate_kafka_machine_pool_node_count(0).is_err());
    }

    #[tokio::test]
    async fn test_register_stores_enterprise_cluster() {
        let store = Arc::new(InMemoryClusterStore::new());
        let service = service(Arc::clone(&store), vec![provisioned_spec(true)]);

        let response = service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap();
        assert_eq!(response.cluster.id, CLUSTER_ID);
        assert_eq!(response.cluster.status, "cluster_accepted");
        assert!(response
            .fleetshard_parameters
            .iter()
            .any(|param| param.id == FLEETSHARD_PARAM_SERVICE_ACCOUNT_ID
                && param.value == "fleetshard-client"));

        let stored = store.find_cluster_by_id(CLUSTER_ID).await.unwrap().unwrap();
        assert_eq!(stored.cluster_type, ClusterType::Enterprise);
        assert_eq!(stored.provider_type, ClusterProviderType::Ocm);
        assert_eq!(stored.organization_id, "org-1");
        assert_eq!(stored.external_id, "ocm-ext-1");
        assert_eq!(stored.cluster_dns, "apps.enterprise.example.com");
        assert_eq!(stored.client_id, "fleetshard-client");
        assert_eq!(stored.dynamic_capacity_info["standard"].max_nodes, 6);
    }

    #[tokio::test]
    async fn test_register_requires_ocm_provider() {
        let store: Arc<InMemoryClusterStore> = Arc::new(InMemoryClusterStore::new());
        let addon = ConfiguredFleetshardAddon::new(FleetshardAgentConfig::default());
        let service = EnterpriseClusterService::new(ProviderFactory::new(), store, Arc::new(addon));
        let err = service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::General));
    }

    #[tokio::test]
    async fn test_register_keeps_provider_error() {
        let store = Arc::new(InMemoryClusterStore::new());
        let service = service_with_provider(
            Arc::clone(&store),
            OcmClusters {
                specs: vec![provisioned_spec(true)],
                unreachable: true,
            },
        );
        let err = service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::General));
        let cause = err.cause.as_ref().unwrap();
        assert!(cause.to_string().contains("ocm api unavailable"));
        assert!(store.find_cluster_by_id(CLUSTER_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_rejects_bad_payloads() {
        let service = service(Arc::new(InMemoryClusterStore::new()), vec![provisioned_spec(true)]);

        let mut short_id = payload();
        short_id.cluster_id = "abc".to_string();
        let err = service
            .register_enterprise_cluster(Some(&admin()), &short_id)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));

        let mut bad_dns = payload();
        bad_dns.cluster_ingress_dns_name = "Not A DNS Name".to_string();
        let err = service
            .register_enterprise_cluster(Some(&admin()), &bad_dns)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_register_twice_is_duplicate() {
        let service = service(Arc::new(InMemoryClusterStore::new()), vec![provisioned_spec(true)]);
        service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap();
        let err = service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::DuplicateClusterId));
    }

    #[tokio::test]
    async fn test_register_requires_multi_az_provisioned_cluster_and_admin() {
        let single_az = service(Arc::new(InMemoryClusterStore::new()), vec![provisioned_spec(false)]);
        let err = single_az
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));

        let mut provisioning = provisioned_spec(true);
        provisioning.status = ClusterStatus::Provisioning;
        let not_ready = service(Arc::new(InMemoryClusterStore::new()), vec![provisioning]);
        let err = not_ready
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::BadRequest));

        let unknown = service(Arc::new(InMemoryClusterStore::new()), Vec::new());
        let err = unknown
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::General));

        let store = Arc::new(InMemoryClusterStore::new());
        let service = service(Arc::clone(&store), vec![provisioned_spec(true)]);
        let err = service
            .register_enterprise_cluster(Some(&Claims::new("bob", "org-1", false)), &payload())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));
        assert!(store.find_cluster_by_id(CLUSTER_ID).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deregister_rules() {
        let store = Arc::new(InMemoryClusterStore::new());
        let service = service(Arc::clone(&store), vec![provisioned_spec(true)]);
        service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap();

        let err = service
            .deregister_enterprise_cluster(Some(&Claims::new("bob", "org-1", false)), CLUSTER_ID)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));

        let err = service
            .deregister_enterprise_cluster(Some(&Claims::new("eve", "org-2", true)), CLUSTER_ID)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Forbidden));

        let err = service
            .deregister_enterprise_cluster(Some(&admin()), "missing")
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));

        store.set_kafka_instance_count(CLUSTER_ID, 2).await;
        let err = service
            .deregister_enterprise_cluster(Some(&admin()), CLUSTER_ID)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Forbidden));

        store.set_kafka_instance_count(CLUSTER_ID, 0).await;
        service
            .deregister_enterprise_cluster(Some(&admin()), CLUSTER_ID)
            .await
            .unwrap();
        let stored = store.find_cluster_by_id(CLUSTER_ID).await.unwrap().unwrap();
        assert_eq!(stored.status, ClusterStatus::Deprovisioning);
    }

    #[tokio::test]
    async fn test_managed_cluster_cannot_be_deregistered() {
        let mut managed = Cluster::new(CLUSTER_ID, ClusterProviderType::Ocm, ClusterStatus::Ready);
        managed.organization_id = "org-1".to_string();
        let store = Arc::new(InMemoryClusterStore::with_clusters([managed]));
        let service = service(store, Vec::new());
        let err = service
            .deregister_enterprise_cluster(Some(&admin()), CLUSTER_ID)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn test_addon_params_require_admin() {
        let service = service(Arc::new(InMemoryClusterStore::new()), vec![provisioned_spec(true)]);
        service
            .register_enterprise_cluster(Some(&admin()), &payload())
            .await
            .unwrap();

        let with_params = service
            .get_enterprise_cluster_with_addon_params(Some(&admin()), CLUSTER_ID)
            .await
            .unwrap();
        assert!(!with_params.fleetshard_parameters.is_empty());

        let err = service
            .get_enterprise_cluster_with_addon_params(Some(&Claims::new("bob", "org-1", false)), CLUSTER_ID)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Unauthorized));

        let cluster = service
            .get_enterprise_cluster(Some(&Claims::new("bob", "org-1", false)), CLUSTER_ID)
            .await
            .unwrap();
        assert_eq!(cluster.href, format!("{API_BASE_PATH}/clusters/{CLUSTER_ID}"));
    }
}
