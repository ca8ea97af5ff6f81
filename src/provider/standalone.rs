//! # Standalone Provider
//!
//! Manages clusters registered through the dataplane configuration. Nothing is
//! provisioned: the provider installs operators and identity providers by
//! applying resource sets directly with the [`ReconcilingApplier`], and derives
//! cloud providers and regions from the clusters already on record.

use super::ClusterProvider;
use crate::api::{
    CloudProviderInfo, CloudProviderInfoList, CloudProviderRegionInfo,
    CloudProviderRegionInfoList, ClusterProviderType, ClusterRequest, ClusterSpec, ClusterStatus,
    IdentityProviderInfo, MachinePoolInfo, MachinePoolRequest, Parameter, QuotaCost,
    SecretString,
};
use crate::config::{DataplaneClusterConfig, OperatorInstallationConfig};
use crate::constants::{
    IMAGE_PULL_SECRET_NAME, KAFKA_SRE_IDP_SECRET_NAME, KAS_FLEETSHARD_OPERATOR_CATALOG_SOURCE_NAME,
    KAS_FLEETSHARD_OPERATOR_OPERATOR_GROUP_NAME, KAS_FLEETSHARD_OPERATOR_PARAMETERS_SECRET_NAME,
    KAS_FLEETSHARD_OPERATOR_SUBSCRIPTION_NAME, OPENSHIFT_CONFIG_NAMESPACE,
    STRIMZI_OPERATOR_CATALOG_SOURCE_NAME, STRIMZI_OPERATOR_OPERATOR_GROUP_NAME,
    STRIMZI_OPERATOR_SUBSCRIPTION_NAME,
};
use crate::controller::reconciler::{
    ReconcilingApplier, ResourceDescriptor, ResourceMeta, ResourceSet,
};
use crate::crd::{
    identity_provider_document, CatalogSourceSpec, OperatorGroupSpec, SubscriptionSpec,
    APPROVAL_AUTOMATIC, SOURCE_TYPE_GRPC,
};
use crate::services::ClusterStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const DOCKER_CONFIG_JSON_SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";
const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";
const OPAQUE_SECRET_TYPE: &str = "Opaque";
const IDP_CLIENT_SECRET_KEY: &str = "clientSecret";

/// Labels carried by every object of the strimzi operator bundle
pub fn strimzi_operator_common_labels() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/component".to_string(),
            "strimzi-bundle".to_string(),
        ),
        (
            "app.kubernetes.io/part-of".to_string(),
            "managed-kafka".to_string(),
        ),
    ])
}

pub struct StandaloneProvider {
    applier: ReconcilingApplier,
    config: Arc<DataplaneClusterConfig>,
    store: Arc<dyn ClusterStore>,
}

impl std::fmt::Debug for StandaloneProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandaloneProvider")
            .field("applier", &self.applier)
            .finish_non_exhaustive()
    }
}

impl StandaloneProvider {
    pub fn new(
        applier: ReconcilingApplier,
        config: Arc<DataplaneClusterConfig>,
        store: Arc<dyn ClusterStore>,
    ) -> Self {
        Self {
            applier,
            config,
            store,
        }
    }

    /// Namespace, catalog source, operator group and subscription of the strimzi operator
    pub fn strimzi_operator_resources(&self) -> Result<ResourceSet> {
        let olm = &self.config.strimzi_operator_olm_config;
        let labels = strimzi_operator_common_labels();
        let resources = self.operator_bundle(
            olm,
            &OperatorBundleNames {
                catalog_source: STRIMZI_OPERATOR_CATALOG_SOURCE_NAME,
                operator_group: STRIMZI_OPERATOR_OPERATOR_GROUP_NAME,
                subscription: STRIMZI_OPERATOR_SUBSCRIPTION_NAME,
            },
            &labels,
            None,
        );
        ResourceSet::new(resources).context("Invalid strimzi operator resource set")
    }

    /// Fleet-shard operator bundle, with `params` stored in its parameters secret
    pub fn fleetshard_operator_resources(&self, params: &[Parameter]) -> Result<ResourceSet> {
        let olm = &self.config.kas_fleetshard_operator_olm_config;
        let string_data: BTreeMap<String, SecretString> = params
            .iter()
            .map(|param| (param.id.clone(), param.value.clone()))
            .collect();
        let params_secret = ResourceDescriptor::secret(
            ResourceMeta::namespaced(KAS_FLEETSHARD_OPERATOR_PARAMETERS_SECRET_NAME, &olm.namespace),
            None,
            string_data,
        );
        let resources = self.operator_bundle(
            olm,
            &OperatorBundleNames {
                catalog_source: KAS_FLEETSHARD_OPERATOR_CATALOG_SOURCE_NAME,
                operator_group: KAS_FLEETSHARD_OPERATOR_OPERATOR_GROUP_NAME,
                subscription: KAS_FLEETSHARD_OPERATOR_SUBSCRIPTION_NAME,
            },
            &BTreeMap::new(),
            Some(params_secret),
        );
        ResourceSet::new(resources).context("Invalid fleet-shard operator resource set")
    }

    /// Client secret followed by the `OAuth/cluster` patch that references it
    pub fn identity_provider_resources(
        &self,
        identity_provider: &IdentityProviderInfo,
    ) -> Result<ResourceSet> {
        let openid = identity_provider
            .openid
            .as_ref()
            .context("Identity provider has no OpenID configuration")?;
        let client_secret = ResourceDescriptor::secret(
            ResourceMeta::namespaced(KAFKA_SRE_IDP_SECRET_NAME, OPENSHIFT_CONFIG_NAMESPACE),
            Some(OPAQUE_SECRET_TYPE.to_string()),
            BTreeMap::from([(
                IDP_CLIENT_SECRET_KEY.to_string(),
                openid.client_secret.clone(),
            )]),
        );
        let oauth = ResourceDescriptor::unstructured(identity_provider_document(openid))?;
        ResourceSet::new(vec![client_secret, oauth]).context("Invalid identity provider resource set")
    }

    /// Namespace, [extra], [pull secret], catalog source, operator group, subscription
    fn operator_bundle(
        &self,
        olm: &OperatorInstallationConfig,
        names: &OperatorBundleNames,
        labels: &BTreeMap<String, String>,
        extra: Option<ResourceDescriptor>,
    ) -> Vec<ResourceDescriptor> {
        let namespaced = |name: &str| {
            ResourceMeta::namespaced(name, &olm.namespace).with_labels(labels.clone())
        };

        let mut resources = vec![ResourceDescriptor::namespace(
            ResourceMeta::cluster_scoped(&olm.namespace).with_labels(labels.clone()),
        )];
        resources.extend(extra);

        let mut pull_secrets = Vec::new();
        if self.config.has_image_pull_secret() {
            resources.push(ResourceDescriptor::secret(
                namespaced(IMAGE_PULL_SECRET_NAME),
                Some(DOCKER_CONFIG_JSON_SECRET_TYPE.to_string()),
                BTreeMap::from([(
                    DOCKER_CONFIG_JSON_KEY.to_string(),
                    self.config.image_pull_docker_config_content.clone(),
                )]),
            ));
            pull_secrets.push(IMAGE_PULL_SECRET_NAME.to_string());
        }

        resources.push(ResourceDescriptor::catalog_source(
            namespaced(names.catalog_source),
            CatalogSourceSpec {
                source_type: SOURCE_TYPE_GRPC.to_string(),
                image: olm.index_image.clone(),
                secrets: pull_secrets,
            },
        ));
        // No target namespaces: the operator watches all namespaces
        resources.push(ResourceDescriptor::operator_group(
            namespaced(names.operator_group),
            OperatorGroupSpec::default(),
        ));
        resources.push(ResourceDescriptor::subscription(
            namespaced(names.subscription),
            SubscriptionSpec {
                catalog_source: names.catalog_source.to_string(),
                catalog_source_namespace: olm.namespace.clone(),
                package: olm.package.clone(),
                channel: olm.sub_channel.clone(),
                starting_csv: olm.sub_starting_csv.clone(),
                install_plan_approval: APPROVAL_AUTOMATIC.to_string(),
                config: olm.sub_config.clone(),
            },
        ));
        resources
    }
}

struct OperatorBundleNames {
    catalog_source: &'static str,
    operator_group: &'static str,
    subscription: &'static str,
}

#[async_trait]
impl ClusterProvider for StandaloneProvider {
    fn provider_type(&self) -> ClusterProviderType {
        ClusterProviderType::Standalone
    }

    async fn create(&self, _request: &ClusterRequest) -> Result<Option<ClusterSpec>> {
        Ok(None)
    }

    async fn delete(&self, _spec: &ClusterSpec) -> Result<bool> {
        Ok(true)
    }

    async fn check_status(&self, mut spec: ClusterSpec) -> Result<ClusterSpec> {
        if matches!(
            spec.status,
            ClusterStatus::Accepted | ClusterStatus::Provisioning
        ) {
            spec.transition_to(ClusterStatus::Provisioned)?;
        }
        Ok(spec)
    }

    async fn install_base_operator(
        &self,
        spec: &ClusterSpec,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let resources = self.strimzi_operator_resources()?;
        self.apply_resources(spec, resources, cancel).await?;
        info!("✅ Strimzi operator applied to cluster {}", spec.internal_id);
        Ok(true)
    }

    async fn install_agent(
        &self,
        spec: &ClusterSpec,
        params: &[Parameter],
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let resources = self.fleetshard_operator_resources(params)?;
        self.apply_resources(spec, resources, cancel).await?;
        info!(
            "✅ Fleet-shard operator applied to cluster {}",
            spec.internal_id
        );
        Ok(true)
    }

    async fn install_cluster_logging(
        &self,
        _spec: &ClusterSpec,
        _params: &[Parameter],
        _cancel: &CancellationToken,
    ) -> Result<bool> {
        Ok(true)
    }

    async fn add_identity_provider(
        &self,
        spec: &ClusterSpec,
        identity_provider: IdentityProviderInfo,
        cancel: &CancellationToken,
    ) -> Result<IdentityProviderInfo> {
        let resources = self.identity_provider_resources(&identity_provider)?;
        self.apply_resources(spec, resources, cancel).await?;
        Ok(identity_provider)
    }

    async fn apply_resources(
        &self,
        spec: &ClusterSpec,
        resources: ResourceSet,
        cancel: &CancellationToken,
    ) -> Result<ResourceSet> {
        Ok(self.applier.apply(spec, resources, cancel).await?)
    }

    async fn remove_resources(&self, spec: &ClusterSpec, sync_set_name: &str) -> Result<()> {
        debug!(
            "Standalone cluster {} keeps resources of {}",
            spec.internal_id, sync_set_name
        );
        Ok(())
    }

    async fn get_cluster_dns(&self, _spec: &ClusterSpec) -> Result<String> {
        Ok(String::new())
    }

    async fn get_cluster_spec(&self, _cluster_id: &str) -> Result<Option<ClusterSpec>> {
        Ok(None)
    }

    async fn get_cloud_providers(&self) -> Result<CloudProviderInfoList> {
        let providers = self
            .store
            .distinct_cloud_providers(
                ClusterProviderType::Standalone,
                ClusterStatus::deletion_statuses(),
            )
            .await
            .context("Failed to list standalone cloud providers")?;
        Ok(CloudProviderInfoList {
            items: providers
                .into_iter()
                .map(|provider| CloudProviderInfo {
                    id: provider.clone(),
                    name: provider.clone(),
                    display_name: provider,
                })
                .collect(),
        })
    }

    async fn get_cloud_provider_regions(
        &self,
        provider: &CloudProviderInfo,
    ) -> Result<CloudProviderRegionInfoList> {
        let regions = self
            .store
            .distinct_regions(
                &provider.id,
                ClusterProviderType::Standalone,
                ClusterStatus::deletion_statuses(),
            )
            .await
            .with_context(|| format!("Failed to list standalone regions of {}", provider.id))?;
        Ok(CloudProviderRegionInfoList {
            items: regions
                .into_iter()
                .map(|record| CloudProviderRegionInfo {
                    id: record.region.clone(),
                    name: record.region.clone(),
                    display_name: record.region,
                    supports_multi_az: record.multi_az,
                    cloud_provider_id: provider.id.clone(),
                })
                .collect(),
        })
    }

    async fn get_machine_pool(
        &self,
        cluster_id: &str,
        machine_pool_id: &str,
    ) -> Result<Option<MachinePoolInfo>> {
        Ok(Some(MachinePoolInfo {
            id: machine_pool_id.to_string(),
            cluster_id: cluster_id.to_string(),
            replicas: None,
        }))
    }

    async fn create_machine_pool(
        &self,
        _request: &MachinePoolRequest,
    ) -> Result<Option<MachinePoolRequest>> {
        Ok(None)
    }

    async fn get_cluster_resource_quota_costs(&self, _spec: &ClusterSpec) -> Result<Vec<QuotaCost>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Cluster, OpenIdIdentityProvider};
    use crate::controller::reconciler::{
        InMemoryClusterApi, RemoteClusterApi, StaticConnector, Verb,
    };
    use crate::services::InMemoryClusterStore;

    fn dataplane_config(pull_secret: &str) -> DataplaneClusterConfig {
        DataplaneClusterConfig {
            strimzi_operator_olm_config: OperatorInstallationConfig {
                namespace: "redhat-managed-kafka-operator".to_string(),
                index_image: "quay.io/osd-addons/managed-kafka:production".to_string(),
                package: "managed-kafka".to_string(),
                sub_channel: "stable".to_string(),
                ..Default::default()
            },
            kas_fleetshard_operator_olm_config: OperatorInstallationConfig {
                namespace: "redhat-kas-fleetshard-operator".to_string(),
                index_image: "quay.io/osd-addons/kas-fleetshard-operator:production".to_string(),
                package: "kas-fleetshard-operator".to_string(),
                sub_channel: "stable".to_string(),
                ..Default::default()
            },
            image_pull_docker_config_content: SecretString::new(pull_secret),
            ..Default::default()
        }
    }

    fn provider_with(
        config: DataplaneClusterConfig,
        remote: &Arc<InMemoryClusterApi>,
        store: InMemoryClusterStore,
    ) -> StandaloneProvider {
        let connector = StaticConnector::new(Arc::clone(remote) as Arc<dyn RemoteClusterApi>);
        StandaloneProvider::new(
            ReconcilingApplier::new(Arc::new(connector)),
            Arc::new(config),
            Arc::new(store),
        )
    }

    fn kinds(set: &ResourceSet) -> Vec<&str> {
        set.iter().map(ResourceDescriptor::kind).collect()
    }

    #[test]
    fn test_strimzi_resources_are_ordered_and_labelled() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());
        let set = provider.strimzi_operator_resources().unwrap();
        assert_eq!(
            kinds(&set),
            vec!["Namespace", "CatalogSource", "OperatorGroup", "Subscription"]
        );
        for descriptor in &set {
            assert_eq!(descriptor.meta().labels, strimzi_operator_common_labels());
        }
    }

    #[test]
    fn test_pull_secret_precedes_catalog_source() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(
            dataplane_config("{\"auths\":{}}"),
            &remote,
            InMemoryClusterStore::new(),
        );
        let set = provider.strimzi_operator_resources().unwrap();
        assert_eq!(
            kinds(&set),
            vec!["Namespace", "Secret", "CatalogSource", "OperatorGroup", "Subscription"]
        );
        let catalog_source = set
            .iter()
            .find(|d| d.kind() == "CatalogSource")
            .unwrap();
        match catalog_source {
            ResourceDescriptor::CatalogSource { spec, .. } => {
                assert_eq!(spec.secrets, vec![IMAGE_PULL_SECRET_NAME.to_string()]);
            }
            other => panic!("unexpected descriptor {other:?}"),
        }
    }

    #[test]
    fn test_fleetshard_secret_holds_one_key_per_parameter() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());
        let params = vec![
            Parameter::new("cluster-id", "abc"),
            Parameter::new("sso-secret", "s3cr3t"),
        ];
        let set = provider.fleetshard_operator_resources(&params).unwrap();
        assert_eq!(
            kinds(&set),
            vec!["Namespace", "Secret", "CatalogSource", "OperatorGroup", "Subscription"]
        );
        match set.iter().nth(1).unwrap() {
            ResourceDescriptor::Secret {
                meta, string_data, ..
            } => {
                assert_eq!(meta.name, KAS_FLEETSHARD_OPERATOR_PARAMETERS_SECRET_NAME);
                assert_eq!(string_data.len(), 2);
                assert_eq!(string_data["sso-secret"].expose(), "s3cr3t");
            }
            other => panic!("unexpected descriptor {other:?}"),
        }
    }

    #[test]
    fn test_identity_provider_requires_openid() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());
        assert!(provider
            .identity_provider_resources(&IdentityProviderInfo::default())
            .is_err());
    }

    #[tokio::test]
    async fn test_install_base_operator_applies_bundle() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());
        let spec = ClusterSpec::new("abc", ClusterStatus::Provisioned);

        assert!(provider
            .install_base_operator(&spec, &CancellationToken::new())
            .await
            .unwrap());
        assert_eq!(remote.object_count(), 4);
        assert!(remote
            .object("Namespace", None, "redhat-managed-kafka-operator")
            .is_some());
        let subscription = remote
            .object(
                "Subscription",
                Some("redhat-managed-kafka-operator"),
                STRIMZI_OPERATOR_SUBSCRIPTION_NAME,
            )
            .unwrap();
        assert_eq!(subscription["spec"]["installPlanApproval"], "Automatic");
        assert_eq!(
            subscription["spec"]["source"],
            STRIMZI_OPERATOR_CATALOG_SOURCE_NAME
        );
    }

    #[tokio::test]
    async fn test_add_identity_provider_writes_secret_then_patch() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());
        let spec = ClusterSpec::new("abc", ClusterStatus::Ready);
        let idp = IdentityProviderInfo {
            openid: Some(OpenIdIdentityProvider {
                id: String::new(),
                name: "kafka-sre".to_string(),
                client_id: "kafka-sre-client".to_string(),
                client_secret: SecretString::new("idp-secret"),
                issuer: "https://sso.example.com/auth/realms/sre".to_string(),
            }),
        };

        let returned = provider
            .add_identity_provider(&spec, idp.clone(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(returned, idp);

        let writes = remote.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].kind, "Secret");
        assert_eq!(writes[0].namespace.as_deref(), Some(OPENSHIFT_CONFIG_NAMESPACE));
        assert_eq!(writes[1].kind, "OAuth");
        assert_eq!(writes[1].namespace, None);
        assert!(writes.iter().all(|w| w.verb == Verb::Create));
        assert!(!writes[1]
            .body
            .as_ref()
            .unwrap()
            .to_string()
            .contains("idp-secret"));
    }

    #[tokio::test]
    async fn test_check_status_reports_provisioned() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());

        let accepted = ClusterSpec::new("abc", ClusterStatus::Accepted);
        let checked = provider.check_status(accepted).await.unwrap();
        assert_eq!(checked.status, ClusterStatus::Provisioned);

        let ready = ClusterSpec::new("abc", ClusterStatus::Ready);
        let checked = provider.check_status(ready).await.unwrap();
        assert_eq!(checked.status, ClusterStatus::Ready);
    }

    #[tokio::test]
    async fn test_cloud_providers_and_regions_come_from_store() {
        let mut live = Cluster::new("a", ClusterProviderType::Standalone, ClusterStatus::Ready);
        live.cloud_provider = "aws".to_string();
        live.region = "us-east-1".to_string();
        live.multi_az = true;
        let mut deleting =
            Cluster::new("b", ClusterProviderType::Standalone, ClusterStatus::Deleting);
        deleting.cloud_provider = "gcp".to_string();
        deleting.region = "europe-west1".to_string();

        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(
            dataplane_config(""),
            &remote,
            InMemoryClusterStore::with_clusters([live, deleting]),
        );

        let providers = provider.get_cloud_providers().await.unwrap();
        assert_eq!(providers.items.len(), 1);
        assert_eq!(providers.items[0].id, "aws");

        let regions = provider
            .get_cloud_provider_regions(&providers.items[0])
            .await
            .unwrap();
        assert_eq!(regions.items.len(), 1);
        assert_eq!(regions.items[0].id, "us-east-1");
        assert!(regions.items[0].supports_multi_az);
        assert_eq!(regions.items[0].cloud_provider_id, "aws");
    }

    #[tokio::test]
    async fn test_capacity_hooks_are_placeholders() {
        let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
        let provider = provider_with(dataplane_config(""), &remote, InMemoryClusterStore::new());
        let spec = ClusterSpec::new("abc", ClusterStatus::Ready);

        let pool = provider.get_machine_pool("abc", "kafka-standard").await.unwrap();
        assert_eq!(pool.unwrap().id, "kafka-standard");
        assert!(provider
            .create_machine_pool(&MachinePoolRequest::default())
            .await
            .unwrap()
            .is_none());
        assert!(provider
            .get_cluster_resource_quota_costs(&spec)
            .await
            .unwrap()
            .is_empty());
        assert!(provider.get_cluster_spec("abc").await.unwrap().is_none());
    }
}
