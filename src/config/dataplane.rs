//! # Dataplane Cluster Configuration
//!
//! YAML-loaded description of the data plane: how the strimzi and fleet-shard
//! operators are installed through OLM, the clusters the fleet manager manages
//! directly, and the fleet-shard agent settings.
//!
//! ```yaml
//! strimzi_operator_olm_config:
//!   namespace: redhat-managed-kafka-operator
//!   index_image: quay.io/osd-addons/managed-kafka:production
//!   package: managed-kafka
//!   sub_channel: stable
//! kas_fleetshard_operator_olm_config:
//!   namespace: redhat-kas-fleetshard-operator
//!   index_image: quay.io/osd-addons/kas-fleetshard-operator:production
//!   package: kas-fleetshard-operator
//!   sub_channel: stable
//! clusters:
//!   - cluster_id: 1234abcd1234abcd1234abcd1234abcd
//!     kubeconfig_context: dataplane-1
//!     cloud_provider: aws
//!     region: us-east-1
//! ```

use crate::api::{
    Cluster, ClusterProviderType, ClusterStatus, ClusterType, DynamicCapacityInfo, SecretString,
    StrimziVersion,
};
use crate::constants::{DEFAULT_FLEETSHARD_POLL_INTERVAL, DEFAULT_FLEETSHARD_RESYNC_INTERVAL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// OLM installation settings of one operator bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorInstallationConfig {
    pub namespace: String,
    pub index_image: String,
    pub package: String,
    pub sub_channel: String,
    pub sub_starting_csv: String,
    /// Passed through to `Subscription.spec.config`
    pub sub_config: Option<Value>,
}

/// A data plane cluster registered through configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualClusterConfig {
    pub cluster_id: String,
    /// Kubeconfig context used to reach the cluster; the current context when unset
    pub kubeconfig_context: Option<String>,
    pub external_id: String,
    pub organization_id: String,
    pub cluster_type: ClusterType,
    pub provider_type: ClusterProviderType,
    pub status: ClusterStatus,
    pub cloud_provider: String,
    pub region: String,
    pub multi_az: bool,
    pub cluster_dns: String,
    pub supported_instance_type: String,
    pub kafka_instance_limit: i32,
    pub available_strimzi_versions: Vec<StrimziVersion>,
}

impl Default for ManualClusterConfig {
    fn default() -> Self {
        Self {
            cluster_id: String::new(),
            kubeconfig_context: None,
            external_id: String::new(),
            organization_id: String::new(),
            cluster_type: ClusterType::Managed,
            provider_type: ClusterProviderType::Standalone,
            status: ClusterStatus::Accepted,
            cloud_provider: String::new(),
            region: String::new(),
            multi_az: true,
            cluster_dns: String::new(),
            supported_instance_type: "standard,developer".to_string(),
            kafka_instance_limit: 0,
            available_strimzi_versions: Vec::new(),
        }
    }
}

impl ManualClusterConfig {
    /// Backing-store record for this cluster
    pub fn to_cluster(&self) -> Cluster {
        let mut cluster = Cluster::new(&self.cluster_id, self.provider_type, self.status);
        cluster.external_id.clone_from(&self.external_id);
        cluster.organization_id.clone_from(&self.organization_id);
        cluster.cluster_type = self.cluster_type;
        cluster.cloud_provider.clone_from(&self.cloud_provider);
        cluster.region.clone_from(&self.region);
        cluster.multi_az = self.multi_az;
        cluster.cluster_dns.clone_from(&self.cluster_dns);
        cluster
            .supported_instance_type
            .clone_from(&self.supported_instance_type);
        cluster
            .available_strimzi_versions
            .clone_from(&self.available_strimzi_versions);
        if self.kafka_instance_limit > 0 {
            for instance_type in self.supported_instance_type.split(',').map(str::trim) {
                cluster.dynamic_capacity_info.insert(
                    instance_type.to_string(),
                    DynamicCapacityInfo {
                        max_nodes: self.kafka_instance_limit,
                    },
                );
            }
        }
        cluster
    }
}

/// Settings handed to the fleet-shard agent through its parameters secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetshardAgentConfig {
    /// Control plane URL the agent syncs with
    pub control_plane_url: String,
    pub poll_interval: String,
    pub resync_interval: String,
    /// Service account the agent authenticates with
    pub sso_client_id: String,
    pub sso_client_secret: SecretString,
}

impl Default for FleetshardAgentConfig {
    fn default() -> Self {
        Self {
            control_plane_url: "http://localhost:8000".to_string(),
            poll_interval: DEFAULT_FLEETSHARD_POLL_INTERVAL.to_string(),
            resync_interval: DEFAULT_FLEETSHARD_RESYNC_INTERVAL.to_string(),
            sso_client_id: String::new(),
            sso_client_secret: SecretString::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataplaneClusterConfig {
    pub strimzi_operator_olm_config: OperatorInstallationConfig,
    pub kas_fleetshard_operator_olm_config: OperatorInstallationConfig,
    /// Docker config JSON for pulling bundle images; empty disables the pull secret
    pub image_pull_docker_config_content: SecretString,
    pub clusters: Vec<ManualClusterConfig>,
    pub fleetshard: FleetshardAgentConfig,
}

impl DataplaneClusterConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse dataplane cluster configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read dataplane cluster configuration {}",
                path.display()
            )
        })?;
        Self::from_yaml(&content)
    }

    pub fn has_image_pull_secret(&self) -> bool {
        !self.image_pull_docker_config_content.is_empty()
    }

    /// cluster id → kubeconfig context, for clusters that name one
    pub fn kubeconfig_contexts(&self) -> BTreeMap<String, String> {
        self.clusters
            .iter()
            .filter_map(|cluster| {
                cluster
                    .kubeconfig_context
                    .as_ref()
                    .map(|context| (cluster.cluster_id.clone(), context.clone()))
            })
            .collect()
    }

    pub fn find_cluster(&self, cluster_id: &str) -> Option<&ManualClusterConfig> {
        self.clusters
            .iter()
            .find(|cluster| cluster.cluster_id == cluster_id)
    }
}
