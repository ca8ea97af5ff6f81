//! # Cluster Types
//!
//! Data plane cluster records, lifecycle status and the provider-facing cluster spec.

use crate::api::secret::SecretString;
use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status of a data plane cluster
///
/// Accepted → Provisioning → Provisioned → Ready; any live state may fail or be
/// deprovisioned; Deprovisioning → Deleting, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterStatus {
    #[serde(rename = "cluster_accepted")]
    Accepted,
    #[serde(rename = "cluster_provisioning")]
    Provisioning,
    #[serde(rename = "cluster_provisioned")]
    Provisioned,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "failed")]
    Failed,
    #[serde(rename = "deprovisioning")]
    Deprovisioning,
    #[serde(rename = "deleting")]
    Deleting,
}

impl ClusterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterStatus::Accepted => "cluster_accepted",
            ClusterStatus::Provisioning => "cluster_provisioning",
            ClusterStatus::Provisioned => "cluster_provisioned",
            ClusterStatus::Ready => "ready",
            ClusterStatus::Failed => "failed",
            ClusterStatus::Deprovisioning => "deprovisioning",
            ClusterStatus::Deleting => "deleting",
        }
    }

    /// Statuses excluded from active fleet queries
    pub fn deletion_statuses() -> &'static [ClusterStatus] {
        &[ClusterStatus::Deprovisioning, ClusterStatus::Deleting]
    }

    pub fn is_deletion(&self) -> bool {
        Self::deletion_statuses().contains(self)
    }

    /// Position in the provisioning chain, `None` for failure and deletion states
    fn provisioning_rank(&self) -> Option<u8> {
        match self {
            ClusterStatus::Accepted => Some(0),
            ClusterStatus::Provisioning => Some(1),
            ClusterStatus::Provisioned => Some(2),
            ClusterStatus::Ready => Some(3),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Re-reporting the current status is always legal so status polling stays idempotent.
    pub fn can_transition_to(&self, next: ClusterStatus) -> bool {
        if *self == next {
            return true;
        }
        match (self, next) {
            (ClusterStatus::Deleting, _) => false,
            (ClusterStatus::Deprovisioning, ClusterStatus::Deleting) => true,
            (ClusterStatus::Deprovisioning, _) => false,
            (_, ClusterStatus::Failed | ClusterStatus::Deprovisioning) => true,
            _ => match (self.provisioning_rank(), next.provisioning_rank()) {
                (Some(current), Some(wanted)) => wanted > current,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cluster_accepted" | "accepted" => Ok(ClusterStatus::Accepted),
            "cluster_provisioning" | "provisioning" => Ok(ClusterStatus::Provisioning),
            "cluster_provisioned" | "provisioned" => Ok(ClusterStatus::Provisioned),
            "ready" => Ok(ClusterStatus::Ready),
            "failed" => Ok(ClusterStatus::Failed),
            "deprovisioning" => Ok(ClusterStatus::Deprovisioning),
            "deleting" => Ok(ClusterStatus::Deleting),
            other => Err(anyhow::anyhow!("unknown cluster status '{other}'")),
        }
    }
}

/// Backing implementation a cluster is managed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClusterProviderType {
    #[serde(rename = "ocm")]
    Ocm,
    #[serde(rename = "aws_eks")]
    Aws,
    #[serde(rename = "standalone")]
    Standalone,
}

impl ClusterProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterProviderType::Ocm => "ocm",
            ClusterProviderType::Aws => "aws_eks",
            ClusterProviderType::Standalone => "standalone",
        }
    }
}

impl std::fmt::Display for ClusterProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who owns the data plane cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    /// Provisioned and owned by the control plane
    #[default]
    Managed,
    /// Registered by a customer organisation
    Enterprise,
}

impl ClusterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterType::Managed => "managed",
            ClusterType::Enterprise => "enterprise",
        }
    }
}

/// Externally visible state of a cluster as seen by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Fleet manager cluster id
    pub internal_id: String,
    /// Id assigned by the backing provider
    pub external_id: String,
    pub multi_az: bool,
    pub status: ClusterStatus,
    pub cloud_provider: String,
    pub region: String,
    #[serde(default)]
    pub dns_base: String,
}

impl ClusterSpec {
    pub fn new(internal_id: impl Into<String>, status: ClusterStatus) -> Self {
        Self {
            internal_id: internal_id.into(),
            external_id: String::new(),
            multi_az: false,
            status,
            cloud_provider: String::new(),
            region: String::new(),
            dns_base: String::new(),
        }
    }

    /// Move the cluster to `next`, refusing transitions the lifecycle does not allow
    pub fn transition_to(&mut self, next: ClusterStatus) -> ServiceResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::conflict(format!(
                "cluster {} cannot transition from {} to {}",
                self.internal_id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Capacity limits for one instance type on a cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicCapacityInfo {
    pub max_nodes: i32,
}

/// Strimzi operator version installed on a cluster with the kafka versions it can run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrimziVersion {
    pub version: String,
    pub ready: bool,
    #[serde(default)]
    pub kafka_versions: Vec<String>,
    #[serde(default)]
    pub kafka_ibp_versions: Vec<String>,
}

/// Backing-store record of a data plane cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    #[serde(default)]
    pub external_id: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub cluster_type: ClusterType,
    pub provider_type: ClusterProviderType,
    pub status: ClusterStatus,
    #[serde(default)]
    pub cloud_provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    pub cluster_dns: String,
    #[serde(default)]
    pub access_kafkas_via_private_network: bool,
    #[serde(default)]
    pub supported_instance_type: String,
    #[serde(default)]
    pub dynamic_capacity_info: BTreeMap<String, DynamicCapacityInfo>,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: SecretString,
    #[serde(default)]
    pub available_strimzi_versions: Vec<StrimziVersion>,
}

impl Cluster {
    pub fn new(
        cluster_id: impl Into<String>,
        provider_type: ClusterProviderType,
        status: ClusterStatus,
    ) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            external_id: String::new(),
            organization_id: String::new(),
            cluster_type: ClusterType::Managed,
            provider_type,
            status,
            cloud_provider: String::new(),
            region: String::new(),
            multi_az: false,
            cluster_dns: String::new(),
            access_kafkas_via_private_network: false,
            supported_instance_type: String::new(),
            dynamic_capacity_info: BTreeMap::new(),
            client_id: String::new(),
            client_secret: SecretString::default(),
            available_strimzi_versions: Vec::new(),
        }
    }

    /// Spec view handed to providers
    pub fn spec(&self) -> ClusterSpec {
        ClusterSpec {
            internal_id: self.cluster_id.clone(),
            external_id: self.external_id.clone(),
            multi_az: self.multi_az,
            status: self.status,
            cloud_provider: self.cloud_provider.clone(),
            region: self.region.clone(),
            dns_base: self.cluster_dns.clone(),
        }
    }
}

/// Key/value pair used to materialize agent credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    pub value: SecretString,
}

impl Parameter {
    pub fn new(id: impl Into<String>, value: impl Into<SecretString>) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Look up a parameter value by id
pub fn find_param<'a>(params: &'a [Parameter], id: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|param| param.id == id)
        .map(|param| param.value.expose())
}

/// OpenID client configuration registered as a cluster identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdIdentityProvider {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub issuer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderInfo {
    #[serde(default)]
    pub openid: Option<OpenIdIdentityProvider>,
}

/// Request to create a new cluster through a provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub cloud_provider: String,
    pub region: String,
    pub multi_az: bool,
    #[serde(default)]
    pub additional_spec: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudProviderInfo {
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudProviderInfoList {
    pub items: Vec<CloudProviderInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudProviderRegionInfo {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub supports_multi_az: bool,
    pub cloud_provider_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudProviderRegionInfoList {
    pub items: Vec<CloudProviderRegionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePoolInfo {
    pub id: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachinePoolRequest {
    pub id: String,
    pub cluster_id: String,
    pub instance_size: String,
    pub replicas: i32,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Quota consumption reported by a provider's billing backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCost {
    pub quota_id: String,
    pub allowed: i64,
    pub consumed: i64,
}
