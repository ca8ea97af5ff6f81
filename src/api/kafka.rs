//! # Kafka Types
//!
//! Kafka instance records and the request payloads validated before they reach
//! the store.

use serde::{Deserialize, Serialize};

/// Billing model identifiers
pub mod billing_model {
    pub const EVAL: &str = "eval";
    pub const STANDARD: &str = "standard";
    pub const MARKETPLACE: &str = "marketplace";
    pub const ENTERPRISE: &str = "enterprise";
}

/// Kafka instance type identifiers
pub mod instance_type {
    pub const STANDARD: &str = "standard";
    pub const DEVELOPER: &str = "developer";
}

/// Lifecycle status of a kafka instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KafkaStatus {
    #[default]
    Accepted,
    Preparing,
    Provisioning,
    Ready,
    Failed,
    Deprovision,
    Deleting,
    Suspending,
    Suspended,
    Resuming,
}

impl KafkaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KafkaStatus::Accepted => "accepted",
            KafkaStatus::Preparing => "preparing",
            KafkaStatus::Provisioning => "provisioning",
            KafkaStatus::Ready => "ready",
            KafkaStatus::Failed => "failed",
            KafkaStatus::Deprovision => "deprovision",
            KafkaStatus::Deleting => "deleting",
            KafkaStatus::Suspending => "suspending",
            KafkaStatus::Suspended => "suspended",
            KafkaStatus::Resuming => "resuming",
        }
    }
}

impl std::fmt::Display for KafkaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing model promotion state, acting as an advisory single-flight lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KafkaPromotionStatus {
    #[default]
    #[serde(rename = "")]
    NoPromotion,
    #[serde(rename = "promoting")]
    Promoting,
    #[serde(rename = "failed")]
    Failed,
}

/// Quota backend the fleet manager is configured with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuotaType {
    #[default]
    #[serde(rename = "quota-management-list")]
    QuotaManagementList,
    #[serde(rename = "ams")]
    Ams,
}

impl QuotaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaType::QuotaManagementList => "quota-management-list",
            QuotaType::Ams => "ams",
        }
    }
}

impl std::fmt::Display for QuotaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored kafka instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaRequest {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub organisation_id: String,
    pub cluster_id: String,
    pub status: KafkaStatus,
    pub instance_type: String,
    pub size_id: String,
    pub cloud_provider: String,
    pub region: String,
    pub actual_kafka_billing_model: String,
    pub desired_kafka_billing_model: String,
    pub promotion_status: KafkaPromotionStatus,
    pub marketplace: String,
    pub billing_cloud_account_id: String,
    pub desired_strimzi_version: String,
    pub actual_strimzi_version: String,
    pub desired_kafka_version: String,
    pub actual_kafka_version: String,
    pub desired_kafka_ibp_version: String,
    pub actual_kafka_ibp_version: String,
    pub kafka_storage_size: String,
}

/// Billing model promotion requested by a user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaPromoteRequest {
    pub desired_kafka_billing_model: String,
    pub desired_marketplace: String,
    pub desired_billing_cloud_account_id: String,
}

/// Administrative update of a kafka instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaUpdateRequest {
    pub strimzi_version: String,
    pub kafka_version: String,
    pub kafka_ibp_version: String,
    /// Superseded by `max_data_retention_size`, still honoured
    #[serde(rename = "kafka_storage_size")]
    pub deprecated_kafka_storage_size: String,
    pub max_data_retention_size: String,
    pub suspended: Option<bool>,
}

/// Owner-facing update of a kafka instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaUserUpdateRequest {
    pub owner: Option<String>,
    pub reauthentication_enabled: Option<bool>,
}

/// Create request payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaRequestPayload {
    pub name: String,
    pub cloud_provider: String,
    pub region: String,
    pub plan: String,
    pub billing_model: Option<String>,
    pub billing_cloud_account_id: Option<String>,
    pub marketplace: Option<String>,
    pub cluster_id: Option<String>,
    pub reauthentication_enabled: Option<bool>,
}

impl KafkaRequestPayload {
    /// Dedicated (enterprise) cluster id, when one was supplied
    pub fn dedicated_cluster_id(&self) -> Option<&str> {
        self.cluster_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_status_serde() {
        let json = serde_json::to_string(&KafkaPromotionStatus::Promoting).unwrap();
        assert_eq!(json, "\"promoting\"");
        let parsed: KafkaPromotionStatus = serde_json::from_str("\"\"").unwrap();
        assert_eq!(parsed, KafkaPromotionStatus::NoPromotion);
    }

    #[test]
    fn test_quota_type_serde() {
        let parsed: QuotaType = serde_yaml::from_str("ams").unwrap();
        assert_eq!(parsed, QuotaType::Ams);
        assert_eq!(QuotaType::QuotaManagementList.as_str(), "quota-management-list");
    }

    #[test]
    fn test_dedicated_cluster_id_ignores_blank() {
        let mut payload = KafkaRequestPayload {
            cluster_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(payload.dedicated_cluster_id(), None);
        payload.cluster_id = Some("abc".to_string());
        assert_eq!(payload.dedicated_cluster_id(), Some("abc"));
    }
}
