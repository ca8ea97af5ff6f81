//! # Kafka Configuration
//!
//! Instance types, their sizes and billing models, naming rules, the quota
//! backend and the promotion policy.

use crate::api::{billing_model, instance_type, KafkaStatus, QuotaType};
use crate::constants::{KAFKA_CLUSTER_NAME_PATTERN, MAX_KAFKA_NAME_LENGTH};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One size of an instance type (`x1`, `x2`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaInstanceSize {
    pub id: String,
    pub display_name: String,
    /// Storage quantity, e.g. `1000Gi`
    pub max_data_retention_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaInstanceTypeConfig {
    pub id: String,
    pub display_name: String,
    pub supported_billing_models: Vec<String>,
    pub sizes: Vec<KafkaInstanceSize>,
}

impl KafkaInstanceTypeConfig {
    pub fn supports_billing_model(&self, billing_model: &str) -> bool {
        self.supported_billing_models
            .iter()
            .any(|model| model.eq_ignore_ascii_case(billing_model))
    }

    pub fn size(&self, size_id: &str) -> Option<&KafkaInstanceSize> {
        self.sizes.iter().find(|size| size.id == size_id)
    }
}

/// Which source models, statuses and destinations a billing-model promotion accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionPolicy {
    pub promotable_billing_models: Vec<String>,
    pub promotable_statuses: Vec<KafkaStatus>,
    pub promotion_destinations: Vec<String>,
    /// Destinations billed through a cloud marketplace
    pub marketplace_billing_models: Vec<String>,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        Self {
            promotable_billing_models: vec![billing_model::EVAL.to_string()],
            promotable_statuses: vec![
                KafkaStatus::Ready,
                KafkaStatus::Suspended,
                KafkaStatus::Resuming,
            ],
            promotion_destinations: vec![
                billing_model::STANDARD.to_string(),
                billing_model::MARKETPLACE.to_string(),
            ],
            marketplace_billing_models: vec![billing_model::MARKETPLACE.to_string()],
        }
    }
}

impl PromotionPolicy {
    pub fn is_marketplace(&self, billing_model: &str) -> bool {
        self.marketplace_billing_models
            .iter()
            .any(|model| model == billing_model)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub max_kafka_name_length: usize,
    pub kafka_cluster_name_pattern: String,
    pub quota_type: QuotaType,
    pub supported_instance_types: Vec<KafkaInstanceTypeConfig>,
    pub promotion: PromotionPolicy,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            max_kafka_name_length: MAX_KAFKA_NAME_LENGTH,
            kafka_cluster_name_pattern: KAFKA_CLUSTER_NAME_PATTERN.to_string(),
            quota_type: QuotaType::default(),
            supported_instance_types: vec![
                KafkaInstanceTypeConfig {
                    id: instance_type::STANDARD.to_string(),
                    display_name: "Standard".to_string(),
                    supported_billing_models: vec![
                        billing_model::STANDARD.to_string(),
                        billing_model::MARKETPLACE.to_string(),
                        billing_model::ENTERPRISE.to_string(),
                        billing_model::EVAL.to_string(),
                    ],
                    sizes: vec![
                        KafkaInstanceSize {
                            id: "x1".to_string(),
                            display_name: "1".to_string(),
                            max_data_retention_size: "1000Gi".to_string(),
                        },
                        KafkaInstanceSize {
                            id: "x2".to_string(),
                            display_name: "2".to_string(),
                            max_data_retention_size: "2000Gi".to_string(),
                        },
                    ],
                },
                KafkaInstanceTypeConfig {
                    id: instance_type::DEVELOPER.to_string(),
                    display_name: "Trial".to_string(),
                    supported_billing_models: vec![billing_model::STANDARD.to_string()],
                    sizes: vec![KafkaInstanceSize {
                        id: "x1".to_string(),
                        display_name: "1".to_string(),
                        max_data_retention_size: "10Gi".to_string(),
                    }],
                },
            ],
            promotion: PromotionPolicy::default(),
        }
    }
}

impl KafkaConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse kafka configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read kafka configuration {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn instance_type(&self, id: &str) -> Option<&KafkaInstanceTypeConfig> {
        self.supported_instance_types
            .iter()
            .find(|instance_type| instance_type.id == id)
    }

    pub fn instance_size(&self, instance_type: &str, size_id: &str) -> Option<&KafkaInstanceSize> {
        self.instance_type(instance_type)
            .and_then(|instance_type| instance_type.size(size_id))
    }

    pub fn first_available_size(&self, instance_type: &str) -> Option<&KafkaInstanceSize> {
        self.instance_type(instance_type)
            .and_then(|instance_type| instance_type.sizes.first())
    }
}

/// Split a plan such as `standard.x1` into instance type and size
pub fn parse_plan(plan: &str) -> Option<(&str, &str)> {
    let (instance_type, size) = plan.split_once('.')?;
    if instance_type.is_empty() || size.is_empty() || size.contains('.') {
        return None;
    }
    Some((instance_type, size))
}
