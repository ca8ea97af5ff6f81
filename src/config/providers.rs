//! # Cloud Provider Configuration
//!
//! Supported cloud providers, their regions and the instance types each region accepts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Per-region limit for an instance type; `None` is unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceTypeLimit {
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub name: String,
    pub default: bool,
    pub supported_instance_types: BTreeMap<String, InstanceTypeLimit>,
}

impl RegionConfig {
    pub fn supports_instance_type(&self, instance_type: &str) -> bool {
        self.supported_instance_types.contains_key(instance_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudProviderConfig {
    pub name: String,
    pub default: bool,
    pub regions: Vec<RegionConfig>,
}

impl CloudProviderConfig {
    pub fn region(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|region| region.name == name)
    }

    pub fn default_region(&self) -> Option<&RegionConfig> {
        self.regions.iter().find(|region| region.default)
    }

    pub fn region_names(&self) -> Vec<&str> {
        self.regions.iter().map(|region| region.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub supported_providers: Vec<CloudProviderConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let all_types = BTreeMap::from([
            ("standard".to_string(), InstanceTypeLimit::default()),
            ("developer".to_string(), InstanceTypeLimit::default()),
        ]);
        Self {
            supported_providers: vec![CloudProviderConfig {
                name: "aws".to_string(),
                default: true,
                regions: vec![RegionConfig {
                    name: "us-east-1".to_string(),
                    default: true,
                    supported_instance_types: all_types,
                }],
            }],
        }
    }
}

impl ProviderConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse provider configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read provider configuration {}", path.display())
        })?;
        Self::from_yaml(&content)
    }

    pub fn provider(&self, name: &str) -> Option<&CloudProviderConfig> {
        self.supported_providers
            .iter()
            .find(|provider| provider.name == name)
    }

    pub fn default_provider(&self) -> Option<&CloudProviderConfig> {
        self.supported_providers
            .iter()
            .find(|provider| provider.default)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.supported_providers
            .iter()
            .map(|provider| provider.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"
supported_providers:
  - name: aws
    default: true
    regions:
      - name: us-east-1
        default: true
        supported_instance_types:
          standard: {}
          developer:
            limit: 5
      - name: eu-west-1
        supported_instance_types:
          standard: {}
  - name: gcp
    regions:
      - name: europe-west1
        default: true
        supported_instance_types:
          standard: {}
";

    #[test]
    fn test_parse_and_lookup() {
        let config = ProviderConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.provider_names(), vec!["aws", "gcp"]);
        assert_eq!(config.default_provider().unwrap().name, "aws");

        let aws = config.provider("aws").unwrap();
        assert_eq!(aws.default_region().unwrap().name, "us-east-1");
        assert_eq!(
            aws.region("us-east-1").unwrap().supported_instance_types["developer"].limit,
            Some(5)
        );
        assert!(!aws.region("eu-west-1").unwrap().supports_instance_type("developer"));
        assert!(config.provider("azure").is_none());
    }
}
