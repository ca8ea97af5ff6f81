//! # Fleet Manager Configuration
//!
//! Process-level settings come from environment variables with defaults (and
//! can be overridden by CLI flags). Data plane, kafka and cloud provider settings
//! come from YAML files named by those settings.

mod dataplane;
mod kafka;
mod providers;
mod server;

pub use dataplane::{
    DataplaneClusterConfig, FleetshardAgentConfig, ManualClusterConfig,
    OperatorInstallationConfig,
};
pub use kafka::{parse_plan, KafkaConfig, KafkaInstanceSize, KafkaInstanceTypeConfig, PromotionPolicy};
pub use providers::{CloudProviderConfig, InstanceTypeLimit, ProviderConfig, RegionConfig};
pub use server::ServerConfig;

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_RECONCILE_INTERVAL_SECS,
};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Reconcile loop and file locations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetManagerConfig {
    /// Delay between reconcile passes of a healthy cluster
    pub reconcile_interval_secs: u64,
    /// Lower bound of the per-cluster error backoff
    pub backoff_min_secs: u64,
    /// Upper bound of the per-cluster error backoff
    pub backoff_max_secs: u64,
    pub dataplane_config_file: Option<PathBuf>,
    pub kafka_config_file: Option<PathBuf>,
    pub providers_config_file: Option<PathBuf>,
    /// Kubeconfig holding one context per data plane cluster
    pub kubeconfig: Option<PathBuf>,
    /// Apply to an in-memory cluster instead of real data plane clusters
    pub dry_run: bool,
}

impl Default for FleetManagerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            dataplane_config_file: None,
            kafka_config_file: None,
            providers_config_file: None,
            kubeconfig: None,
            dry_run: false,
        }
    }
}

impl FleetManagerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            reconcile_interval_secs: env_var_or_default(
                "RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            dataplane_config_file: env_path("DATAPLANE_CLUSTER_CONFIG_FILE"),
            kafka_config_file: env_path("KAFKA_CONFIG_FILE"),
            providers_config_file: env_path("PROVIDERS_CONFIG_FILE"),
            kubeconfig: env_path("KUBECONFIG"),
            dry_run: env_var_or_default("DRY_RUN", false),
        }
    }

    /// Dataplane configuration from its file, or the defaults when none is configured
    pub fn load_dataplane(&self) -> Result<DataplaneClusterConfig> {
        match &self.dataplane_config_file {
            Some(path) => DataplaneClusterConfig::from_file(path),
            None => Ok(DataplaneClusterConfig::default()),
        }
    }

    pub fn load_kafka(&self) -> Result<KafkaConfig> {
        match &self.kafka_config_file {
            Some(path) => KafkaConfig::from_file(path),
            None => Ok(KafkaConfig::default()),
        }
    }

    pub fn load_providers(&self) -> Result<ProviderConfig> {
        match &self.providers_config_file {
            Some(path) => ProviderConfig::from_file(path),
            None => Ok(ProviderConfig::default()),
        }
    }
}

/// Shared fleet manager configuration
pub type SharedFleetManagerConfig = Arc<RwLock<FleetManagerConfig>>;

/// Shared server configuration
pub type SharedServerConfig = Arc<RwLock<ServerConfig>>;

/// Load configuration from environment variables with defaults
pub fn load_config() -> (FleetManagerConfig, ServerConfig) {
    (FleetManagerConfig::from_env(), ServerConfig::from_env())
}

/// Wrap configuration for sharing between the reconcile loop and the server
pub fn create_shared_config(
    config: FleetManagerConfig,
    server: ServerConfig,
) -> (SharedFleetManagerConfig, SharedServerConfig) {
    (Arc::new(RwLock::new(config)), Arc::new(RwLock::new(server)))
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
