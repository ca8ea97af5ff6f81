//! # Fleet-shard Addon Parameters
//!
//! Builds the parameters the fleet-shard agent is installed with from the
//! dataplane configuration.

use super::FleetshardOperatorAddon;
use crate::api::{Cluster, Parameter};
use crate::config::FleetshardAgentConfig;
use crate::constants::{
    FLEETSHARD_PARAM_CLUSTER_ID, FLEETSHARD_PARAM_CONTROL_PLANE_URL,
    FLEETSHARD_PARAM_POLL_INTERVAL, FLEETSHARD_PARAM_RESYNC_INTERVAL,
    FLEETSHARD_PARAM_SERVICE_ACCOUNT_ID, FLEETSHARD_PARAM_SERVICE_ACCOUNT_SECRET,
};
use crate::error::ServiceResult;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct ConfiguredFleetshardAddon {
    config: FleetshardAgentConfig,
}

impl ConfiguredFleetshardAddon {
    pub fn new(config: FleetshardAgentConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl FleetshardOperatorAddon for ConfiguredFleetshardAddon {
    async fn get_addon_params(&self, cluster: &Cluster) -> ServiceResult<Vec<Parameter>> {
        // Clusters that already hold credentials keep them
        let (client_id, client_secret) = if cluster.client_id.is_empty() {
            (
                self.config.sso_client_id.clone(),
                self.config.sso_client_secret.clone(),
            )
        } else {
            (cluster.client_id.clone(), cluster.client_secret.clone())
        };

        Ok(vec![
            Parameter::new(FLEETSHARD_PARAM_CLUSTER_ID, cluster.cluster_id.as_str()),
            Parameter::new(
                FLEETSHARD_PARAM_CONTROL_PLANE_URL,
                self.config.control_plane_url.as_str(),
            ),
            Parameter::new(FLEETSHARD_PARAM_POLL_INTERVAL, self.config.poll_interval.as_str()),
            Parameter::new(
                FLEETSHARD_PARAM_RESYNC_INTERVAL,
                self.config.resync_interval.as_str(),
            ),
            Parameter::new(FLEETSHARD_PARAM_SERVICE_ACCOUNT_ID, client_id),
            Parameter::new(FLEETSHARD_PARAM_SERVICE_ACCOUNT_SECRET, client_secret),
        ])
    }
}
