//! # Kubernetes Remote Cluster
//!
//! `RemoteClusterApi` backed by kube-rs: discovery through `pinned_kind`, reads
//! and writes through `Api<DynamicObject>`.

use crate::api::ClusterSpec;
use crate::constants::FIELD_MANAGER;
use crate::controller::reconciler::remote::{
    ApiMapping, ClusterConnector, RemoteClusterApi, ResourceScope,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Api, DynamicObject, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::GroupVersionKind;
use kube::discovery::{self, Scope};
use kube::{Client, Config};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Remote cluster reached through a kube client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, mapping: &ApiMapping, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &mapping.resource),
            None => Api::all_with(self.client.clone(), &mapping.resource),
        }
    }

    fn post_params() -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(FIELD_MANAGER.to_string()),
        }
    }
}

impl std::fmt::Debug for KubeClusterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterApi").finish_non_exhaustive()
    }
}

#[async_trait]
impl RemoteClusterApi for KubeClusterApi {
    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<ApiMapping> {
        let (resource, capabilities) = discovery::pinned_kind(&self.client, gvk)
            .await
            .with_context(|| {
                format!(
                    "discovery failed for {}/{} {}",
                    gvk.group, gvk.version, gvk.kind
                )
            })?;
        let scope = match capabilities.scope {
            Scope::Namespaced => ResourceScope::Namespaced,
            Scope::Cluster => ResourceScope::Cluster,
        };
        debug!(
            kind = %gvk.kind,
            plural = %resource.plural,
            ?scope,
            "Resolved API mapping"
        );
        Ok(ApiMapping::new(resource, scope))
    }

    async fn get(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Value>> {
        let object = self
            .api(mapping, namespace)
            .get_opt(name)
            .await
            .with_context(|| format!("failed to get {} {name}", mapping.resource.kind))?;
        object
            .map(|object| serde_json::to_value(&object))
            .transpose()
            .context("failed to encode fetched object")
    }

    async fn create(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        document: &Value,
    ) -> Result<Value> {
        let object: DynamicObject = serde_json::from_value(document.clone())
            .context("document is not a valid Kubernetes object")?;
        let created = self
            .api(mapping, namespace)
            .create(&Self::post_params(), &object)
            .await?;
        Ok(serde_json::to_value(&created)?)
    }

    async fn replace(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        name: &str,
        document: &Value,
    ) -> Result<Value> {
        let object: DynamicObject = serde_json::from_value(document.clone())
            .context("document is not a valid Kubernetes object")?;
        let replaced = self
            .api(mapping, namespace)
            .replace(name, &Self::post_params(), &object)
            .await?;
        Ok(serde_json::to_value(&replaced)?)
    }
}

/// Connects to data plane clusters through contexts of one kubeconfig.
///
/// Without a kubeconfig every cluster is unmanageable and applies are no-ops.
#[derive(Clone, Default)]
pub struct KubeconfigConnector {
    kubeconfig: Option<Kubeconfig>,
    /// cluster id → kubeconfig context name
    contexts: BTreeMap<String, String>,
}

impl KubeconfigConnector {
    pub fn new(kubeconfig: Option<Kubeconfig>, contexts: BTreeMap<String, String>) -> Self {
        Self {
            kubeconfig,
            contexts,
        }
    }

    /// Read a kubeconfig file; a missing path yields a disconnected connector
    pub fn from_path(
        path: Option<&std::path::Path>,
        contexts: BTreeMap<String, String>,
    ) -> Result<Self> {
        let kubeconfig = match path {
            Some(path) => Some(Kubeconfig::read_from(path).with_context(|| {
                format!("failed to read kubeconfig {}", path.display())
            })?),
            None => None,
        };
        Ok(Self::new(kubeconfig, contexts))
    }
}

impl std::fmt::Debug for KubeconfigConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeconfigConnector")
            .field("has_kubeconfig", &self.kubeconfig.is_some())
            .field("contexts", &self.contexts)
            .finish()
    }
}

#[async_trait]
impl ClusterConnector for KubeconfigConnector {
    async fn connect(&self, cluster: &ClusterSpec) -> Result<Option<Arc<dyn RemoteClusterApi>>> {
        let Some(kubeconfig) = &self.kubeconfig else {
            return Ok(None);
        };

        // Unknown clusters fall back to the kubeconfig's current context
        let context = self.contexts.get(&cluster.internal_id).cloned();
        let options = KubeConfigOptions {
            context: context.clone(),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig.clone(), &options)
            .await
            .with_context(|| {
                format!(
                    "failed to build client config for cluster {} (context {:?})",
                    cluster.internal_id, context
                )
            })?;
        let client = Client::try_from(config).context("failed to create Kubernetes client")?;
        info!(
            "🔌 Connected to data plane cluster {} (context: {})",
            cluster.internal_id,
            context.as_deref().unwrap_or("current")
        );
        Ok(Some(Arc::new(KubeClusterApi::new(client))))
    }
}
