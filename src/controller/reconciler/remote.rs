//! # Remote Cluster API
//!
//! The seam between the applier and a data plane cluster. Implementations map a
//! group/version/kind to its REST collection through discovery and read or
//! write generic documents in it.

use crate::api::ClusterSpec;
use async_trait::async_trait;
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use serde_json::Value;
use std::sync::Arc;

/// Where objects of a kind live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

/// Discovery result for one kind: its REST collection and scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiMapping {
    pub resource: ApiResource,
    pub scope: ResourceScope,
}

impl ApiMapping {
    pub fn new(resource: ApiResource, scope: ResourceScope) -> Self {
        Self { resource, scope }
    }

    /// Namespace to address an object in: only namespaced kinds get one
    pub fn target_namespace<'a>(&self, namespace: Option<&'a str>) -> Option<&'a str> {
        match self.scope {
            ResourceScope::Namespaced => namespace.filter(|ns| !ns.is_empty()),
            ResourceScope::Cluster => None,
        }
    }
}

/// Client for one data plane cluster.
///
/// `namespace` is `None` for cluster-scoped calls.
#[async_trait]
pub trait RemoteClusterApi: Send + Sync {
    /// Map a kind to its REST collection and scope
    async fn resolve(&self, gvk: &GroupVersionKind) -> anyhow::Result<ApiMapping>;

    /// Fetch an object; `Ok(None)` when it does not exist
    async fn get(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> anyhow::Result<Option<Value>>;

    async fn create(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        document: &Value,
    ) -> anyhow::Result<Value>;

    /// Whole-object replace; the document carries the resource version it was based on
    async fn replace(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        name: &str,
        document: &Value,
    ) -> anyhow::Result<Value>;
}

/// Produces a client for a cluster.
///
/// `Ok(None)` means no connection configuration exists for the cluster; the
/// cluster is tracked but not remotely manageable.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    async fn connect(
        &self,
        cluster: &ClusterSpec,
    ) -> anyhow::Result<Option<Arc<dyn RemoteClusterApi>>>;
}

/// Connector handing out one fixed client (or none) for every cluster
#[derive(Clone, Default)]
pub struct StaticConnector {
    api: Option<Arc<dyn RemoteClusterApi>>,
}

impl StaticConnector {
    pub fn new(api: Arc<dyn RemoteClusterApi>) -> Self {
        Self { api: Some(api) }
    }

    /// Connector for environments without any remote configuration
    pub fn disconnected() -> Self {
        Self { api: None }
    }
}

impl std::fmt::Debug for StaticConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticConnector")
            .field("connected", &self.api.is_some())
            .finish()
    }
}

#[async_trait]
impl ClusterConnector for StaticConnector {
    async fn connect(
        &self,
        _cluster: &ClusterSpec,
    ) -> anyhow::Result<Option<Arc<dyn RemoteClusterApi>>> {
        Ok(self.api.clone())
    }
}
