//! # Apply Error Types
//!
//! Errors raised while reconciling a resource set against a data plane cluster.
//! Every variant names the operation and the resource it failed on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("failed to connect to cluster {cluster_id}")]
    Connect {
        cluster_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to resolve API mapping for {kind} {resource}")]
    Discovery {
        kind: String,
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to create {kind} {resource}")]
    Create {
        kind: String,
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to replace {kind} {resource}")]
    Replace {
        kind: String,
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to serialize {kind} {resource}")]
    Serialize {
        kind: String,
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid resource descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("duplicate resource {namespace}/{name} in resource set")]
    DuplicateResource { namespace: String, name: String },

    #[error("apply of {resource} cancelled")]
    Cancelled { resource: String },
}

impl ApplyError {
    /// Reason label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyError::Connect { .. } => "connect",
            ApplyError::Discovery { .. } => "discovery",
            ApplyError::Create { .. } => "create",
            ApplyError::Replace { .. } => "replace",
            ApplyError::Serialize { .. } => "serialize",
            ApplyError::InvalidDescriptor(_) => "invalid_descriptor",
            ApplyError::DuplicateResource { .. } => "duplicate_resource",
            ApplyError::Cancelled { .. } => "cancelled",
        }
    }

    /// Whether re-driving the same apply later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApplyError::Connect { .. }
                | ApplyError::Discovery { .. }
                | ApplyError::Create { .. }
                | ApplyError::Replace { .. }
                | ApplyError::Cancelled { .. }
        )
    }

    /// Operator guidance for this error
    pub fn remediation(&self) -> String {
        match self {
            ApplyError::Connect { cluster_id, .. } => format!(
                "Verify the kubeconfig context configured for cluster {cluster_id} exists and its credentials are valid."
            ),
            ApplyError::Discovery { kind, .. } => format!(
                "The cluster does not serve kind {kind}. Check that the operator providing it (e.g. OLM) is installed."
            ),
            ApplyError::Create { .. } | ApplyError::Replace { .. } => {
                "Check the fleet manager's RBAC on the data plane cluster. A stale resource version resolves on the next reconcile.".to_string()
            }
            ApplyError::Serialize { .. } | ApplyError::InvalidDescriptor(_) => {
                "The resource built from configuration is invalid. Check the dataplane cluster configuration file.".to_string()
            }
            ApplyError::DuplicateResource { .. } => {
                "Two resources in one set share a namespace and name. Fix the resource set producer.".to_string()
            }
            ApplyError::Cancelled { .. } => "The reconcile was cancelled and will be retried.".to_string(),
        }
    }
}
