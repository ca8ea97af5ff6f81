//! # OLM Resources
//!
//! Operator Lifecycle Manager kinds the fleet manager installs on data plane
//! clusters. Only the fields the fleet manager sets are modelled.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Catalog source serving an operator index image
///
/// # Example
///
/// ```yaml
/// apiVersion: operators.coreos.com/v1alpha1
/// kind: CatalogSource
/// metadata:
///   name: managed-kafka-cs
///   namespace: redhat-managed-kafka-operator
/// spec:
///   sourceType: grpc
///   image: quay.io/osd-addons/managed-kafka:production-82b42db
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "CatalogSource",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    pub source_type: String,
    pub image: String,
    /// Image pull secrets used to fetch the index image
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

/// Operator group; leaving `targetNamespaces` unset selects all namespaces
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha2",
    kind = "OperatorGroup",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct OperatorGroupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_namespaces: Option<Vec<String>>,
}

/// Subscription to an operator package from a catalog source
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "Subscription",
    namespaced
)]
pub struct SubscriptionSpec {
    /// Name of the catalog source
    #[serde(rename = "source")]
    pub catalog_source: String,
    #[serde(rename = "sourceNamespace")]
    pub catalog_source_namespace: String,
    /// Package name
    #[serde(rename = "name")]
    pub package: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(rename = "startingCSV", default, skip_serializing_if = "String::is_empty")]
    pub starting_csv: String,
    #[serde(rename = "installPlanApproval", default, skip_serializing_if = "String::is_empty")]
    pub install_plan_approval: String,
    /// Free-form subscription config (env, resources, node selectors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Catalog source type served over gRPC
pub const SOURCE_TYPE_GRPC: &str = "grpc";

/// Install plans are approved without manual intervention
pub const APPROVAL_AUTOMATIC: &str = "Automatic";
