//! # Data Plane Resource Kinds
//!
//! Types for the resources the fleet manager installs on data plane clusters.
//!
//! Core kinds (`Namespace`, `Secret`) come from `k8s-openapi`. The OLM kinds
//! are declared here as custom resources. The identity provider patch is kept
//! untyped, since only a handful of its fields are ever set.

pub mod oauth;
pub mod olm;

pub use oauth::identity_provider_document;
pub use olm::{
    CatalogSource, CatalogSourceSpec, OperatorGroup, OperatorGroupSpec, Subscription,
    SubscriptionSpec, APPROVAL_AUTOMATIC, SOURCE_TYPE_GRPC,
};
