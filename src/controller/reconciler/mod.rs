//! # Reconciler
//!
//! Brings data plane clusters in line with the resources the fleet manager
//! declares for them.
//!
//! - `resource` - Declarative resource descriptors and ordered resource sets
//! - `document` - Accessors over untyped remote objects and canonical serialization
//! - `remote` - The remote cluster API seam and connectors
//! - `kube_remote` - kube-rs backed remote cluster
//! - `memory` - In-process remote cluster for tests and dry runs
//! - `applier` - Diff-and-apply of resource sets
//! - `error` - Apply errors

pub mod applier;
pub mod document;
pub mod error;
pub mod kube_remote;
pub mod memory;
pub mod remote;
pub mod resource;

pub use applier::{apply_resource, should_apply_changes, AppliedObject, ApplyOutcome, ReconcilingApplier};
pub use error::ApplyError;
pub use kube_remote::{KubeClusterApi, KubeconfigConnector};
pub use memory::{CallRecord, InMemoryClusterApi, Verb};
pub use remote::{ApiMapping, ClusterConnector, RemoteClusterApi, ResourceScope, StaticConnector};
pub use resource::{ResourceDescriptor, ResourceMeta, ResourceSet};
