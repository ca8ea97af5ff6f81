//! # Reconciling Applier
//!
//! Applies an ordered [`ResourceSet`] to a data plane cluster, one resource at a
//! time, skipping resources whose last applied configuration is unchanged.
//!
//! For every resource:
//!
//! 1. Render the descriptor and serialize it canonically. That string is the
//!    new last-applied configuration.
//! 2. Stamp the document with the last-applied annotation.
//! 3. Resolve the kind's REST collection and scope through discovery.
//! 4. Fetch the live object. A fetch error counts as "absent".
//! 5. Skip when the live object's annotation equals the new configuration.
//! 6. Otherwise create, or replace the whole object carrying its resource version.
//!
//! The first failure aborts the set. Resources applied before it stay applied.

use crate::api::ClusterSpec;
use crate::constants::LAST_APPLIED_CONFIGURATION_ANNOTATION;
use crate::controller::reconciler::document;
use crate::controller::reconciler::error::ApplyError;
use crate::controller::reconciler::remote::{ClusterConnector, RemoteClusterApi};
use crate::controller::reconciler::resource::{ResourceDescriptor, ResourceSet};
use crate::observability::metrics;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// What applying one resource did to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    Replaced,
    /// Last applied configuration matched; no write issued
    Unchanged,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Created => "create",
            ApplyOutcome::Replaced => "replace",
            ApplyOutcome::Unchanged => "unchanged",
        }
    }
}

/// Result of applying one resource: the outcome and the object as the cluster returned it
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedObject {
    pub outcome: ApplyOutcome,
    pub object: Value,
}

/// Decide whether `existing` must be written.
///
/// An absent object is created; an object without the last-applied annotation is
/// foreign and always reclaimed; otherwise the annotation is compared byte for
/// byte with `new_configuration`.
pub fn should_apply_changes(existing: Option<&Value>, new_configuration: &str) -> bool {
    let Some(existing) = existing else {
        return true;
    };
    match document::annotation(existing, LAST_APPLIED_CONFIGURATION_ANNOTATION) {
        Some(last_applied) => last_applied != new_configuration,
        None => true,
    }
}

#[derive(Clone)]
pub struct ReconcilingApplier {
    connector: Arc<dyn ClusterConnector>,
}

impl std::fmt::Debug for ReconcilingApplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilingApplier").finish_non_exhaustive()
    }
}

impl ReconcilingApplier {
    pub fn new(connector: Arc<dyn ClusterConnector>) -> Self {
        Self { connector }
    }

    /// Apply `resources` to the cluster in order.
    ///
    /// Returns the input set. Without a connection for the cluster this is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// The first connection, discovery, serialization or write failure, or
    /// [`ApplyError::Cancelled`] once `cancel` fires.
    pub async fn apply(
        &self,
        cluster: &ClusterSpec,
        resources: ResourceSet,
        cancel: &CancellationToken,
    ) -> Result<ResourceSet, ApplyError> {
        let span = info_span!(
            "apply",
            cluster_id = %cluster.internal_id,
            resources = resources.len()
        );
        async {
            let connection = until_cancelled(cancel, &cluster.internal_id, self.connector.connect(cluster))
                .await?
                .map_err(|source| ApplyError::Connect {
                    cluster_id: cluster.internal_id.clone(),
                    source,
                })?;
            let Some(api) = connection else {
                debug!(
                    "No connection configuration for cluster {}, skipping apply",
                    cluster.internal_id
                );
                return Ok(resources);
            };

            for descriptor in &resources {
                if cancel.is_cancelled() {
                    return Err(ApplyError::Cancelled {
                        resource: descriptor.identity(),
                    });
                }
                apply_resource(api.as_ref(), descriptor, cancel).await?;
            }
            Ok(resources)
        }
        .instrument(span)
        .await
    }
}

/// Apply a single descriptor and record metrics for it
pub async fn apply_resource(
    api: &dyn RemoteClusterApi,
    descriptor: &ResourceDescriptor,
    cancel: &CancellationToken,
) -> Result<AppliedObject, ApplyError> {
    let kind = descriptor.kind().to_string();
    let started = Instant::now();
    let result = apply_descriptor(api, descriptor, cancel)
        .instrument(info_span!("apply_resource", kind = %kind, resource = %descriptor.identity()))
        .await;
    metrics::observe_resource_apply_duration(&kind, started.elapsed().as_secs_f64());

    match &result {
        Ok(applied) => match applied.outcome {
            ApplyOutcome::Created | ApplyOutcome::Replaced => {
                metrics::increment_resources_applied(&kind, applied.outcome.as_str());
            }
            ApplyOutcome::Unchanged => metrics::increment_resources_skipped(&kind),
        },
        Err(err) => {
            warn!("❌ Failed to apply {} {}: {}", kind, descriptor.identity(), err);
            metrics::increment_resource_apply_errors(&kind, err.as_str());
        }
    }
    result
}

async fn apply_descriptor(
    api: &dyn RemoteClusterApi,
    descriptor: &ResourceDescriptor,
    cancel: &CancellationToken,
) -> Result<AppliedObject, ApplyError> {
    let kind = descriptor.kind().to_string();
    let identity = descriptor.identity();
    let meta = descriptor.meta();

    let rendered = descriptor.to_document()?;
    let mut desired = document::without_annotation(&rendered, LAST_APPLIED_CONFIGURATION_ANNOTATION);
    let new_configuration =
        document::canonical_json(&desired).map_err(|source| ApplyError::Serialize {
            kind: kind.clone(),
            resource: identity.clone(),
            source,
        })?;
    if !document::set_annotation(
        &mut desired,
        LAST_APPLIED_CONFIGURATION_ANNOTATION,
        &new_configuration,
    ) {
        return Err(ApplyError::InvalidDescriptor(format!(
            "{kind} {identity} did not render to an object"
        )));
    }

    let gvk = document::group_version_kind(&desired).ok_or_else(|| {
        ApplyError::InvalidDescriptor(format!("{kind} {identity} has no apiVersion/kind"))
    })?;
    let mapping = until_cancelled(cancel, &identity, api.resolve(&gvk))
        .await?
        .map_err(|source| ApplyError::Discovery {
            kind: kind.clone(),
            resource: identity.clone(),
            source,
        })?;
    let namespace = mapping.target_namespace(Some(meta.namespace.as_str()));

    // Existence is only inferred from a successful fetch
    let existing = match until_cancelled(cancel, &identity, api.get(&mapping, namespace, &meta.name)).await? {
        Ok(existing) => existing,
        Err(err) => {
            debug!("Fetching {} {} failed, treating as absent: {:#}", kind, identity, err);
            None
        }
    };

    if !should_apply_changes(existing.as_ref(), &new_configuration) {
        debug!("{} {} unchanged since last apply", kind, identity);
        return Ok(AppliedObject {
            outcome: ApplyOutcome::Unchanged,
            object: existing.unwrap_or(desired),
        });
    }

    match existing {
        None => {
            let created = until_cancelled(cancel, &identity, api.create(&mapping, namespace, &desired))
                .await?
                .map_err(|source| ApplyError::Create {
                    kind: kind.clone(),
                    resource: identity.clone(),
                    source,
                })?;
            info!("✅ Created {} {}", kind, identity);
            Ok(AppliedObject {
                outcome: ApplyOutcome::Created,
                object: created,
            })
        }
        Some(existing) => {
            if let Some(version) = document::resource_version(&existing) {
                document::set_resource_version(&mut desired, version);
            }
            let replaced = until_cancelled(
                cancel,
                &identity,
                api.replace(&mapping, namespace, &meta.name, &desired),
            )
            .await?
            .map_err(|source| ApplyError::Replace {
                kind: kind.clone(),
                resource: identity.clone(),
                source,
            })?;
            info!("🔄 Replaced {} {}", kind, identity);
            Ok(AppliedObject {
                outcome: ApplyOutcome::Replaced,
                object: replaced,
            })
        }
    }
}

/// Run `call` unless `cancel` fires first
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    resource: &str,
    call: F,
) -> Result<F::Output, ApplyError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ApplyError::Cancelled {
            resource: resource.to_string(),
        }),
        output = call => Ok(output),
    }
}
