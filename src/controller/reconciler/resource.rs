//! # Resource Descriptors
//!
//! Declarative, provider-agnostic descriptions of the objects a provider wants
//! on a data plane cluster. Descriptors are pure data: they are rebuilt on every
//! reconcile pass and rendered to a generic document only when applied.

use crate::api::SecretString;
use crate::controller::reconciler::document;
use crate::controller::reconciler::error::ApplyError;
use crate::crd::{
    CatalogSource, CatalogSourceSpec, OperatorGroup, OperatorGroupSpec, Subscription,
    SubscriptionSpec,
};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Identity and labels shared by every descriptor.
///
/// An empty namespace means the object is cluster-scoped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMeta {
    pub name: String,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

impl ResourceMeta {
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// `namespace/name`, or just `name` for cluster-scoped objects
    pub fn identity(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    fn object_meta(&self) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.clone()),
            namespace: (!self.namespace.is_empty()).then(|| self.namespace.clone()),
            labels: (!self.labels.is_empty()).then(|| self.labels.clone()),
            ..Default::default()
        }
    }
}

/// A cluster-side object to be created or updated
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptor {
    Namespace {
        meta: ResourceMeta,
    },
    CatalogSource {
        meta: ResourceMeta,
        spec: CatalogSourceSpec,
    },
    OperatorGroup {
        meta: ResourceMeta,
        spec: OperatorGroupSpec,
    },
    Subscription {
        meta: ResourceMeta,
        spec: SubscriptionSpec,
    },
    Secret {
        meta: ResourceMeta,
        secret_type: Option<String>,
        string_data: BTreeMap<String, SecretString>,
    },
    /// Arbitrary nested document for kinds that are not modelled
    Unstructured {
        meta: ResourceMeta,
        document: Value,
    },
}

impl ResourceDescriptor {
    pub fn namespace(meta: ResourceMeta) -> Self {
        ResourceDescriptor::Namespace { meta }
    }

    pub fn catalog_source(meta: ResourceMeta, spec: CatalogSourceSpec) -> Self {
        ResourceDescriptor::CatalogSource { meta, spec }
    }

    pub fn operator_group(meta: ResourceMeta, spec: OperatorGroupSpec) -> Self {
        ResourceDescriptor::OperatorGroup { meta, spec }
    }

    pub fn subscription(meta: ResourceMeta, spec: SubscriptionSpec) -> Self {
        ResourceDescriptor::Subscription { meta, spec }
    }

    pub fn secret(
        meta: ResourceMeta,
        secret_type: Option<String>,
        string_data: BTreeMap<String, SecretString>,
    ) -> Self {
        ResourceDescriptor::Secret {
            meta,
            secret_type,
            string_data,
        }
    }

    /// Wrap an untyped document. It must declare `apiVersion`, `kind` and `metadata.name`.
    pub fn unstructured(document: Value) -> Result<Self, ApplyError> {
        if document::group_version_kind(&document).is_none() {
            return Err(ApplyError::InvalidDescriptor(
                "unstructured document must declare apiVersion and kind".to_string(),
            ));
        }
        let name = document::name(&document)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ApplyError::InvalidDescriptor(
                    "unstructured document must declare metadata.name".to_string(),
                )
            })?
            .to_string();
        let namespace = document::namespace(&document).unwrap_or_default().to_string();
        let labels = document
            .pointer("/metadata/labels")
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Ok(ResourceDescriptor::Unstructured {
            meta: ResourceMeta {
                name,
                namespace,
                labels,
            },
            document,
        })
    }

    pub fn meta(&self) -> &ResourceMeta {
        match self {
            ResourceDescriptor::Namespace { meta }
            | ResourceDescriptor::CatalogSource { meta, .. }
            | ResourceDescriptor::OperatorGroup { meta, .. }
            | ResourceDescriptor::Subscription { meta, .. }
            | ResourceDescriptor::Secret { meta, .. }
            | ResourceDescriptor::Unstructured { meta, .. } => meta,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ResourceDescriptor::Namespace { .. } => "Namespace",
            ResourceDescriptor::CatalogSource { .. } => "CatalogSource",
            ResourceDescriptor::OperatorGroup { .. } => "OperatorGroup",
            ResourceDescriptor::Subscription { .. } => "Subscription",
            ResourceDescriptor::Secret { .. } => "Secret",
            ResourceDescriptor::Unstructured { document, .. } => {
                document::kind(document).unwrap_or("Unknown")
            }
        }
    }

    pub fn identity(&self) -> String {
        self.meta().identity()
    }

    /// Render the descriptor as the generic document sent to the cluster
    pub fn to_document(&self) -> Result<Value, ApplyError> {
        let rendered = match self {
            ResourceDescriptor::Namespace { meta } => typed_document(&Namespace {
                metadata: meta.object_meta(),
                ..Default::default()
            }),
            ResourceDescriptor::CatalogSource { meta, spec } => {
                let mut object = CatalogSource::new(&meta.name, spec.clone());
                object.metadata = meta.object_meta();
                typed_document(&object)
            }
            ResourceDescriptor::OperatorGroup { meta, spec } => {
                let mut object = OperatorGroup::new(&meta.name, spec.clone());
                object.metadata = meta.object_meta();
                typed_document(&object)
            }
            ResourceDescriptor::Subscription { meta, spec } => {
                let mut object = Subscription::new(&meta.name, spec.clone());
                object.metadata = meta.object_meta();
                typed_document(&object)
            }
            ResourceDescriptor::Secret {
                meta,
                secret_type,
                string_data,
            } => typed_document(&Secret {
                metadata: meta.object_meta(),
                type_: secret_type.clone(),
                string_data: Some(
                    string_data
                        .iter()
                        .map(|(key, value)| (key.clone(), value.expose().to_string()))
                        .collect(),
                ),
                ..Default::default()
            }),
            ResourceDescriptor::Unstructured { document, .. } => Ok(document.clone()),
        };
        rendered.map_err(|source| ApplyError::Serialize {
            kind: self.kind().to_string(),
            resource: self.identity(),
            source,
        })
    }
}

/// Serialize a typed object, making sure `apiVersion` and `kind` are present
fn typed_document<K>(object: &K) -> Result<Value, serde_json::Error>
where
    K: kube::Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(object)?;
    if let Some(map) = value.as_object_mut() {
        map.insert(
            "apiVersion".to_string(),
            Value::String(K::api_version(&()).into_owned()),
        );
        map.insert("kind".to_string(), Value::String(K::kind(&()).into_owned()));
    }
    Ok(value)
}

/// Ordered resources applied together.
///
/// Order is significant: producers list dependencies first (a namespace before
/// the objects inside it, a secret before the subscription that reads it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceSet {
    resources: Vec<ResourceDescriptor>,
}

impl ResourceSet {
    /// Build a set, rejecting two descriptors with the same namespace and name
    pub fn new(resources: Vec<ResourceDescriptor>) -> Result<Self, ApplyError> {
        let mut seen = HashSet::new();
        for resource in &resources {
            let meta = resource.meta();
            if !seen.insert((meta.namespace.as_str(), meta.name.as_str())) {
                return Err(ApplyError::DuplicateResource {
                    namespace: meta.namespace.clone(),
                    name: meta.name.clone(),
                });
            }
        }
        Ok(Self { resources })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDescriptor> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_inner(self) -> Vec<ResourceDescriptor> {
        self.resources
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a ResourceDescriptor;
    type IntoIter = std::slice::Iter<'a, ResourceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespace_document() {
        let descriptor = ResourceDescriptor::namespace(
            ResourceMeta::cluster_scoped("kafka").with_labels(BTreeMap::from([(
                "app".to_string(),
                "kafka".to_string(),
            )])),
        );
        let doc = descriptor.to_document().unwrap();
        assert_eq!(doc["apiVersion"], "v1");
        assert_eq!(doc["kind"], "Namespace");
        assert_eq!(doc["metadata"]["name"], "kafka");
        assert_eq!(doc["metadata"]["labels"]["app"], "kafka");
        assert!(doc["metadata"].get("namespace").is_none());
    }

    #[test]
    fn test_subscription_document() {
        let descriptor = ResourceDescriptor::subscription(
            ResourceMeta::namespaced("sub", "ops"),
            SubscriptionSpec {
                catalog_source: "cs".to_string(),
                catalog_source_namespace: "ops".to_string(),
                package: "kafka".to_string(),
                ..Default::default()
            },
        );
        let doc = descriptor.to_document().unwrap();
        assert_eq!(doc["apiVersion"], "operators.coreos.com/v1alpha1");
        assert_eq!(doc["kind"], "Subscription");
        assert_eq!(doc["metadata"]["namespace"], "ops");
        assert_eq!(doc["spec"]["source"], "cs");
    }

    #[test]
    fn test_operator_group_document_uses_v1alpha2() {
        let descriptor = ResourceDescriptor::operator_group(
            ResourceMeta::namespaced("og", "ops"),
            OperatorGroupSpec::default(),
        );
        let doc = descriptor.to_document().unwrap();
        assert_eq!(doc["apiVersion"], "operators.coreos.com/v1alpha2");
        assert_eq!(doc["spec"], json!({}));
    }

    #[test]
    fn test_secret_document_uses_string_data() {
        let descriptor = ResourceDescriptor::secret(
            ResourceMeta::namespaced("params", "ops"),
            Some("Opaque".to_string()),
            BTreeMap::from([("token".to_string(), SecretString::new("abc"))]),
        );
        let doc = descriptor.to_document().unwrap();
        assert_eq!(doc["kind"], "Secret");
        assert_eq!(doc["type"], "Opaque");
        assert_eq!(doc["stringData"]["token"], "abc");
    }

    #[test]
    fn test_unstructured_requires_type_and_name() {
        let err = ResourceDescriptor::unstructured(json!({"metadata": {"name": "a"}})).unwrap_err();
        assert!(matches!(err, ApplyError::InvalidDescriptor(_)));

        let err = ResourceDescriptor::unstructured(json!({"apiVersion": "v1", "kind": "X"}))
            .unwrap_err();
        assert!(matches!(err, ApplyError::InvalidDescriptor(_)));

        let descriptor = ResourceDescriptor::unstructured(json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "OAuth",
            "metadata": {"name": "cluster"}
        }))
        .unwrap();
        assert_eq!(descriptor.kind(), "OAuth");
        assert_eq!(descriptor.identity(), "cluster");
    }

    #[test]
    fn test_resource_set_rejects_collisions() {
        let a = ResourceDescriptor::namespace(ResourceMeta::cluster_scoped("kafka"));
        let b = ResourceDescriptor::secret(
            ResourceMeta::namespaced("kafka", "ops"),
            None,
            BTreeMap::new(),
        );
        let set = ResourceSet::new(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(set.len(), 2);

        let err = ResourceSet::new(vec![a.clone(), b, a]).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::DuplicateResource { ref name, .. } if name == "kafka"
        ));
    }
}
