//! # In-Memory Remote Cluster
//!
//! A process-local `RemoteClusterApi` with a discovery table, an object store
//! with resource versions, and a journal of every call. Used by tests and by
//! the binary's dry-run mode.

use crate::controller::reconciler::document;
use crate::controller::reconciler::remote::{ApiMapping, RemoteClusterApi, ResourceScope};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use kube::core::GroupVersionKind;
use kube::discovery::ApiResource;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Create,
    Replace,
}

/// One call made against the in-memory cluster
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub verb: Verb,
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
    /// Submitted document for writes
    pub body: Option<Value>,
}

type ObjectKey = (String, Option<String>, String);

#[derive(Debug, Default)]
pub struct InMemoryClusterApi {
    kinds: Mutex<BTreeMap<(String, String), (String, ResourceScope)>>,
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    calls: Mutex<Vec<CallRecord>>,
    failing: Mutex<BTreeSet<String>>,
    failing_reads: Mutex<BTreeSet<String>>,
    racing: Mutex<BTreeSet<String>>,
    next_version: AtomicU64,
}

impl InMemoryClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster serving the kinds the fleet manager installs
    pub fn with_standard_kinds() -> Self {
        let api = Self::new();
        api.register_kind(&GroupVersionKind::gvk("", "v1", "Namespace"), "namespaces", ResourceScope::Cluster);
        api.register_kind(&GroupVersionKind::gvk("", "v1", "Secret"), "secrets", ResourceScope::Namespaced);
        api.register_kind(
            &GroupVersionKind::gvk("operators.coreos.com", "v1alpha1", "CatalogSource"),
            "catalogsources",
            ResourceScope::Namespaced,
        );
        api.register_kind(
            &GroupVersionKind::gvk("operators.coreos.com", "v1alpha2", "OperatorGroup"),
            "operatorgroups",
            ResourceScope::Namespaced,
        );
        api.register_kind(
            &GroupVersionKind::gvk("operators.coreos.com", "v1alpha1", "Subscription"),
            "subscriptions",
            ResourceScope::Namespaced,
        );
        api.register_kind(
            &GroupVersionKind::gvk("config.openshift.io", "v1", "OAuth"),
            "oauths",
            ResourceScope::Cluster,
        );
        api
    }

    pub fn register_kind(&self, gvk: &GroupVersionKind, plural: &str, scope: ResourceScope) {
        if let Ok(mut kinds) = self.kinds.lock() {
            kinds.insert(
                (gvk.group.clone(), gvk.kind.clone()),
                (plural.to_string(), scope),
            );
        }
    }

    /// Make every create/replace of an object with this name fail
    pub fn fail_writes_to(&self, name: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(name.to_string());
        }
    }

    /// Make every get of an object with this name fail
    pub fn fail_reads_to(&self, name: &str) {
        if let Ok(mut failing) = self.failing_reads.lock() {
            failing.insert(name.to_string());
        }
    }

    /// Have another writer update the object with this name right after the next get of it
    pub fn modify_after_next_read(&self, name: &str) {
        if let Ok(mut racing) = self.racing.lock() {
            racing.insert(name.to_string());
        }
    }

    /// Store an object as if something outside the fleet manager created it
    pub fn seed(&self, object: Value) -> Result<()> {
        let gvk = document::group_version_kind(&object)
            .ok_or_else(|| anyhow!("seeded object needs apiVersion and kind"))?;
        let name = document::name(&object)
            .ok_or_else(|| anyhow!("seeded object needs metadata.name"))?
            .to_string();
        let (_, scope) = self.lookup(&gvk)?;
        let namespace = match scope {
            ResourceScope::Namespaced => document::namespace(&object).map(str::to_string),
            ResourceScope::Cluster => None,
        };
        let mut object = object;
        document::set_resource_version(&mut object, &self.bump_version());
        self.objects
            .lock()
            .map_err(|e| anyhow!("object store poisoned: {e}"))?
            .insert((gvk.kind, namespace, name), object);
        Ok(())
    }

    /// Current stored object
    pub fn object(&self, kind: &str, namespace: Option<&str>, name: &str) -> Option<Value> {
        let objects = self.objects.lock().ok()?;
        objects
            .get(&(
                kind.to_string(),
                namespace.map(str::to_string),
                name.to_string(),
            ))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or_default()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Create and replace calls made so far, in order
    pub fn writes(&self) -> Vec<CallRecord> {
        self.calls()
            .into_iter()
            .filter(|call| call.verb != Verb::Get)
            .collect()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn lookup(&self, gvk: &GroupVersionKind) -> Result<(String, ResourceScope)> {
        let kinds = self
            .kinds
            .lock()
            .map_err(|e| anyhow!("discovery table poisoned: {e}"))?;
        kinds
            .get(&(gvk.group.clone(), gvk.kind.clone()))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "the server could not find the requested resource: {}/{} {}",
                    gvk.group,
                    gvk.version,
                    gvk.kind
                )
            })
    }

    fn bump_version(&self) -> String {
        (self.next_version.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    fn record(&self, verb: Verb, mapping: &ApiMapping, namespace: Option<&str>, name: &str, body: Option<&Value>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(CallRecord {
                verb,
                kind: mapping.resource.kind.clone(),
                namespace: namespace.map(str::to_string),
                name: name.to_string(),
                body: body.cloned(),
            });
        }
    }

    fn check_failure(&self, name: &str) -> Result<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|e| anyhow!("failure table poisoned: {e}"))?;
        if failing.contains(name) {
            return Err(anyhow!("injected failure writing {name}"));
        }
        Ok(())
    }

    fn check_read_failure(&self, name: &str) -> Result<()> {
        let failing = self
            .failing_reads
            .lock()
            .map_err(|e| anyhow!("failure table poisoned: {e}"))?;
        if failing.contains(name) {
            return Err(anyhow!("injected failure reading {name}"));
        }
        Ok(())
    }

    fn take_racing(&self, name: &str) -> bool {
        self.racing
            .lock()
            .map(|mut racing| racing.remove(name))
            .unwrap_or_default()
    }

    fn key(mapping: &ApiMapping, namespace: Option<&str>, name: &str) -> ObjectKey {
        (
            mapping.resource.kind.clone(),
            namespace.map(str::to_string),
            name.to_string(),
        )
    }
}

#[async_trait]
impl RemoteClusterApi for InMemoryClusterApi {
    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<ApiMapping> {
        let (plural, scope) = self.lookup(gvk)?;
        Ok(ApiMapping::new(
            ApiResource::from_gvk_with_plural(gvk, &plural),
            scope,
        ))
    }

    async fn get(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Value>> {
        self.record(Verb::Get, mapping, namespace, name, None);
        self.check_read_failure(name)?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|e| anyhow!("object store poisoned: {e}"))?;
        let key = Self::key(mapping, namespace, name);
        let fetched = objects.get(&key).cloned();
        if fetched.is_some() && self.take_racing(name) {
            if let Some(stored) = objects.get_mut(&key) {
                document::set_resource_version(stored, &self.bump_version());
            }
        }
        Ok(fetched)
    }

    async fn create(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        body: &Value,
    ) -> Result<Value> {
        let name = document::name(body)
            .ok_or_else(|| anyhow!("object has no metadata.name"))?
            .to_string();
        self.record(Verb::Create, mapping, namespace, &name, Some(body));
        self.check_failure(&name)?;

        let mut objects = self
            .objects
            .lock()
            .map_err(|e| anyhow!("object store poisoned: {e}"))?;
        let key = Self::key(mapping, namespace, &name);
        if objects.contains_key(&key) {
            return Err(anyhow!("{} \"{name}\" already exists", mapping.resource.plural));
        }
        let mut stored = body.clone();
        document::set_resource_version(&mut stored, &self.bump_version());
        objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn replace(
        &self,
        mapping: &ApiMapping,
        namespace: Option<&str>,
        name: &str,
        body: &Value,
    ) -> Result<Value> {
        self.record(Verb::Replace, mapping, namespace, name, Some(body));
        self.check_failure(name)?;

        let mut objects = self
            .objects
            .lock()
            .map_err(|e| anyhow!("object store poisoned: {e}"))?;
        let key = Self::key(mapping, namespace, name);
        let current = objects
            .get(&key)
            .ok_or_else(|| anyhow!("{} \"{name}\" not found", mapping.resource.plural))?;
        if document::resource_version(current) != document::resource_version(body) {
            return Err(anyhow!(
                "Operation cannot be fulfilled on {} \"{name}\": the object has been modified",
                mapping.resource.plural
            ));
        }
        let mut stored = body.clone();
        document::set_resource_version(&mut stored, &self.bump_version());
        objects.insert(key, stored.clone());
        Ok(stored)
    }
}
