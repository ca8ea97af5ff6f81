//! # Fleet Reconcile Integration Tests
//!
//! Drives clusters loaded from a dataplane configuration through the reconcile
//! loop against the in-memory cluster, the same wiring the binary uses for dry
//! runs.

use kafka_fleet_manager::api::ClusterStatus;
use kafka_fleet_manager::config::{DataplaneClusterConfig, FleetManagerConfig, ManualClusterConfig};
use kafka_fleet_manager::constants::{
    FLEETSHARD_PARAM_CLUSTER_ID, KAS_FLEETSHARD_OPERATOR_PARAMETERS_SECRET_NAME,
};
use kafka_fleet_manager::controller::reconciler::{
    InMemoryClusterApi, ReconcilingApplier, RemoteClusterApi, StaticConnector,
};
use kafka_fleet_manager::error::ErrorKind;
use kafka_fleet_manager::provider::{ProviderFactory, StandaloneProvider};
use kafka_fleet_manager::runtime::ClusterReconciler;
use kafka_fleet_manager::services::{
    ClusterService, ClusterStore, ConfiguredFleetshardAddon, InMemoryClusterStore,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

const CLUSTER_ID: &str = "1234abcd1234abcd1234abcd1234abcd";

const DATAPLANE_YAML: &str = r#"
strimzi_operator_olm_config:
  namespace: redhat-managed-kafka-operator
  index_image: quay.io/osd-addons/managed-kafka:production
  package: managed-kafka
  sub_channel: stable
kas_fleetshard_operator_olm_config:
  namespace: redhat-kas-fleetshard-operator
  index_image: quay.io/osd-addons/kas-fleetshard-operator:production
  package: kas-fleetshard-operator
  sub_channel: stable
fleetshard:
  control_plane_url: https://api.example.com
  sso_client_id: kas-fleetshard-agent
  sso_client_secret: agent-secret
clusters:
  - cluster_id: 1234abcd1234abcd1234abcd1234abcd
    kubeconfig_context: dataplane-1
    cloud_provider: aws
    region: us-east-1
    provider_type: standalone
"#;

struct Fleet {
    store: Arc<InMemoryClusterStore>,
    remote: Arc<InMemoryClusterApi>,
    reconciler: ClusterReconciler,
}

fn fleet() -> Fleet {
    let dataplane = Arc::new(DataplaneClusterConfig::from_yaml(DATAPLANE_YAML).unwrap());
    let store = Arc::new(InMemoryClusterStore::with_clusters(
        dataplane.clusters.iter().map(ManualClusterConfig::to_cluster),
    ));
    let remote = Arc::new(InMemoryClusterApi::with_standard_kinds());
    let connector = StaticConnector::new(Arc::clone(&remote) as Arc<dyn RemoteClusterApi>);
    let standalone = StandaloneProvider::new(
        ReconcilingApplier::new(Arc::new(connector)),
        Arc::clone(&dataplane),
        Arc::clone(&store) as Arc<dyn ClusterStore>,
    );
    let reconciler = ClusterReconciler::new(
        ProviderFactory::new().register(Arc::new(standalone)),
        Arc::clone(&store) as Arc<dyn ClusterService>,
        Arc::new(ConfiguredFleetshardAddon::new(dataplane.fleetshard.clone())),
        &FleetManagerConfig::default(),
    );
    Fleet {
        store,
        remote,
        reconciler,
    }
}

async fn status_of(store: &InMemoryClusterStore) -> ClusterStatus {
    store.find_cluster_by_id(CLUSTER_ID).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_configured_cluster_is_installed_and_ready() {
    let fleet = fleet();
    assert_eq!(status_of(&fleet.store).await, ClusterStatus::Accepted);

    let reconciled = fleet.reconciler.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(reconciled, 1);
    assert_eq!(status_of(&fleet.store).await, ClusterStatus::Ready);

    let params = fleet
        .remote
        .object(
            "Secret",
            Some("redhat-kas-fleetshard-operator"),
            KAS_FLEETSHARD_OPERATOR_PARAMETERS_SECRET_NAME,
        )
        .unwrap();
    assert_eq!(params["stringData"][FLEETSHARD_PARAM_CLUSTER_ID], CLUSTER_ID);
    assert_eq!(params["stringData"]["control-plane-url"], "https://api.example.com");
}

#[tokio::test]
async fn test_steady_state_pass_issues_no_writes() {
    let fleet = fleet();
    let cancel = CancellationToken::new();
    fleet.reconciler.run_once(&cancel).await.unwrap();
    let objects = fleet.remote.object_count();

    fleet.remote.clear_calls();
    fleet.reconciler.run_once(&cancel).await.unwrap();
    assert!(fleet.remote.writes().is_empty());
    assert_eq!(fleet.remote.object_count(), objects);
    assert_eq!(status_of(&fleet.store).await, ClusterStatus::Ready);
}

#[tokio::test]
async fn test_failed_install_leaves_cluster_provisioned_and_backs_off() {
    let fleet = fleet();
    fleet.remote.fail_writes_to("managed-kafka-og");

    let reconciled = fleet.reconciler.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(reconciled, 0);
    assert_eq!(status_of(&fleet.store).await, ClusterStatus::Provisioned);
    assert!(fleet.reconciler.backoff().is_waiting(CLUSTER_ID, Instant::now()));

    // Resources ahead of the failing one stay applied, later ones were never written
    assert!(fleet
        .remote
        .object("Namespace", None, "redhat-managed-kafka-operator")
        .is_some());
    assert!(fleet
        .remote
        .object("Subscription", Some("redhat-managed-kafka-operator"), "managed-kafka-sub")
        .is_none());
}

#[tokio::test]
async fn test_deregistered_cluster_is_not_brought_back_to_ready() {
    let fleet = fleet();
    let cancel = CancellationToken::new();
    fleet.reconciler.run_once(&cancel).await.unwrap();
    let before = fleet.store.find_cluster_by_id(CLUSTER_ID).await.unwrap().unwrap();
    assert_eq!(before.status, ClusterStatus::Ready);

    fleet.store.deregister_cluster_job(CLUSTER_ID).await.unwrap();
    fleet.remote.clear_calls();

    // Reconcile with the record read before deregistration
    let status = fleet.reconciler.reconcile_cluster(&before, &cancel).await.unwrap();
    assert_eq!(status, ClusterStatus::Deprovisioning);
    assert_eq!(status_of(&fleet.store).await, ClusterStatus::Deprovisioning);
    assert!(fleet.remote.calls().is_empty());

    let err = fleet
        .store
        .update_status(CLUSTER_ID, ClusterStatus::Ready)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Conflict));
    assert_eq!(status_of(&fleet.store).await, ClusterStatus::Deprovisioning);
}
