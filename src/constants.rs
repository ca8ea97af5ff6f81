//! # Constants
//!
//! Shared names, annotation keys and defaults used across the fleet manager.

/// Field manager recorded on every create/replace issued against a data plane cluster
pub const FIELD_MANAGER: &str = "kas-fleet-manager";

/// Annotation holding the canonical serialization of a resource as last applied.
/// Used to decide whether a new apply request must be written to the cluster.
pub const LAST_APPLIED_CONFIGURATION_ANNOTATION: &str =
    "kas-fleet-manager/last-applied-resource-configuration";

// Strimzi operator bundle
pub const STRIMZI_OPERATOR_CATALOG_SOURCE_NAME: &str = "managed-kafka-cs";
pub const STRIMZI_OPERATOR_OPERATOR_GROUP_NAME: &str = "managed-kafka-og";
pub const STRIMZI_OPERATOR_SUBSCRIPTION_NAME: &str = "managed-kafka-sub";

// Fleet-shard operator bundle
pub const KAS_FLEETSHARD_OPERATOR_CATALOG_SOURCE_NAME: &str = "kas-fleetshard-operator-cs";
pub const KAS_FLEETSHARD_OPERATOR_OPERATOR_GROUP_NAME: &str = "kas-fleetshard-operator-og";
pub const KAS_FLEETSHARD_OPERATOR_SUBSCRIPTION_NAME: &str = "kas-fleetshard-operator-sub";
pub const KAS_FLEETSHARD_OPERATOR_PARAMETERS_SECRET_NAME: &str =
    "addon-kas-fleetshard-operator-parameters";

/// Secret holding the OpenID client secret referenced by the OAuth patch
pub const KAFKA_SRE_IDP_SECRET_NAME: &str = "kafka-sre-idp-secret";
/// Namespace where OpenShift expects identity provider secrets
pub const OPENSHIFT_CONFIG_NAMESPACE: &str = "openshift-config";

/// Image pull secret created next to catalog sources when docker config content is configured
pub const IMAGE_PULL_SECRET_NAME: &str = "rhoas-image-pull-secret";

// Fleet-shard addon parameter ids
pub const FLEETSHARD_PARAM_CLUSTER_ID: &str = "cluster-id";
pub const FLEETSHARD_PARAM_CONTROL_PLANE_URL: &str = "control-plane-url";
pub const FLEETSHARD_PARAM_POLL_INTERVAL: &str = "poll-interval";
pub const FLEETSHARD_PARAM_RESYNC_INTERVAL: &str = "resync-interval";
pub const FLEETSHARD_PARAM_SERVICE_ACCOUNT_ID: &str = "sso-client-id";
pub const FLEETSHARD_PARAM_SERVICE_ACCOUNT_SECRET: &str = "sso-secret";

// Naming rules
pub const MAX_KAFKA_NAME_LENGTH: usize = 32;
pub const CLUSTER_ID_LENGTH: usize = 32;
pub const KAFKA_CLUSTER_NAME_PATTERN: &str = r"^[a-z]([-a-z0-9]*[a-z0-9])?$";
pub const MIN_KAFKA_MACHINE_POOL_NODES: i32 = 3;

// HTTP server
pub const DEFAULT_METRICS_PORT: u16 = 8080;
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

// Reconcile loop
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 600;

// Fleet-shard agent sync settings
pub const DEFAULT_FLEETSHARD_POLL_INTERVAL: &str = "15s";
pub const DEFAULT_FLEETSHARD_RESYNC_INTERVAL: &str = "60s";

/// Base path of the public REST API, used when building resource hrefs
pub const API_BASE_PATH: &str = "/api/kafkas_mgmt/v1";
