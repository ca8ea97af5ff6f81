//! # Kafka Fleet Manager
//!
//! Runs the reconcile loop over the data plane clusters registered through the
//! dataplane configuration and serves metrics and health probes.
//!
//! ## Usage
//!
//! ```bash
//! # Reconcile the clusters of a dataplane configuration
//! kafka-fleet-manager --dataplane-config dataplane.yaml --kubeconfig ~/.kube/config
//!
//! # Apply against an in-memory cluster only
//! kafka-fleet-manager --dataplane-config dataplane.yaml --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use kafka_fleet_manager::config::{self, DataplaneClusterConfig, FleetManagerConfig};
use kafka_fleet_manager::controller::reconciler::{
    ClusterConnector, InMemoryClusterApi, KubeconfigConnector, ReconcilingApplier,
    RemoteClusterApi, StaticConnector,
};
use kafka_fleet_manager::provider::{ProviderFactory, StandaloneProvider};
use kafka_fleet_manager::runtime::{initialize, ClusterReconciler};
use kafka_fleet_manager::services::{
    ClusterService, ClusterStore, ConfiguredFleetshardAddon, InMemoryClusterStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "kafka-fleet-manager")]
#[command(about = "Managed Kafka fleet manager", long_about = None)]
struct Args {
    /// Dataplane cluster configuration file (overrides DATAPLANE_CLUSTER_CONFIG_FILE)
    #[arg(long)]
    dataplane_config: Option<PathBuf>,

    /// Kubeconfig with one context per data plane cluster (overrides KUBECONFIG)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Seconds between reconcile passes (overrides RECONCILE_INTERVAL_SECS)
    #[arg(long)]
    reconcile_interval_secs: Option<u64>,

    /// Port for metrics and probes (overrides METRICS_PORT)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Apply to an in-memory cluster instead of the data plane clusters
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply_to(self, config: &mut FleetManagerConfig, server: &mut config::ServerConfig) {
        if let Some(path) = self.dataplane_config {
            config.dataplane_config_file = Some(path);
        }
        if let Some(path) = self.kubeconfig {
            config.kubeconfig = Some(path);
        }
        if let Some(interval) = self.reconcile_interval_secs {
            config.reconcile_interval_secs = interval;
        }
        if let Some(port) = self.metrics_port {
            server.metrics_port = port;
        }
        config.dry_run |= self.dry_run;
    }
}

fn connector_for(
    config: &FleetManagerConfig,
    dataplane: &DataplaneClusterConfig,
) -> Result<Arc<dyn ClusterConnector>> {
    if config.dry_run {
        warn!("🧪 Dry run: resources are applied to an in-memory cluster");
        let remote: Arc<dyn RemoteClusterApi> = Arc::new(InMemoryClusterApi::with_standard_kinds());
        return Ok(Arc::new(StaticConnector::new(remote)));
    }
    let connector =
        KubeconfigConnector::from_path(config.kubeconfig.as_deref(), dataplane.kubeconfig_contexts())?;
    Ok(Arc::new(connector))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut fleet_config, mut server_config) = config::load_config();
    args.apply_to(&mut fleet_config, &mut server_config);

    let cancel = CancellationToken::new();
    let init_result = initialize(&server_config, &cancel).await?;

    let dataplane = Arc::new(
        fleet_config
            .load_dataplane()
            .context("Failed to load dataplane cluster configuration")?,
    );
    let store = Arc::new(InMemoryClusterStore::with_clusters(
        dataplane.clusters.iter().map(config::ManualClusterConfig::to_cluster),
    ));
    info!(
        "Loaded {} data plane clusters from configuration",
        dataplane.clusters.len()
    );

    let applier = ReconcilingApplier::new(connector_for(&fleet_config, &dataplane)?);
    let standalone = StandaloneProvider::new(
        applier,
        Arc::clone(&dataplane),
        Arc::clone(&store) as Arc<dyn ClusterStore>,
    );
    let providers = ProviderFactory::new().register(Arc::new(standalone));
    let reconciler = ClusterReconciler::new(
        providers,
        Arc::clone(&store) as Arc<dyn ClusterService>,
        Arc::new(ConfiguredFleetshardAddon::new(dataplane.fleetshard.clone())),
        &fleet_config,
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Received Ctrl-C, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    reconciler.run(cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = init_result.server_handle.await {
        error!("HTTP server task failed: {}", e);
    }
    Ok(())
}
