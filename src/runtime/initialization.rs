//! # Initialization
//!
//! Process startup: rustls setup, tracing, metrics registration and the
//! metrics/probe server.

use crate::config::ServerConfig;
use crate::controller::server::{start_server, ServerState};
use crate::observability;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Components started during initialization
#[derive(Debug)]
pub struct InitializationResult {
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Task serving metrics and probes until the shutdown token fires
    pub server_handle: JoinHandle<()>,
}

/// Initialize the fleet manager runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
pub async fn initialize(
    server_config: &ServerConfig,
    cancel: &CancellationToken,
) -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection to a data plane cluster
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|existing| {
            anyhow::anyhow!("Failed to install rustls crypto provider, one is already installed: {existing:?}")
        })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kafka_fleet_manager=info".into()),
        )
        .init();

    info!("Starting Kafka Fleet Manager");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let server_port = server_config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone, server_cancel).await {
            error!("HTTP server error: {:#}", e);
        }
    });

    // Readiness probes should pass before the first reconcile pass starts
    wait_for_server_ready(server_config, &server_state, &server_handle).await?;

    Ok(InitializationResult {
        server_state,
        server_handle,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_config: &ServerConfig,
    server_state: &Arc<ServerState>,
    server_handle: &JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(server_config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(server_config.poll_interval_ms.max(1));
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    fn fast_config(startup_timeout_secs: u64) -> ServerConfig {
        ServerConfig {
            startup_timeout_secs,
            poll_interval_ms: 5,
            ..ServerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_wait_returns_once_ready() {
        let state = Arc::new(ServerState::new());
        let ready = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            ready.is_ready.store(true, Ordering::Relaxed);
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        wait_for_server_ready(&fast_config(5), &state, &handle)
            .await
            .unwrap();
        handle.abort();
    }

    #[tokio::test]
    async fn test_wait_fails_when_server_task_exits() {
        let state = Arc::new(ServerState::new());
        let handle = tokio::spawn(async {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = wait_for_server_ready(&fast_config(5), &state, &handle)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let state = Arc::new(ServerState::new());
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let err = wait_for_server_ready(&fast_config(0), &state, &handle)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("within 0 seconds"));
        handle.abort();
    }
}
