//! Stack Refresh Controller
//!
//! Watches the IDE server pod in a target namespace and, once its primary
//! container reports ready, replaces the server's stack catalog with the
//! definitions served by a remote source URL (stripping the agents list
//! the server cannot ingest).
//!
//! Runs either as a daemon (until SIGINT/SIGTERM) or in one-shot mode,
//! polling until the refresh has completed.

mod backoff;
mod cache;
mod controller;
mod error;
mod filter;
mod queue;
mod refresher;
mod runner;
mod snapshot;
mod watch;

use crate::controller::{RefreshController, RefreshSettings, DEFAULT_SOURCE_URL};
use crate::error::ControllerError;
use crate::watch::KubePodSource;
use catalog_client::CatalogClient;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use std::env;
use std::sync::Arc;
use tracing::info;

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Stack Refresh Controller");

    // Load configuration from environment variables
    let namespace = env::var("WATCH_NAMESPACE").map_err(|_| {
        ControllerError::InvalidConfig("WATCH_NAMESPACE environment variable is required".to_string())
    })?;
    let settings = RefreshSettings {
        app_name: env_or("APP_NAME", "che"),
        catalog_endpoint: env_or("CATALOG_ENDPOINT", "http://localhost:8080"),
        source_url: env_or("STACK_SOURCE_URL", DEFAULT_SOURCE_URL),
        in_cluster: env_flag("IN_CLUSTER"),
        ..Default::default()
    };
    let run_mode = env_or("RUN_MODE", "poll");
    let workers: usize = env_or("WORKERS", "1")
        .parse()
        .map_err(|_| ControllerError::InvalidConfig("WORKERS must be a number".to_string()))?;

    info!("Configuration:");
    info!("  Namespace: {}", namespace);
    info!("  App name: {}", settings.app_name);
    info!("  Catalog endpoint: {}", settings.catalog_endpoint);
    info!("  Stack source URL: {}", settings.source_url);
    info!("  In-cluster: {}", settings.in_cluster);
    info!("  Run mode: {}", run_mode);

    // Kubernetes client and pod API for the target namespace
    let kube_client = Client::try_default().await.map_err(ControllerError::Kube)?;
    let pod_api: Api<Pod> = Api::namespaced(kube_client, &namespace);
    let source = Box::new(KubePodSource::new(pod_api));

    // Stack catalog client
    let catalog = Arc::new(CatalogClient::new()?);
    let controller = Arc::new(RefreshController::new(catalog, settings));

    match run_mode.as_str() {
        "daemon" => runner::keep_alive(controller, source, workers).await,
        "poll" => runner::tick_and_refresh(controller, source, workers).await,
        other => Err(ControllerError::InvalidConfig(format!(
            "RUN_MODE must be 'daemon' or 'poll', got '{}'",
            other
        ))),
    }
}
