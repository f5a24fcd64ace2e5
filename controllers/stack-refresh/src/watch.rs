//! Kubernetes pod watch feeder.
//!
//! Subscribes to pod events in the target namespace and reduces them to
//! `PodEvent`s for the controller. This is the production implementation
//! of `PodEventSource`; tests script their own.

use crate::controller::{PodEvent, PodEventSource, RefreshController};
use crate::error::ControllerError;
use crate::snapshot::PodSnapshot;
use futures::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube_runtime::watcher;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Streams pod events from the Kubernetes API into the controller.
pub struct KubePodSource {
    pod_api: Api<Pod>,
}

impl KubePodSource {
    /// Create a source over the given namespaced pod API.
    pub fn new(pod_api: Api<Pod>) -> Self {
        Self { pod_api }
    }

    fn pod_key(pod: &Pod) -> String {
        format!(
            "{}/{}",
            pod.metadata.namespace.as_deref().unwrap_or_default(),
            pod.metadata.name.as_deref().unwrap_or("<unknown>")
        )
    }
}

#[async_trait::async_trait]
impl PodEventSource for KubePodSource {
    async fn run(
        self: Box<Self>,
        controller: Arc<RefreshController>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), ControllerError> {
        info!("Starting pod watcher");

        let mut stream = Box::pin(watcher(self.pod_api.clone(), watcher::Config::default()));

        loop {
            let event = tokio::select! {
                _ = stop.wait_for(|s| *s) => {
                    info!("Pod watcher stopping");
                    return Ok(());
                }
                event = stream.try_next() => event
                    .map_err(|e| ControllerError::Watch(format!("Watcher stream error: {}", e)))?,
            };

            let Some(event) = event else {
                warn!("Pod watch stream ended");
                return Ok(());
            };

            match event {
                watcher::Event::Apply(pod) => {
                    let snapshot = PodSnapshot::from(&pod);
                    debug!("Pod applied: {}", snapshot.key());
                    controller.handle_event(PodEvent::Applied(snapshot));
                }
                watcher::Event::Delete(pod) => {
                    let key = Self::pod_key(&pod);
                    info!("Pod deleted: {}", key);
                    controller.handle_event(PodEvent::Deleted(key));
                }
                watcher::Event::Init => {
                    debug!("Pod watcher initialized");
                }
                watcher::Event::InitApply(pod) => {
                    let snapshot = PodSnapshot::from(&pod);
                    debug!("Pod init apply: {}", snapshot.key());
                    controller.handle_event(PodEvent::Applied(snapshot));
                }
                watcher::Event::InitDone => {
                    info!("Pod watcher initialization complete");
                    controller.handle_event(PodEvent::SyncDone);
                }
            }
        }
    }
}
