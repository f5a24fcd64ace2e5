//! Main controller implementation.
//!
//! Watches the IDE server's pods, and fires one stack-catalog refresh per
//! readiness transition of the server's primary container. The pieces:
//!
//! - a snapshot cache fed by a `PodEventSource` (the kube watch in
//!   production, a scripted source in tests);
//! - a deduplicating work queue of pod keys;
//! - worker loops that resolve each dequeued key against the cache and
//!   drive a per-key edge detector (Watching -> Warming -> Refreshed), so
//!   repeated Running+Ready observations do not re-fire the refresh and a
//!   not-ready observation re-arms the key;
//! - a warm-up delay realized as a delayed re-enqueue, never a worker
//!   sleeping while it holds the key;
//! - bounded Fibonacci-backoff retries for failed refreshes.

use crate::backoff::FibonacciBackoff;
use crate::cache::SnapshotCache;
use crate::error::ControllerError;
use crate::filter::is_app_pod;
use crate::queue::WorkQueue;
use crate::refresher::StackRefresher;
use crate::snapshot::{PodPhase, PodSnapshot};
use catalog_client::StackCatalogApi;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Default URL serving the replacement stack definitions.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/redhat-developer/rh-che/master/assembly/fabric8-stacks/src/main/resources/stacks.json";

/// One observation delivered by a `PodEventSource`.
#[derive(Debug, Clone)]
pub enum PodEvent {
    /// A pod was added or updated
    Applied(PodSnapshot),
    /// The pod with this `namespace/name` key was deleted
    Deleted(String),
    /// The initial list completed; the cache now reflects cluster state
    SyncDone,
}

/// Capability seam for the watch subsystem, so the controller can be
/// driven by a scripted event sequence in tests.
#[async_trait::async_trait]
pub trait PodEventSource: Send + 'static {
    /// Deliver events to the controller until the stream ends or `stop`
    /// fires.
    async fn run(
        self: Box<Self>,
        controller: Arc<RefreshController>,
        stop: watch::Receiver<bool>,
    ) -> Result<(), ControllerError>;
}

/// Tunables for one controller instance.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Deployment name of the IDE server; also its primary container name
    pub app_name: String,
    /// Statically configured catalog endpoint
    pub catalog_endpoint: String,
    /// URL serving the replacement stack definitions
    pub source_url: String,
    /// Substitute the pod IP for the catalog endpoint once discovered
    pub in_cluster: bool,
    /// Delay between readiness and the refresh, so the workspace agent
    /// inside the server can finish starting
    pub warmup: Duration,
    /// Bound on the initial cache sync wait
    pub sync_timeout: Duration,
    /// Refresh attempts per key before the key is dropped
    pub max_attempts: u32,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            app_name: "che".to_string(),
            catalog_endpoint: "http://localhost:8080".to_string(),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            in_cluster: false,
            warmup: Duration::from_secs(15),
            sync_timeout: Duration::from_secs(60),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum KeyPhase {
    Watching,
    Warming { deadline: Instant },
    Refreshed,
}

struct KeyState {
    phase: KeyPhase,
    attempts: u32,
    backoff: FibonacciBackoff,
}

impl Default for KeyState {
    fn default() -> Self {
        Self {
            phase: KeyPhase::Watching,
            attempts: 0,
            backoff: FibonacciBackoff::default(),
        }
    }
}

enum ReadyAction {
    Nothing,
    StartWarmup,
    Refresh,
}

/// Event-driven controller that refreshes the stack catalog once the IDE
/// server pod reports ready.
pub struct RefreshController {
    settings: RefreshSettings,
    cache: SnapshotCache,
    queue: WorkQueue,
    refresher: StackRefresher,
    key_states: Mutex<HashMap<String, KeyState>>,
    // Effective catalog endpoint; rewritten once in-cluster discovery
    // resolves the pod IP
    endpoint: Mutex<String>,
    done_tx: watch::Sender<bool>,
}

impl RefreshController {
    /// Create a controller over the given catalog client.
    pub fn new(catalog: Arc<dyn StackCatalogApi>, settings: RefreshSettings) -> Self {
        let (done_tx, _) = watch::channel(false);
        let endpoint = settings.catalog_endpoint.clone();
        Self {
            settings,
            cache: SnapshotCache::new(),
            queue: WorkQueue::new(),
            refresher: StackRefresher::new(catalog),
            key_states: Mutex::new(HashMap::new()),
            endpoint: Mutex::new(endpoint),
            done_tx,
        }
    }

    /// Completion signal: flips to true exactly once, after a refresh tied
    /// to a readiness transition completed on a synced cache.
    pub fn done_receiver(&self) -> watch::Receiver<bool> {
        self.done_tx.subscribe()
    }

    /// Apply one observation from the event source.
    pub fn handle_event(&self, event: PodEvent) {
        match event {
            PodEvent::Applied(snapshot) => {
                let key = snapshot.key();
                let relevant = is_app_pod(&snapshot, &self.settings.app_name);
                self.cache.upsert(snapshot);
                if relevant {
                    debug!("Adding pod {} to queue", key);
                    self.queue.add(&key);
                }
            }
            PodEvent::Deleted(key) => {
                debug!("Removing pod {} from cache", key);
                self.cache.remove(&key);
                self.queue.add(&key);
            }
            PodEvent::SyncDone => {
                debug!("Pod cache sync complete");
                self.cache.mark_synced();
            }
        }
    }

    /// Run the controller: start the event source, wait (bounded) for the
    /// initial cache sync, then drive `worker_count` workers until `stop`
    /// fires. A sync timeout is a startup failure; no key is processed.
    pub async fn run(
        self: &Arc<Self>,
        source: Box<dyn PodEventSource>,
        worker_count: usize,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), ControllerError> {
        info!("Starting stack refresher");

        let mut source_task = {
            let controller = Arc::clone(self);
            let stop = stop.clone();
            tokio::spawn(async move { source.run(controller, stop).await })
        };

        let mut synced = self.cache.synced_receiver();
        tokio::select! {
            res = tokio::time::timeout(self.settings.sync_timeout, synced.wait_for(|s| *s)) => {
                if !matches!(res, Ok(Ok(_))) {
                    error!("Timed out waiting for the pod cache to sync");
                    source_task.abort();
                    self.queue.shutdown();
                    return Err(ControllerError::SyncTimeout);
                }
            }
            _ = stop.wait_for(|s| *s) => {
                info!("Stop requested before cache sync, shutting down");
                source_task.abort();
                self.queue.shutdown();
                return Ok(());
            }
        }

        info!("Pod cache synced, starting {} workers", worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let controller = Arc::clone(self);
            workers.push(tokio::spawn(async move {
                while controller.process_next().await {}
            }));
        }

        // Stop on signal (a closed stop channel counts as a stop too), or
        // when the event source dies. A dead feeder leaves the workers on
        // a frozen cache, so its failure is the run's failure.
        let outcome = tokio::select! {
            _ = stop.wait_for(|s| *s) => Ok(()),
            result = &mut source_task => match result {
                Ok(Ok(())) => {
                    warn!("Pod event source ended, shutting down");
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!("Pod event source failed: {}", e);
                    Err(e)
                }
                Err(e) => Err(ControllerError::Watch(format!(
                    "Pod event source panicked: {}",
                    e
                ))),
            },
        };

        info!("Stopping stack refresher");
        self.queue.shutdown();
        for worker in workers {
            let _ = worker.await;
        }
        source_task.abort();

        outcome
    }

    /// Pull and process one key. Returns false once the queue reports
    /// shutdown, stopping the calling worker.
    pub async fn process_next(self: &Arc<Self>) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        debug!("Processing key {}", key);
        match self.evaluate(&key).await {
            Ok(()) => self.clear_retries(&key),
            Err(e) => self.handle_refresh_error(&key, &e),
        }
        self.queue.done(&key);

        true
    }

    async fn evaluate(self: &Arc<Self>, key: &str) -> Result<(), ControllerError> {
        let Some(snapshot) = self.cache.get(key) else {
            // Deleted or never cached; nothing to do for this key anymore.
            debug!("Pod {} not in cache, clearing state", key);
            self.key_states.lock().unwrap().remove(key);
            return Ok(());
        };

        let ready = snapshot.phase == PodPhase::Running
            && snapshot.container_ready(&self.settings.app_name);

        if !ready {
            let mut states = self.key_states.lock().unwrap();
            if let Some(state) = states.get_mut(key) {
                if !matches!(state.phase, KeyPhase::Watching) {
                    debug!("Pod {} no longer ready, re-arming refresh", key);
                    state.phase = KeyPhase::Watching;
                }
            }
            return Ok(());
        }

        let action = {
            let mut states = self.key_states.lock().unwrap();
            let state = states.entry(key.to_string()).or_default();
            match state.phase {
                KeyPhase::Refreshed => ReadyAction::Nothing,
                KeyPhase::Watching => {
                    state.phase = KeyPhase::Warming {
                        deadline: Instant::now() + self.settings.warmup,
                    };
                    ReadyAction::StartWarmup
                }
                KeyPhase::Warming { deadline } => {
                    if Instant::now() >= deadline {
                        ReadyAction::Refresh
                    } else {
                        ReadyAction::Nothing
                    }
                }
            }
        };

        match action {
            ReadyAction::Nothing => Ok(()),
            ReadyAction::StartWarmup => {
                info!(
                    "Pod {} ready, waiting {:?} for the workspace agent",
                    key, self.settings.warmup
                );
                self.enqueue_after(key, self.settings.warmup);
                Ok(())
            }
            ReadyAction::Refresh => {
                let endpoint = self.resolve_endpoint(&snapshot);
                self.refresher
                    .refresh(&endpoint, &self.settings.source_url)
                    .await?;

                let mut states = self.key_states.lock().unwrap();
                if let Some(state) = states.get_mut(key) {
                    state.phase = KeyPhase::Refreshed;
                }
                drop(states);

                if self.cache.has_synced() {
                    self.done_tx.send_replace(true);
                }
                Ok(())
            }
        }
    }

    /// Effective catalog endpoint for this refresh. In-cluster mode swaps
    /// in the observed pod IP on port 8080 and remembers it.
    fn resolve_endpoint(&self, snapshot: &PodSnapshot) -> String {
        if self.settings.in_cluster {
            if let Some(ip) = snapshot.pod_ip.as_deref() {
                let resolved = format!("http://{}:8080", ip);
                info!("In-cluster mode, catalog endpoint set to {}", resolved);
                let mut endpoint = self.endpoint.lock().unwrap();
                *endpoint = resolved.clone();
                return resolved;
            }
            warn!(
                "In-cluster mode but pod {}/{} has no IP yet",
                snapshot.namespace, snapshot.name
            );
        }
        self.endpoint.lock().unwrap().clone()
    }

    fn clear_retries(&self, key: &str) {
        let mut states = self.key_states.lock().unwrap();
        if let Some(state) = states.get_mut(key) {
            state.attempts = 0;
            state.backoff.reset();
        }
    }

    fn handle_refresh_error(self: &Arc<Self>, key: &str, err: &ControllerError) {
        error!("Refresh for pod {} failed: {}", key, err);

        let delay = {
            let mut states = self.key_states.lock().unwrap();
            let state = states.entry(key.to_string()).or_default();
            state.attempts += 1;
            if state.attempts >= self.settings.max_attempts {
                None
            } else {
                Some(state.backoff.next_backoff())
            }
        };

        match delay {
            Some(delay) => {
                warn!("Re-queueing pod {} in {:?}", key, delay);
                self.enqueue_after(key, delay);
            }
            None => {
                error!(
                    "Dropping pod {} out of the queue after {} attempts",
                    key, self.settings.max_attempts
                );
                self.key_states.lock().unwrap().remove(key);
            }
        }
    }

    fn enqueue_after(self: &Arc<Self>, key: &str, delay: Duration) {
        let controller = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.queue.add(&key);
        });
    }
}
