//! Local cache of watched pod snapshots.
//!
//! The watch feeder writes here; workers read the latest snapshot for a
//! key at dequeue time. A watch channel carries the "initial list
//! complete" signal so the controller can bound its startup wait.

use crate::snapshot::PodSnapshot;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::watch;

/// Shared key → snapshot store plus the initial-sync signal.
#[derive(Debug)]
pub struct SnapshotCache {
    snapshots: RwLock<HashMap<String, PodSnapshot>>,
    synced_tx: watch::Sender<bool>,
}

impl SnapshotCache {
    /// Create an empty, unsynced cache.
    pub fn new() -> Self {
        let (synced_tx, _) = watch::channel(false);
        Self {
            snapshots: RwLock::new(HashMap::new()),
            synced_tx,
        }
    }

    /// Insert or replace the snapshot for its key.
    pub fn upsert(&self, snapshot: PodSnapshot) {
        let key = snapshot.key();
        self.snapshots.write().unwrap().insert(key, snapshot);
    }

    /// Remove a key after a delete event.
    pub fn remove(&self, key: &str) {
        self.snapshots.write().unwrap().remove(key);
    }

    /// Latest snapshot for a key, if any.
    pub fn get(&self, key: &str) -> Option<PodSnapshot> {
        self.snapshots.read().unwrap().get(key).cloned()
    }

    /// Mark the initial list as complete.
    pub fn mark_synced(&self) {
        self.synced_tx.send_replace(true);
    }

    /// Whether the initial list has completed.
    pub fn has_synced(&self) -> bool {
        *self.synced_tx.borrow()
    }

    /// Receiver for the sync signal, for bounded startup waits.
    pub fn synced_receiver(&self) -> watch::Receiver<bool> {
        self.synced_tx.subscribe()
    }
}

impl Default for SnapshotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PodPhase;

    fn snapshot(name: &str) -> PodSnapshot {
        PodSnapshot {
            namespace: "eclipse-che".to_string(),
            name: name.to_string(),
            labels: Default::default(),
            phase: PodPhase::Pending,
            pod_ip: None,
            containers: Vec::new(),
        }
    }

    #[test]
    fn test_upsert_supersedes_previous_snapshot() {
        let cache = SnapshotCache::new();
        cache.upsert(snapshot("che-1"));

        let mut newer = snapshot("che-1");
        newer.phase = PodPhase::Running;
        cache.upsert(newer);

        let got = cache.get("eclipse-che/che-1").unwrap();
        assert_eq!(got.phase, PodPhase::Running);
    }

    #[test]
    fn test_remove_clears_key() {
        let cache = SnapshotCache::new();
        cache.upsert(snapshot("che-1"));
        cache.remove("eclipse-che/che-1");
        assert!(cache.get("eclipse-che/che-1").is_none());
    }

    #[test]
    fn test_sync_flag() {
        let cache = SnapshotCache::new();
        assert!(!cache.has_synced());
        cache.mark_synced();
        assert!(cache.has_synced());
    }
}
