//! Deduplicating work queue.
//!
//! Keys wait here between the watch feeder and the workers with the usual
//! controller-workqueue guarantees:
//!
//! - a key pending in the queue is never added twice;
//! - a key re-added while a worker holds it is parked and re-queued once
//!   the worker calls `done`, so each key has at most one processing in
//!   flight and at-least-once delivery of the dirty signal;
//! - after `shutdown`, `get` drains the remaining keys and then returns
//!   `None` to stop the workers.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    order: VecDeque<String>,
    // Keys waiting in `order` or parked behind a processing worker
    dirty: HashSet<String>,
    // Keys currently held by a worker
    processing: HashSet<String>,
    shutting_down: bool,
}

/// Deduplicating key queue shared by the watch feeder and the workers.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key. No-op if the key is already dirty; a key held by a
    /// worker is parked and re-queued when that worker finishes.
    pub fn add(&self, key: &str) {
        let mut state = self.lock_state();
        if state.shutting_down || state.dirty.contains(key) {
            return;
        }
        state.dirty.insert(key.to_string());
        if !state.processing.contains(key) {
            state.order.push_back(key.to_string());
            drop(state);
            self.notify.notify_waiters();
        }
    }

    /// Pull the next key, waiting if the queue is empty. Returns `None`
    /// once the queue has shut down and drained.
    pub async fn get(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a concurrent add/shutdown
            // cannot slip between the check and the await.
            notified.as_mut().enable();

            {
                let mut state = self.lock_state();
                if let Some(key) = state.order.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Mark a key's processing finished. If the key went dirty again while
    /// it was held, it is re-queued.
    pub fn done(&self, key: &str) {
        let mut state = self.lock_state();
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.order.push_back(key.to_string());
            drop(state);
            self.notify.notify_waiters();
        }
    }

    /// Number of keys waiting to be pulled.
    pub fn len(&self) -> usize {
        self.lock_state().order.len()
    }

    /// Whether no keys are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting keys and wake all waiting workers.
    pub fn shutdown(&self) {
        {
            let mut state = self.lock_state();
            state.shutting_down = true;
        }
        self.notify.notify_waiters();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // Poisoning means a holder panicked; nothing sensible to recover.
        self.state.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_add_deduplicates_pending_keys() {
        let queue = WorkQueue::new();
        queue.add("ns/pod-a");
        queue.add("ns/pod-a");
        queue.add("ns/pod-a");
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.get().await.as_deref(), Some("ns/pod-a"));
        queue.done("ns/pod-a");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_dirty_while_processing_requeues_on_done() {
        let queue = WorkQueue::new();
        queue.add("ns/pod-a");

        let key = queue.get().await.unwrap();
        // Re-added while held: must not appear until done
        queue.add("ns/pod-a");
        assert!(queue.is_empty());

        queue.done(&key);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await.as_deref(), Some("ns/pod-a"));
    }

    #[tokio::test]
    async fn test_shutdown_unblocks_waiting_worker() {
        let queue = Arc::new(WorkQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };

        // Give the worker time to park on the empty queue
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.shutdown();

        let got = waiter.await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_keys_first() {
        let queue = WorkQueue::new();
        queue.add("ns/pod-a");
        queue.shutdown();

        assert_eq!(queue.get().await.as_deref(), Some("ns/pod-a"));
        queue.done("ns/pod-a");
        assert!(queue.get().await.is_none());
    }

    #[tokio::test]
    async fn test_distinct_keys_keep_fifo_order() {
        let queue = WorkQueue::new();
        queue.add("ns/pod-a");
        queue.add("ns/pod-b");
        assert_eq!(queue.get().await.as_deref(), Some("ns/pod-a"));
        assert_eq!(queue.get().await.as_deref(), Some("ns/pod-b"));
    }
}
