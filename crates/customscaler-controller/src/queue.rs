//! Deduplicating work queue of policy keys.
//!
//! A key is in at most one of three places: waiting in the queue, being
//! processed by a worker, or both "processing" and "dirty" (re-added while a
//! worker held it). A dirty key goes back on the queue when its worker calls
//! [`WorkQueue::done`], so two workers never hold the same key.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<String>,
    /// Keys that need a pass: queued, or re-added while processing.
    dirty: HashSet<String>,
    processing: HashSet<String>,
    /// Earliest pending delayed add per key.
    delayed: HashMap<String, Instant>,
    shutting_down: bool,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as needing a pass. No-op if it is already waiting.
    pub async fn add(&self, key: &str) {
        let mut state = self.state.lock().await;
        if state.shutting_down || state.dirty.contains(key) {
            return;
        }
        state.dirty.insert(key.to_string());
        if state.processing.contains(key) {
            trace!(%key, "key busy, deferred until done");
            return;
        }
        state.queue.push_back(key.to_string());
        drop(state);
        self.notify.notify_one();
    }

    /// Add `key` once `delay` has elapsed.
    ///
    /// Only the earliest pending deadline per key is kept.
    pub async fn add_after(self: &Arc<Self>, key: &str, delay: Duration) {
        if delay.is_zero() {
            self.add(key).await;
            return;
        }

        let deadline = Instant::now() + delay;
        {
            let mut state = self.state.lock().await;
            if state.shutting_down {
                return;
            }
            if let Some(existing) = state.delayed.get(key)
                && *existing <= deadline
            {
                return;
            }
            state.delayed.insert(key.to_string(), deadline);
        }

        let queue = Arc::clone(self);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut state = queue.state.lock().await;
                // Superseded by an earlier deadline.
                if state.delayed.get(&key) != Some(&deadline) {
                    return;
                }
                state.delayed.remove(&key);
            }
            queue.add(&key).await;
        });
    }

    /// Wait for the next key. Returns `None` once the queue is shut down.
    pub async fn get(&self) -> Option<String> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock().await;
                if state.shutting_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Release `key` after a pass. Requeues it if it was added meanwhile.
    pub async fn done(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) && !state.shutting_down {
            state.queue.push_back(key.to_string());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys and wake every waiting worker.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.shutting_down = true;
        state.queue.clear();
        state.dirty.clear();
        state.delayed.clear();
        drop(state);
        self.notify.notify_waiters();
    }

    /// Keys waiting to be handed out.
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
