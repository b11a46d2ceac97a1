//! Controller: fans store changes out to a fixed pool of reconcile workers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::backoff::RetryBackoff;
use crate::queue::WorkQueue;
use crate::reconciler::{Reconciler, log_failure};

/// Worker pool and retry settings.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// Maximum concurrent passes.
    pub workers: usize,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Retry cadence for policies that fail validation.
    pub config_error_retry: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            config_error_retry: Duration::from_secs(300),
        }
    }
}

pub struct Controller {
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    backoff: Arc<Mutex<RetryBackoff>>,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(reconciler: Reconciler, config: ControllerConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            queue: Arc::new(WorkQueue::new()),
            backoff: Arc::new(Mutex::new(RetryBackoff::new(
                config.backoff_base,
                config.backoff_max,
            ))),
            config,
        }
    }

    pub fn queue(&self) -> Arc<WorkQueue> {
        Arc::clone(&self.queue)
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Every stored policy is queued at start; after that, each policy change
    /// queues its key. A lagging subscription re-queues everything.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let store = self.reconciler.store().clone();
        // Subscribe before listing so no change slips between the two.
        let mut changes = store.subscribe();
        let queued = self.enqueue_all().await?;

        let workers = self.config.workers.max(1);
        info!(workers, policies = queued, "controller started");

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            handles.push(tokio::spawn(worker_loop(
                id,
                Arc::clone(&self.reconciler),
                Arc::clone(&self.queue),
                Arc::clone(&self.backoff),
                self.config,
            )));
        }

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(change) => {
                        debug!(policy = %change.key(), ?change, "policy change");
                        self.queue.add(change.key()).await;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "change feed lagged, re-listing policies");
                        if let Err(e) = self.enqueue_all().await {
                            warn!(error = %e, "re-list failed");
                        }
                    }
                    Err(RecvError::Closed) => {
                        warn!("change feed closed");
                        break;
                    }
                },
                res = shutdown.changed() => {
                    // Sender dropped counts as shutdown.
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("controller shutting down");
        self.queue.shutdown().await;
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task failed");
            }
        }
        info!("controller stopped");
        Ok(())
    }

    async fn enqueue_all(&self) -> anyhow::Result<usize> {
        let records = self.reconciler.store().list_policies()?;
        for record in &records {
            self.queue.add(&record.key()).await;
        }
        Ok(records.len())
    }
}

async fn worker_loop(
    id: usize,
    reconciler: Arc<Reconciler>,
    queue: Arc<WorkQueue>,
    backoff: Arc<Mutex<RetryBackoff>>,
    config: ControllerConfig,
) {
    debug!(worker = id, "worker started");
    while let Some(key) = queue.get().await {
        match reconciler.reconcile(&key).await {
            Ok(reconciled) => {
                backoff.lock().await.reset(&key);
                if let Some(delay) = reconciled.action.requeue_after() {
                    queue.add_after(&key, delay).await;
                }
            }
            Err(err) => {
                let delay = if err.is_transient() {
                    backoff.lock().await.next_delay(&key)
                } else {
                    config.config_error_retry
                };
                log_failure(&key, &err, delay);
                queue.add_after(&key, delay).await;
            }
        }
        queue.done(&key).await;
    }
    debug!(worker = id, "worker stopped");
}
