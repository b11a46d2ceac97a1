//! Reconciler: one observe/decide/act/record pass for a single policy.
//!
//! A pass loads the policy, checks the cooldown, fetches the workload's
//! replica count and the metric sample, asks the decision engine what to do,
//! applies a scale if needed, then writes the observed status back. Any
//! failure before the status write leaves the stored status untouched.
//!
//! A scale that was applied but whose status write failed is remembered in
//! memory until a later write lands, so the cooldown still covers it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use customscaler_autoscale::{
    Direction, EvaluationInput, HoldReason, ScaleDecision, cooldown_remaining, evaluate, validate,
};
use customscaler_backends::{MetricSource, WorkloadControlPlane};
use customscaler_state::{
    EventKind, PolicyRecord, ScalingPolicy, ScalingStatus, StateError, StateStore,
};

use crate::clock::{Clock, SystemClock};
use crate::error::ReconcileError;

/// What the controller should do with a key after a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    requeue_after: Option<Duration>,
}

impl Action {
    /// Run another pass after `delay`.
    pub fn requeue(delay: Duration) -> Self {
        Self {
            requeue_after: Some(delay),
        }
    }

    /// Only run again when the policy changes.
    pub fn await_change() -> Self {
        Self {
            requeue_after: None,
        }
    }

    pub fn requeue_after(&self) -> Option<Duration> {
        self.requeue_after
    }
}

/// How a completed pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The policy no longer exists (or vanished mid-pass).
    Deleted,
    /// Still inside the cooldown window; nothing was fetched.
    Cooling { remaining: Duration },
    /// Observed and left unchanged.
    Held {
        reason: HoldReason,
        replicas: i32,
        metric: i32,
    },
    /// Replica count changed by one step.
    Scaled { from: i32, to: i32, metric: i32 },
}

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub outcome: PassOutcome,
    pub action: Action,
}

impl Reconciled {
    fn deleted() -> Self {
        Self {
            outcome: PassOutcome::Deleted,
            action: Action::await_change(),
        }
    }
}

/// Timing knobs for a pass.
#[derive(Debug, Clone, Copy)]
pub struct ReconcilerConfig {
    /// Upper bound on each backend call.
    pub call_timeout: Duration,
    /// Fallback interval between passes when nothing else schedules one.
    pub resync_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(5),
            resync_interval: Duration::from_secs(30),
        }
    }
}

pub struct Reconciler {
    store: StateStore,
    metrics: Arc<dyn MetricSource>,
    workloads: Arc<dyn WorkloadControlPlane>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
    /// Scale times applied to a workload but not yet persisted, by policy key.
    unsaved_scales: Mutex<HashMap<String, u64>>,
}

impl Reconciler {
    pub fn new(
        store: StateStore,
        metrics: Arc<dyn MetricSource>,
        workloads: Arc<dyn WorkloadControlPlane>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            metrics,
            workloads,
            clock: Arc::new(SystemClock),
            config,
            unsaved_scales: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one pass for `key` and record a warning event if it fails.
    pub async fn reconcile(&self, key: &str) -> Result<Reconciled, ReconcileError> {
        match self.pass(key).await {
            Ok(reconciled) => {
                log_outcome(key, &reconciled.outcome);
                Ok(reconciled)
            }
            Err(err) => {
                if !matches!(err, ReconcileError::State(_)) {
                    self.record(key, EventKind::Warning, err.reason(), &err.to_string());
                }
                Err(err)
            }
        }
    }

    async fn pass(&self, key: &str) -> Result<Reconciled, ReconcileError> {
        let Some(record) = self.store.get_policy(key)? else {
            self.unsaved_scales.lock().await.remove(key);
            return Ok(Reconciled::deleted());
        };
        let policy = &record.policy;

        validate(policy).map_err(|error| ReconcileError::Config {
            key: key.to_string(),
            error,
        })?;

        let now = self.clock.now();
        let last_scale_time = self.last_scale_time(key, &record).await;
        if let Some(remaining) = cooldown_remaining(policy, now, last_scale_time) {
            return Ok(Reconciled {
                outcome: PassOutcome::Cooling { remaining },
                action: Action::requeue(remaining),
            });
        }

        let current = self.fetch_replicas(policy).await?;
        let metric = self.fetch_metric(policy).await?;

        let decision = evaluate(&EvaluationInput {
            policy,
            metric_value: metric,
            current_replicas: current,
            now,
            last_scale_time,
        })
        .map_err(|error| ReconcileError::Config {
            key: key.to_string(),
            error,
        })?;

        let (outcome, status, next_check) = match decision {
            ScaleDecision::ScaleTo(target) => {
                self.apply(policy, target).await?;
                let scaled_at = self.clock.now();
                self.unsaved_scales
                    .lock()
                    .await
                    .insert(key.to_string(), scaled_at);
                let status = ScalingStatus {
                    current_replicas: target,
                    last_scale_time: scaled_at,
                    current_metric_value: metric,
                };
                let outcome = PassOutcome::Scaled {
                    from: current,
                    to: target,
                    metric,
                };
                (outcome, status, None)
            }
            ScaleDecision::Hold {
                reason,
                next_check_delay,
            } => {
                let status = ScalingStatus {
                    current_replicas: current,
                    last_scale_time,
                    current_metric_value: metric,
                };
                let outcome = PassOutcome::Held {
                    reason,
                    replicas: current,
                    metric,
                };
                (outcome, status, next_check_delay)
            }
        };

        let written = self.write_status(key, &record, &status);
        if written.is_ok() {
            self.unsaved_scales.lock().await.remove(key);
        }
        if !written? {
            info!(policy = %key, "policy deleted mid-pass, status not written");
            return Ok(Reconciled::deleted());
        }

        if let PassOutcome::Scaled { from, to, metric } = outcome {
            let (reason, verb) = match decision.direction(from) {
                Some(Direction::Down) => ("ScaledDown", "down"),
                _ => ("ScaledUp", "up"),
            };
            let message = format!(
                "scaled {} {verb} from {from} to {to} (metric {metric})",
                policy.workload_ref
            );
            self.record(key, EventKind::Normal, reason, &message);
        }

        Ok(Reconciled {
            outcome,
            action: Action::requeue(next_check.unwrap_or(self.config.resync_interval)),
        })
    }

    /// The stored `lastScaleTime`, or a newer scale whose status write failed.
    async fn last_scale_time(&self, key: &str, record: &PolicyRecord) -> u64 {
        let stored = record.status.last_scale_time;
        match self.unsaved_scales.lock().await.get(key) {
            Some(&unsaved) => stored.max(unsaved),
            None => stored,
        }
    }

    async fn fetch_replicas(&self, policy: &ScalingPolicy) -> Result<i32, ReconcileError> {
        let workload = &policy.workload_ref;
        self.bounded(self.workloads.get_replica_count(workload))
            .await
            .map_err(|reason| ReconcileError::TargetUnreachable {
                workload: workload.to_string(),
                reason,
            })
    }

    async fn fetch_metric(&self, policy: &ScalingPolicy) -> Result<i32, ReconcileError> {
        let source = policy.metric_source.as_str();
        self.bounded(self.metrics.sample(source))
            .await
            .map_err(|reason| ReconcileError::MetricUnavailable {
                metric_source: source.to_string(),
                reason,
            })
    }

    async fn apply(&self, policy: &ScalingPolicy, replicas: i32) -> Result<(), ReconcileError> {
        let workload = &policy.workload_ref;
        self.bounded(self.workloads.set_replica_count(workload, replicas))
            .await
            .map_err(|reason| ReconcileError::ScaleApplyFailed {
                workload: workload.to_string(),
                replicas,
                reason,
            })
    }

    /// Await a backend call under the configured timeout.
    async fn bounded<T, E, F>(&self, call: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.config.call_timeout)),
        }
    }

    /// Write `status` against the version read at the start of the pass.
    ///
    /// Returns `false` if the policy is gone. A spec change mid-pass gets one
    /// more write against the fresh version.
    fn write_status(
        &self,
        key: &str,
        record: &PolicyRecord,
        status: &ScalingStatus,
    ) -> Result<bool, ReconcileError> {
        match self.store.update_status(key, record.resource_version, status) {
            Ok(_) => Ok(true),
            Err(StateError::NotFound(_)) => Ok(false),
            Err(StateError::Conflict { actual, .. }) => {
                debug!(policy = %key, expected = record.resource_version, actual, "status conflict, retrying");
                let Some(fresh) = self.store.get_policy(key)? else {
                    return Ok(false);
                };
                match self.store.update_status(key, fresh.resource_version, status) {
                    Ok(_) => Ok(true),
                    Err(StateError::NotFound(_)) => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn record(&self, key: &str, kind: EventKind, reason: &str, message: &str) {
        if let Err(e) = self
            .store
            .record_event(key, kind, reason, message, self.clock.now())
        {
            warn!(policy = %key, %reason, error = %e, "failed to record event");
        }
    }
}

fn log_outcome(key: &str, outcome: &PassOutcome) {
    match *outcome {
        PassOutcome::Deleted => debug!(policy = %key, "policy gone, nothing to do"),
        PassOutcome::Cooling { remaining } => {
            debug!(policy = %key, remaining_secs = remaining.as_secs(), "cooling down")
        }
        PassOutcome::Held {
            reason,
            replicas,
            metric,
        } => debug!(policy = %key, reason = reason.as_str(), replicas, metric, "holding"),
        PassOutcome::Scaled { from, to, metric } => {
            info!(policy = %key, from, to, metric, "scaled workload")
        }
    }
}

/// Log a failed pass at the level its error class deserves.
pub(crate) fn log_failure(key: &str, err: &ReconcileError, retry_in: Duration) {
    let retry_ms = retry_in.as_millis() as u64;
    if err.is_transient() {
        warn!(policy = %key, reason = err.reason(), error = %err, retry_ms, "reconcile failed");
    } else {
        error!(policy = %key, error = %err, retry_ms, "policy configuration invalid");
    }
}
