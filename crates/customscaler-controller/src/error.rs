//! Reconcile error taxonomy.

use thiserror::Error;

use customscaler_autoscale::ConfigError;
use customscaler_state::StateError;

/// Why a reconciliation pass did not complete.
///
/// Every variant leaves the policy's persisted status untouched.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The policy's thresholds or bounds are incoherent. Not retried at the
    /// transient cadence.
    #[error("policy {key} is incoherent: {error}")]
    Config {
        key: String,
        #[source]
        error: ConfigError,
    },

    #[error("workload {workload} unreachable: {reason}")]
    TargetUnreachable { workload: String, reason: String },

    #[error("metric {metric_source:?} unavailable: {reason}")]
    MetricUnavailable {
        metric_source: String,
        reason: String,
    },

    #[error("scaling {workload} to {replicas} replicas failed: {reason}")]
    ScaleApplyFailed {
        workload: String,
        replicas: i32,
        reason: String,
    },

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

impl ReconcileError {
    /// Event reason recorded for this failure.
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcileError::Config { .. } => "ConfigError",
            ReconcileError::TargetUnreachable { .. } => "TargetUnreachable",
            ReconcileError::MetricUnavailable { .. } => "MetricUnavailable",
            ReconcileError::ScaleApplyFailed { .. } => "ScaleApplyFailed",
            ReconcileError::State(_) => "StateError",
        }
    }

    /// Whether the failure should be retried with exponential backoff.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ReconcileError::Config { .. })
    }
}
