//! Domain types for the customscaler state store.
//!
//! These types represent the persisted scaling policies, their observed
//! status, store-backed workloads, and the scaling event log. All types are
//! serializable to/from JSON for storage in redb tables and for the REST API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Key of a policy or workload: `{namespace}/{name}`.
pub type PolicyKey = String;

/// Build the `{namespace}/{name}` key used by the policy and workload tables.
pub fn object_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Reject names that are empty or contain a key separator (`/` or `:`).
///
/// Either separator in a namespace or name would make `{namespace}/{name}`
/// keys, or the `{key}:{seq}` event keys built on them, ambiguous.
pub fn check_object_name(field: &str, value: &str) -> StateResult<()> {
    if value.is_empty() {
        return Err(StateError::InvalidName(format!("{field} must not be empty")));
    }
    if let Some(c) = value.chars().find(|c| matches!(c, '/' | ':')) {
        return Err(StateError::InvalidName(format!(
            "{field} {value:?} must not contain '{c}'"
        )));
    }
    Ok(())
}

// ── Policy ────────────────────────────────────────────────────────

/// Namespace-qualified reference to the workload a policy scales.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Key of this workload in the workloads table.
    pub fn table_key(&self) -> String {
        object_key(&self.namespace, &self.name)
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// User-declared scaling policy for one workload.
///
/// No cross-field validation happens on write; incoherent thresholds or
/// bounds are reported by the decision engine at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicy {
    pub namespace: String,
    pub name: String,
    /// The workload whose replica count is managed.
    pub workload_ref: WorkloadRef,
    /// Opaque identifier of the metric backend endpoint/query.
    pub metric_source: String,
    /// Metric value above which the workload scales up (exclusive).
    pub scale_up_threshold: i32,
    /// Metric value below which the workload scales down (exclusive).
    pub scale_down_threshold: i32,
    /// Minimum seconds between two scaling actions.
    #[serde(alias = "cooldownPeriod")]
    pub cooldown_period_seconds: i32,
    pub min_replicas: i32,
    pub max_replicas: i32,
}

impl ScalingPolicy {
    /// Build the composite key for the policies table.
    pub fn table_key(&self) -> PolicyKey {
        object_key(&self.namespace, &self.name)
    }

    /// Check the policy's own names and its workload reference.
    pub fn check_names(&self) -> StateResult<()> {
        check_object_name("namespace", &self.namespace)?;
        check_object_name("name", &self.name)?;
        check_object_name("workloadRef.namespace", &self.workload_ref.namespace)?;
        check_object_name("workloadRef.name", &self.workload_ref.name)
    }
}

/// Observed state written back by the reconciler after each successful pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalingStatus {
    /// Replica count after the last successful pass.
    pub current_replicas: i32,
    /// Unix seconds of the last actual scaling action; 0 = never scaled.
    #[serde(alias = "lastScaledTime")]
    pub last_scale_time: u64,
    /// Metric sample observed by the last successful pass.
    pub current_metric_value: i32,
}

/// A persisted policy: spec, last-known status, and a write version.
///
/// A `PolicyRecord` read at the start of a pass is that pass's immutable
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    pub policy: ScalingPolicy,
    #[serde(default)]
    pub status: ScalingStatus,
    /// Incremented on every spec or status write.
    pub resource_version: u64,
}

impl PolicyRecord {
    pub fn key(&self) -> PolicyKey {
        self.policy.table_key()
    }
}

/// Change notification published by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyChange {
    /// A policy was created or its spec replaced.
    Applied(PolicyKey),
    /// A policy was deleted.
    Deleted(PolicyKey),
}

impl PolicyChange {
    pub fn key(&self) -> &str {
        match self {
            PolicyChange::Applied(key) | PolicyChange::Deleted(key) => key,
        }
    }
}

// ── Workload ──────────────────────────────────────────────────────

/// Replica count of a workload managed through the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkloadRecord {
    pub namespace: String,
    pub name: String,
    pub replicas: i32,
}

impl WorkloadRecord {
    pub fn table_key(&self) -> String {
        object_key(&self.namespace, &self.name)
    }

    pub fn check_names(&self) -> StateResult<()> {
        check_object_name("namespace", &self.namespace)?;
        check_object_name("name", &self.name)
    }
}

/// Wire shape of a replica count read or write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaCount {
    pub replicas: i32,
}

// ── Events ────────────────────────────────────────────────────────

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Normal,
    Warning,
}

/// A single entry in a policy's event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScalingEvent {
    pub policy_key: PolicyKey,
    /// Monotonic sequence number across the store.
    pub seq: u64,
    /// Unix seconds when the event was recorded.
    pub timestamp: u64,
    pub kind: EventKind,
    /// Short machine-readable reason, e.g. `ScaledUp`.
    pub reason: String,
    pub message: String,
}

impl ScalingEvent {
    /// Build the composite key for the events table.
    pub fn table_key(&self) -> String {
        format!("{}:{:020}", self.policy_key, self.seq)
    }
}
