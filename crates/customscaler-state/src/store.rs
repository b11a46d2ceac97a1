//! StateStore: redb-backed resource store for customscaler.
//!
//! Provides typed CRUD operations over scaling policies, store-backed
//! workloads, and the scaling event log. All values are JSON-serialized into
//! redb's `&[u8]` value columns. The store supports both on-disk and
//! in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Capacity of the change notification channel. Slow subscribers that fall
/// further behind observe `RecvError::Lagged` and must re-list.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

const EVENT_SEQ: &str = "event_seq";

/// Events kept per policy. Older entries are pruned as new ones land.
pub const MAX_EVENTS_PER_POLICY: usize = 100;

/// Keys of one policy's events, oldest first.
///
/// Event keys sort by `{policy_key}:{seq}`, so a policy's entries are
/// contiguous; the scan stops at the first key outside the prefix.
fn event_keys<T>(table: &T, prefix: &str) -> StateResult<Vec<String>>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let mut keys = Vec::new();
    for entry in table.range(prefix..).map_err(map_err!(Read))? {
        let (key, _) = entry.map_err(map_err!(Read))?;
        let key = key.value();
        if !key.starts_with(prefix) {
            break;
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

/// Thread-safe resource store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
    changes: broadcast::Sender<PolicyChange>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::from_database(db);
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::from_database(db);
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn from_database(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db: Arc::new(db),
            changes,
        }
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(POLICIES).map_err(map_err!(Table))?;
        txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        txn.open_table(EVENTS).map_err(map_err!(Table))?;
        txn.open_table(META).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Subscribe to policy change notifications.
    ///
    /// Only spec writes and deletes are published; status updates are not.
    pub fn subscribe(&self) -> broadcast::Receiver<PolicyChange> {
        self.changes.subscribe()
    }

    fn publish(&self, change: PolicyChange) {
        // No subscribers is fine: nobody is watching yet.
        let _ = self.changes.send(change);
    }

    // ── Policies ───────────────────────────────────────────────────

    /// Create a policy or replace its spec.
    ///
    /// An existing record keeps its status; its version is bumped.
    pub fn put_policy(&self, policy: &ScalingPolicy) -> StateResult<PolicyRecord> {
        policy.check_names()?;
        let key = policy.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let record;
        {
            let mut table = txn.open_table(POLICIES).map_err(map_err!(Table))?;
            let existing: Option<PolicyRecord> = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    Some(serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?)
                }
                None => None,
            };
            record = match existing {
                Some(old) => PolicyRecord {
                    policy: policy.clone(),
                    status: old.status,
                    resource_version: old.resource_version + 1,
                },
                None => PolicyRecord {
                    policy: policy.clone(),
                    status: ScalingStatus::default(),
                    resource_version: 1,
                },
            };
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version = record.resource_version, "policy stored");
        self.publish(PolicyChange::Applied(key));
        Ok(record)
    }

    /// Get a policy record by namespace/name key.
    pub fn get_policy(&self, key: &str) -> StateResult<Option<PolicyRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(POLICIES).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: PolicyRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List all policy records.
    pub fn list_policies(&self) -> StateResult<Vec<PolicyRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(POLICIES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: PolicyRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        Ok(results)
    }

    /// Delete a policy and its event log. Returns true if it existed.
    pub fn delete_policy(&self, key: &str) -> StateResult<bool> {
        let prefix = format!("{key}:");
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(POLICIES).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();

            let mut events = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            for event_key in &event_keys(&events, &prefix)? {
                events.remove(event_key.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, existed, "policy deleted");
        if existed {
            self.publish(PolicyChange::Deleted(key.to_string()));
        }
        Ok(existed)
    }

    /// Write a policy's status, guarded by the version the caller read.
    ///
    /// Fails with `NotFound` if the policy was deleted and with `Conflict` if
    /// it was written since `expected_version`. Returns the new version.
    pub fn update_status(
        &self,
        key: &str,
        expected_version: u64,
        status: &ScalingStatus,
    ) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let new_version;
        {
            let mut table = txn.open_table(POLICIES).map_err(map_err!(Table))?;
            let mut record: PolicyRecord = match table.get(key).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound(key.to_string())),
            };
            if record.resource_version != expected_version {
                return Err(StateError::Conflict {
                    key: key.to_string(),
                    expected: expected_version,
                    actual: record.resource_version,
                });
            }
            record.status = *status;
            record.resource_version += 1;
            new_version = record.resource_version;
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version = new_version, "policy status updated");
        Ok(new_version)
    }

    // ── Workloads ──────────────────────────────────────────────────

    /// Insert or update a workload record.
    pub fn put_workload(&self, workload: &WorkloadRecord) -> StateResult<()> {
        workload.check_names()?;
        let key = workload.table_key();
        let value = serde_json::to_vec(workload).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, replicas = workload.replicas, "workload stored");
        Ok(())
    }

    /// Get a workload by namespace/name key.
    pub fn get_workload(&self, key: &str) -> StateResult<Option<WorkloadRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let workload: WorkloadRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(workload))
            }
            None => Ok(None),
        }
    }

    /// List all workloads.
    pub fn list_workloads(&self) -> StateResult<Vec<WorkloadRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let workload: WorkloadRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(workload);
        }
        Ok(results)
    }

    /// Set the replica count of an existing workload.
    pub fn set_workload_replicas(&self, key: &str, replicas: i32) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            let mut workload: WorkloadRecord = match table.get(key).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound(key.to_string())),
            };
            workload.replicas = replicas;
            let value = serde_json::to_vec(&workload).map_err(map_err!(Serialize))?;
            table.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, replicas, "workload replicas set");
        Ok(())
    }

    /// Delete a workload by key. Returns true if it existed.
    pub fn delete_workload(&self, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(WORKLOADS).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Append an event to a policy's log.
    ///
    /// The log keeps the newest [`MAX_EVENTS_PER_POLICY`] entries; older ones
    /// are pruned in the same transaction.
    pub fn record_event(
        &self,
        policy_key: &str,
        kind: EventKind,
        reason: &str,
        message: &str,
        timestamp: u64,
    ) -> StateResult<ScalingEvent> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let event;
        {
            let mut meta = txn.open_table(META).map_err(map_err!(Table))?;
            let seq = meta
                .get(EVENT_SEQ)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value())
                .unwrap_or(0)
                + 1;
            meta.insert(EVENT_SEQ, seq).map_err(map_err!(Write))?;

            event = ScalingEvent {
                policy_key: policy_key.to_string(),
                seq,
                timestamp,
                kind,
                reason: reason.to_string(),
                message: message.to_string(),
            };
            let key = event.table_key();
            let value = serde_json::to_vec(&event).map_err(map_err!(Serialize))?;
            let mut table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;

            let kept = event_keys(&table, &format!("{policy_key}:"))?;
            let excess = kept.len().saturating_sub(MAX_EVENTS_PER_POLICY);
            for old in &kept[..excess] {
                table.remove(old.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(event)
    }

    /// Get the most recent `limit` events for a policy, oldest first.
    pub fn list_events(&self, policy_key: &str, limit: usize) -> StateResult<Vec<ScalingEvent>> {
        let prefix = format!("{policy_key}:");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(EVENTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.range(prefix.as_str()..).map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let event: ScalingEvent =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(event);
        }
        let skip = results.len().saturating_sub(limit);
        Ok(results.split_off(skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_policy(namespace: &str, name: &str) -> ScalingPolicy {
        ScalingPolicy {
            namespace: namespace.to_string(),
            name: name.to_string(),
            workload_ref: WorkloadRef::new(namespace, name),
            metric_source: "http://metrics.local:9090/queue_depth".to_string(),
            scale_up_threshold: 80,
            scale_down_threshold: 20,
            cooldown_period_seconds: 60,
            min_replicas: 1,
            max_replicas: 5,
        }
    }

    fn test_workload(namespace: &str, name: &str, replicas: i32) -> WorkloadRecord {
        WorkloadRecord {
            namespace: namespace.to_string(),
            name: name.to_string(),
            replicas,
        }
    }

    // ── Policy CRUD ────────────────────────────────────────────────

    #[test]
    fn policy_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let policy = test_policy("default", "web");

        let stored = store.put_policy(&policy).unwrap();
        assert_eq!(stored.resource_version, 1);
        assert_eq!(stored.status, ScalingStatus::default());

        let retrieved = store.get_policy("default/web").unwrap();
        assert_eq!(retrieved, Some(stored));
    }

    #[test]
    fn policy_get_nonexistent_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_policy("nope/nothing").unwrap().is_none());
    }

    #[test]
    fn policy_replace_keeps_status_and_bumps_version() {
        let store = StateStore::open_in_memory().unwrap();
        let mut policy = test_policy("default", "web");
        let record = store.put_policy(&policy).unwrap();

        let status = ScalingStatus {
            current_replicas: 3,
            last_scale_time: 1000,
            current_metric_value: 85,
        };
        store
            .update_status("default/web", record.resource_version, &status)
            .unwrap();

        policy.max_replicas = 10;
        let replaced = store.put_policy(&policy).unwrap();
        assert_eq!(replaced.resource_version, 3);
        assert_eq!(replaced.status, status);
        assert_eq!(replaced.policy.max_replicas, 10);
    }

    #[test]
    fn policy_list_all() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_policy(&test_policy("ns1", "a")).unwrap();
        store.put_policy(&test_policy("ns1", "b")).unwrap();
        store.put_policy(&test_policy("ns2", "c")).unwrap();

        assert_eq!(store.list_policies().unwrap().len(), 3);
    }

    #[test]
    fn policy_delete_removes_events() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_policy(&test_policy("default", "web")).unwrap();
        store.put_policy(&test_policy("default", "worker")).unwrap();
        store
            .record_event("default/web", EventKind::Normal, "ScaledUp", "3 -> 4", 1000)
            .unwrap();
        store
            .record_event("default/worker", EventKind::Normal, "ScaledUp", "1 -> 2", 1000)
            .unwrap();

        assert!(store.delete_policy("default/web").unwrap());
        assert!(!store.delete_policy("default/web").unwrap());
        assert!(store.get_policy("default/web").unwrap().is_none());
        assert!(store.list_events("default/web", 10).unwrap().is_empty());
        // Other policies untouched.
        assert_eq!(store.list_events("default/worker", 10).unwrap().len(), 1);
    }

    // ── Status writes ──────────────────────────────────────────────

    #[test]
    fn status_update_with_current_version() {
        let store = StateStore::open_in_memory().unwrap();
        let record = store.put_policy(&test_policy("default", "web")).unwrap();

        let status = ScalingStatus {
            current_replicas: 4,
            last_scale_time: 2000,
            current_metric_value: 85,
        };
        let version = store
            .update_status("default/web", record.resource_version, &status)
            .unwrap();
        assert_eq!(version, 2);

        let retrieved = store.get_policy("default/web").unwrap().unwrap();
        assert_eq!(retrieved.status, status);
        assert_eq!(retrieved.resource_version, 2);
    }

    #[test]
    fn status_update_with_stale_version_conflicts() {
        let store = StateStore::open_in_memory().unwrap();
        let policy = test_policy("default", "web");
        let record = store.put_policy(&policy).unwrap();
        // Spec changed after the snapshot was read.
        store.put_policy(&policy).unwrap();

        let err = store
            .update_status("default/web", record.resource_version, &ScalingStatus::default())
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn status_update_on_deleted_policy_is_not_found() {
        let store = StateStore::open_in_memory().unwrap();
        let record = store.put_policy(&test_policy("default", "web")).unwrap();
        store.delete_policy("default/web").unwrap();

        let err = store
            .update_status("default/web", record.resource_version, &ScalingStatus::default())
            .unwrap_err();
        assert!(err.is_not_found());
        // The write did not resurrect the record.
        assert!(store.get_policy("default/web").unwrap().is_none());
    }

    // ── Change notifications ───────────────────────────────────────

    #[test]
    fn changes_published_for_spec_writes_only() {
        let store = StateStore::open_in_memory().unwrap();
        let mut rx = store.subscribe();

        let record = store.put_policy(&test_policy("default", "web")).unwrap();
        store
            .update_status("default/web", record.resource_version, &ScalingStatus::default())
            .unwrap();
        store.delete_policy("default/web").unwrap();
        // Deleting a missing key publishes nothing.
        store.delete_policy("default/web").unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            PolicyChange::Applied("default/web".to_string())
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            PolicyChange::Deleted("default/web".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    // ── Workloads ──────────────────────────────────────────────────

    #[test]
    fn workload_put_get_and_set_replicas() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_workload(&test_workload("default", "web", 3)).unwrap();

        store.set_workload_replicas("default/web", 4).unwrap();
        let workload = store.get_workload("default/web").unwrap().unwrap();
        assert_eq!(workload.replicas, 4);
        assert_eq!(store.list_workloads().unwrap().len(), 1);
    }

    #[test]
    fn workload_set_replicas_missing_is_not_found() {
        let store = StateStore::open_in_memory().unwrap();
        let err = store.set_workload_replicas("default/ghost", 2).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn workload_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_workload(&test_workload("default", "web", 1)).unwrap();

        assert!(store.delete_workload("default/web").unwrap());
        assert!(store.get_workload("default/web").unwrap().is_none());
    }

    // ── Events ─────────────────────────────────────────────────────

    #[test]
    fn events_are_ordered_and_limited() {
        let store = StateStore::open_in_memory().unwrap();
        for i in 0..12 {
            store
                .record_event(
                    "default/web",
                    EventKind::Normal,
                    "ScaledUp",
                    &format!("step {i}"),
                    1000 + i,
                )
                .unwrap();
        }

        let events = store.list_events("default/web", 5).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].message, "step 7");
        assert_eq!(events[4].message, "step 11");
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn events_prefix_does_not_match_sibling_names() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .record_event("default/web", EventKind::Warning, "MetricUnavailable", "", 1)
            .unwrap();
        store
            .record_event("default/web-canary", EventKind::Normal, "ScaledUp", "", 2)
            .unwrap();

        assert_eq!(store.list_events("default/web", 10).unwrap().len(), 1);
    }

    #[test]
    fn event_log_is_capped_per_policy() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .record_event("default/web-canary", EventKind::Normal, "ScaledUp", "", 1)
            .unwrap();
        for i in 0..2000u64 {
            store
                .record_event("default/web", EventKind::Normal, "Hold", &format!("pass {i}"), i)
                .unwrap();
        }
        store
            .record_event("default/webz", EventKind::Normal, "ScaledUp", "", 2)
            .unwrap();

        let events = store.list_events("default/web", usize::MAX).unwrap();
        assert_eq!(events.len(), MAX_EVENTS_PER_POLICY);
        assert_eq!(events[0].message, "pass 1900");
        assert_eq!(events[MAX_EVENTS_PER_POLICY - 1].message, "pass 1999");
        assert!(events.iter().all(|e| e.policy_key == "default/web"));

        // Neighbouring keys on either side are neither pruned nor mixed in.
        assert_eq!(store.list_events("default/web-canary", 10).unwrap().len(), 1);
        assert_eq!(store.list_events("default/webz", 10).unwrap().len(), 1);
    }

    // ── Name checks ────────────────────────────────────────────────

    #[test]
    fn writes_reject_separator_names() {
        let store = StateStore::open_in_memory().unwrap();

        let err = store.put_policy(&test_policy("a", "b/c")).unwrap_err();
        assert!(err.is_invalid_name());
        let mut policy = test_policy("default", "web");
        policy.workload_ref.name = "web:x".to_string();
        assert!(store.put_policy(&policy).unwrap_err().is_invalid_name());
        assert!(store.list_policies().unwrap().is_empty());

        let err = store.put_workload(&test_workload("a/b", "c", 1)).unwrap_err();
        assert!(err.is_invalid_name());
        assert!(store.list_workloads().unwrap().is_empty());
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_policy(&test_policy("prod", "api")).unwrap();
            store
                .record_event("prod/api", EventKind::Normal, "ScaledUp", "1 -> 2", 1)
                .unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let record = store.get_policy("prod/api").unwrap().unwrap();
        assert_eq!(record.policy.name, "api");

        // The event sequence continues after reopen.
        let event = store
            .record_event("prod/api", EventKind::Normal, "ScaledUp", "2 -> 3", 2)
            .unwrap();
        assert_eq!(event.seq, 2);
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_policies().unwrap().is_empty());
        assert!(store.list_workloads().unwrap().is_empty());
        assert!(store.list_events("any/thing", 10).unwrap().is_empty());
        assert!(!store.delete_policy("nope").unwrap());
        assert!(!store.delete_workload("nope").unwrap());
    }
}
