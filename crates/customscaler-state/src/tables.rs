//! redb table definitions for the customscaler state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Policy records (spec + status + version) keyed by `{namespace}/{name}`.
pub const POLICIES: TableDefinition<&str, &[u8]> = TableDefinition::new("policies");

/// Store-backed workload replica counts keyed by `{namespace}/{name}`.
pub const WORKLOADS: TableDefinition<&str, &[u8]> = TableDefinition::new("workloads");

/// Scaling events keyed by `{policy_key}:{seq:020}`.
pub const EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("events");

/// Store-wide counters (e.g. the event sequence).
pub const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
