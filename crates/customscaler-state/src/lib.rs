//! customscaler-state: embedded resource store for customscaler.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for scaling policies (spec + status), store-backed workloads, and
//! the scaling event log.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Policies and workloads are keyed `{namespace}/{name}`; events are keyed
//! `{policy_key}:{seq}` so a prefix scan yields them in order.
//!
//! Every spec write bumps the record's `resource_version` and publishes a
//! [`PolicyChange`] on a broadcast channel. Status writes are guarded by the
//! version the writer read and do not publish.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
