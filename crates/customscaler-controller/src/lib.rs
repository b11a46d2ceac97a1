//! customscaler-controller: drives reconciliation passes for scaling policies.
//!
//! ```text
//! StateStore::subscribe ──► WorkQueue ──► worker × N ──► Reconciler::reconcile
//!                              ▲                               │
//!                              └──── add_after(Action / backoff) ◄┘
//! ```
//!
//! The [`WorkQueue`] never hands the same policy key to two workers at once,
//! so the [`Reconciler`] can assume a single writer per policy and takes no
//! locks of its own. All retry policy lives in [`Controller`]; the decision
//! engine it calls is pure.

pub mod backoff;
pub mod clock;
pub mod controller;
pub mod error;
pub mod queue;
pub mod reconciler;

pub use backoff::RetryBackoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{Controller, ControllerConfig};
pub use error::ReconcileError;
pub use queue::WorkQueue;
pub use reconciler::{Action, PassOutcome, Reconciled, Reconciler, ReconcilerConfig};
