//! customscaler-autoscale: threshold-hysteresis scaling decisions.
//!
//! A pure function of (policy, metric value, replica count, now, last scale
//! time). It never performs I/O and never retries; the reconciler owns both.
//!
//! # Scaling Algorithm
//!
//! ```text
//! if now - last_scale_time < cooldown:
//!     Hold(Cooldown, next_check = cooldown - elapsed)
//!
//! if metric > scale_up_threshold:
//!     desired = min(current + 1, max_replicas)
//!     ScaleTo(desired) if desired > current else Hold(AtCeiling)
//!
//! if metric < scale_down_threshold:
//!     desired = max(current - 1, min_replicas)
//!     ScaleTo(desired) if desired < current else Hold(AtFloor)
//!
//! otherwise:
//!     Hold(DeadZone)   // thresholds themselves are inside the dead zone
//! ```
//!
//! Each decision moves the replica count by exactly one, so an oscillating
//! metric cannot swing the workload by more than one replica per cooldown.

pub mod decision;
pub mod validate;

pub use decision::{
    Direction, EvaluationInput, HoldReason, ScaleDecision, cooldown_remaining, evaluate,
};
pub use validate::{ConfigError, validate};
