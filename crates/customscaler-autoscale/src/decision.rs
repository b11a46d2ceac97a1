//! Decision engine: maps one observation onto a scaling decision.
//!
//! Compares the sampled metric against the policy's thresholds and emits a
//! single-step scaling decision. Applying the decision is the reconciler's
//! job.

use std::time::Duration;

use tracing::debug;

use customscaler_state::ScalingPolicy;

use crate::validate::{ConfigError, validate};

/// Why a pass left the replica count unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// The last scaling action is more recent than the cooldown period.
    Cooldown,
    /// The metric lies between the thresholds (inclusive).
    DeadZone,
    /// Scale-up wanted, but the workload is already at `maxReplicas`.
    AtCeiling,
    /// Scale-down wanted, but the workload is already at `minReplicas`.
    AtFloor,
}

impl HoldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReason::Cooldown => "cooldown",
            HoldReason::DeadZone => "dead_zone",
            HoldReason::AtCeiling => "at_ceiling",
            HoldReason::AtFloor => "at_floor",
        }
    }
}

/// Direction of a scaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A scaling decision for a single policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// No change. `next_check_delay` is set when the caller should not
    /// re-evaluate before it elapses (cooldown).
    Hold {
        reason: HoldReason,
        next_check_delay: Option<Duration>,
    },
    /// Set the replica count to the given value.
    ScaleTo(i32),
}

impl ScaleDecision {
    fn hold(reason: HoldReason) -> Self {
        ScaleDecision::Hold {
            reason,
            next_check_delay: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, ScaleDecision::Hold { .. })
    }

    /// Direction of a `ScaleTo` relative to `current`; `None` for holds.
    pub fn direction(&self, current: i32) -> Option<Direction> {
        match *self {
            ScaleDecision::ScaleTo(n) if n > current => Some(Direction::Up),
            ScaleDecision::ScaleTo(n) if n < current => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Everything the engine needs for one decision.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub policy: &'a ScalingPolicy,
    pub metric_value: i32,
    pub current_replicas: i32,
    /// Unix seconds.
    pub now: u64,
    /// Unix seconds of the last actual scaling action; 0 = never.
    pub last_scale_time: u64,
}

/// Remaining cooldown, if the last scaling action is still too recent.
///
/// A clock behind `last_scale_time` counts as zero elapsed time.
pub fn cooldown_remaining(policy: &ScalingPolicy, now: u64, last_scale_time: u64) -> Option<Duration> {
    let cooldown = u64::try_from(policy.cooldown_period_seconds).unwrap_or(0);
    let elapsed = now.saturating_sub(last_scale_time);
    (elapsed < cooldown).then(|| Duration::from_secs(cooldown - elapsed))
}

/// Decide whether to scale up, scale down, or hold.
pub fn evaluate(input: &EvaluationInput<'_>) -> Result<ScaleDecision, ConfigError> {
    let policy = input.policy;
    validate(policy)?;

    if let Some(remaining) = cooldown_remaining(policy, input.now, input.last_scale_time) {
        return Ok(ScaleDecision::Hold {
            reason: HoldReason::Cooldown,
            next_check_delay: Some(remaining),
        });
    }

    let current = input.current_replicas;
    let metric = input.metric_value;

    if metric > policy.scale_up_threshold {
        let desired = current.saturating_add(1).min(policy.max_replicas);
        if desired > current {
            debug!(
                policy = %policy.table_key(),
                from = current,
                to = desired,
                metric,
                threshold = policy.scale_up_threshold,
                "scaling up"
            );
            return Ok(ScaleDecision::ScaleTo(desired));
        }
        return Ok(ScaleDecision::hold(HoldReason::AtCeiling));
    }

    if metric < policy.scale_down_threshold {
        let desired = current.saturating_sub(1).max(policy.min_replicas);
        if desired < current {
            debug!(
                policy = %policy.table_key(),
                from = current,
                to = desired,
                metric,
                threshold = policy.scale_down_threshold,
                "scaling down"
            );
            return Ok(ScaleDecision::ScaleTo(desired));
        }
        return Ok(ScaleDecision::hold(HoldReason::AtFloor));
    }

    Ok(ScaleDecision::hold(HoldReason::DeadZone))
}
