//! Policy coherence checks.
//!
//! Policies are admitted without schema validation, so incoherent bounds
//! surface here, at evaluation time, instead of being clamped into something
//! meaningless.

use thiserror::Error;

use customscaler_state::ScalingPolicy;

/// An incoherent scaling policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("scaleDownThreshold ({down}) must be below scaleUpThreshold ({up})")]
    ThresholdsInverted { down: i32, up: i32 },

    #[error("minReplicas ({0}) must not be negative")]
    NegativeMinReplicas(i32),

    #[error("minReplicas ({min}) must not exceed maxReplicas ({max})")]
    ReplicaBoundsInverted { min: i32, max: i32 },

    #[error("cooldownPeriodSeconds ({0}) must not be negative")]
    NegativeCooldown(i32),
}

/// Check the cross-field invariants of a policy.
pub fn validate(policy: &ScalingPolicy) -> Result<(), ConfigError> {
    if policy.scale_down_threshold >= policy.scale_up_threshold {
        return Err(ConfigError::ThresholdsInverted {
            down: policy.scale_down_threshold,
            up: policy.scale_up_threshold,
        });
    }
    if policy.min_replicas < 0 {
        return Err(ConfigError::NegativeMinReplicas(policy.min_replicas));
    }
    if policy.min_replicas > policy.max_replicas {
        return Err(ConfigError::ReplicaBoundsInverted {
            min: policy.min_replicas,
            max: policy.max_replicas,
        });
    }
    if policy.cooldown_period_seconds < 0 {
        return Err(ConfigError::NegativeCooldown(policy.cooldown_period_seconds));
    }
    Ok(())
}
