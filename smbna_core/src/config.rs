// smbna_core/src/config.rs

//! Calibration values for invariants, arbitration and refusal.
//!
//! Every threshold the decision logic uses lives here so it can be tuned per
//! platform. The `Default` impls carry the documented defaults; `validate`
//! rejects values the math cannot work with instead of silently clamping them.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =========================================================================
// == Invariant Thresholds ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvariantConfig {
    /// Largest plausible acceleration between consecutive beliefs (m/s^2).
    pub max_accel: f64,
    /// Largest plausible speed of the platform (m/s).
    pub max_airspeed: f64,
    /// Confidence above which a belief counts as "claiming certainty".
    pub conf_high: f64,
    /// Covariance trace below which a confident belief is flagged as dishonest (m^2).
    pub sigma_min: f64,
    /// Sigma multiplier for cross-belief disagreement.
    pub coherence_k: f64,
    /// Largest tolerated angle between expected and measured field (radians).
    pub max_field_angle: f64,
}

impl Default for InvariantConfig {
    fn default() -> Self {
        Self {
            max_accel: 10.0,
            max_airspeed: 100.0,
            conf_high: 0.95,
            sigma_min: 0.5,
            coherence_k: 3.0,
            max_field_angle: 0.35,
        }
    }
}

impl InvariantConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("invariants.max_accel", self.max_accel)?;
        positive("invariants.max_airspeed", self.max_airspeed)?;
        unit_interval("invariants.conf_high", self.conf_high)?;
        non_negative("invariants.sigma_min", self.sigma_min)?;
        non_negative("invariants.coherence_k", self.coherence_k)?;
        positive("invariants.max_field_angle", self.max_field_angle)
    }
}

// =========================================================================
// == Arbitration & Refusal ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArbiterConfig {
    /// Penalty scaling factor in `trust = confidence * exp(-lambda * penalty)`.
    pub lambda: f64,
    /// Minimum trust required to emit a navigation estimate.
    pub trust_min: f64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            trust_min: 0.3,
        }
    }
}

impl ArbiterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("arbiter.lambda", self.lambda)?;
        unit_interval("arbiter.trust_min", self.trust_min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefusalConfig {
    /// Innovation norm (distance units) above which navigation is refused.
    pub threshold: f64,
}

impl Default for RefusalConfig {
    fn default() -> Self {
        Self {
            threshold: crate::refusal::DEFAULT_REFUSAL_THRESHOLD,
        }
    }
}

impl RefusalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("refusal.threshold", self.threshold)
    }
}

/// How per-invariant penalties of one belief collapse into a single score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Violations compound; one clean invariant can never mask another.
    #[default]
    Sum,
    /// Only the worst violation counts.
    Max,
}

// =========================================================================
// == Top-Level Navigation Config ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    pub invariants: InvariantConfig,
    pub arbiter: ArbiterConfig,
    pub refusal: RefusalConfig,
    pub aggregation: AggregationPolicy,
    /// Optional retention cap for each belief history. `None` keeps everything.
    pub history_capacity: Option<usize>,
}

impl NavigationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.invariants.validate()?;
        self.arbiter.validate()?;
        self.refusal.validate()?;
        if self.history_capacity == Some(0) {
            return Err(ConfigError::invalid(
                "history_capacity",
                "must hold at least one entry",
            ));
        }
        Ok(())
    }
}

// --- Validation helpers ---

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("expected a finite value > 0, got {value}"),
        ))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("expected a finite value >= 0, got {value}"),
        ))
    }
}

pub(crate) fn unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("expected a value in [0, 1], got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(NavigationConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_lambda() {
        let config = ArbiterConfig {
            lambda: 0.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "arbiter.lambda",
                ..
            }
        ));
    }

    #[test]
    fn rejects_nan_threshold() {
        let config = RefusalConfig {
            threshold: f64::NAN,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_history_capacity() {
        let config = NavigationConfig {
            history_capacity: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn aggregation_defaults_to_sum() {
        assert_eq!(AggregationPolicy::default(), AggregationPolicy::Sum);
    }
}
