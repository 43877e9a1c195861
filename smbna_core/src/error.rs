// smbna_core/src/error.rs

use crate::types::BeliefId;
use thiserror::Error;

/// Failures of the recursive filter and of belief construction.
///
/// Every variant is a configuration or contract error: the caller supplied a
/// time step, matrix or vector the math cannot work with. None of them is
/// retried inside the core.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimationError {
    #[error("time step must be positive and finite, got dt = {0}")]
    NonPositiveDt(f64),

    #[error("innovation covariance S is singular; check the measurement noise R")]
    SingularInnovationCovariance,

    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{0} must be a finite, symmetric positive semidefinite matrix")]
    NotPositiveSemidefinite(&'static str),

    #[error("filter has no measurement model, so it cannot fuse a measurement")]
    NoMeasurementModel,

    #[error("filter state became non-finite after {0}")]
    NonFiniteState(&'static str),

    #[error("state layout does not contain the variables required by {0}")]
    MissingStateVariable(&'static str),

    #[error("internal confidence must lie in [0, 1], got {0}")]
    ConfidenceOutOfRange(f64),

    #[error("belief timestamp must be finite, got {0}")]
    NonFiniteTimestamp(f64),

    #[error("timestamp went backwards for belief '{belief_id}': {previous} -> {current}")]
    TimestampRegression {
        belief_id: BeliefId,
        previous: f64,
        current: f64,
    },

    #[error("history for '{expected}' cannot accept a state from '{actual}'")]
    ForeignBelief { expected: BeliefId, actual: BeliefId },
}

/// Contract violations detected while arbitrating between beliefs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArbitrationError {
    #[error("no penalty score supplied for belief '{0}'")]
    MissingPenalty(BeliefId),

    #[error("belief '{0}' appears more than once in one arbitration")]
    DuplicateBelief(BeliefId),
}

/// Invalid configuration values. Raised at construction time, never defaulted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("belief '{0}' is registered more than once")]
    DuplicateBelief(BeliefId),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Top-level error of one pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("belief engine '{belief_id}' failed: {source}")]
    Engine {
        belief_id: BeliefId,
        #[source]
        source: EstimationError,
    },

    #[error(transparent)]
    Arbitration(#[from] ArbitrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
