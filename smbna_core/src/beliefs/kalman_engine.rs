// smbna_core/src/beliefs/kalman_engine.rs

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::belief::{BeliefState, MetadataValue, MAG_VECTOR_KEY};
use crate::beliefs::{BeliefEngine, EngineOutput};
use crate::config::unit_interval;
use crate::error::{ConfigError, EstimationError};
use crate::estimation::filters::kf::KalmanFilter;
use crate::estimation::StateEstimator;
use crate::messages::StepInput;
use crate::types::BeliefId;

/// How an engine's self-reported confidence evolves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceConfig {
    /// Confidence published before the first step.
    pub initial: f64,
    /// Factor applied to the confidence on every step without a fused measurement.
    pub dropout_decay: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            dropout_decay: 0.98,
        }
    }
}

impl ConfidenceConfig {
    /// Defaults for an engine that never fuses a measurement.
    pub fn dead_reckoning() -> Self {
        Self {
            initial: 0.9,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        unit_interval("confidence.initial", self.initial)?;
        unit_interval("confidence.dropout_decay", self.dropout_decay)
    }
}

/// Maps a normalized innovation to a confidence in `[0, 1]`.
///
/// `exp(-0.5 * NIS / m)`: a residual of one sigma per axis gives ~0.61.
fn confidence_from_nis(nis: f64, measurement_dim: usize) -> f64 {
    if !nis.is_finite() || measurement_dim == 0 {
        return 0.0;
    }
    (-0.5 * nis / measurement_dim as f64).exp().clamp(0.0, 1.0)
}

/// A belief engine backed by a linear Kalman filter.
///
/// With a measurement model it is a sensor-aided belief (e.g. GPS); without
/// one it dead-reckons on the control input alone.
#[derive(Debug, Clone)]
pub struct KalmanBeliefEngine {
    id: BeliefId,
    filter: KalmanFilter,
    initial_filter: KalmanFilter,
    confidence_config: ConfidenceConfig,
    confidence: f64,
}

impl KalmanBeliefEngine {
    pub fn new(
        id: impl Into<BeliefId>,
        filter: KalmanFilter,
        confidence_config: ConfidenceConfig,
    ) -> Result<Self, ConfigError> {
        confidence_config.validate()?;
        Ok(Self {
            id: id.into(),
            initial_filter: filter.clone(),
            filter,
            confidence: confidence_config.initial,
            confidence_config,
        })
    }

    pub fn filter(&self) -> &KalmanFilter {
        &self.filter
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl BeliefEngine for KalmanBeliefEngine {
    fn id(&self) -> &BeliefId {
        &self.id
    }

    fn step(&mut self, input: &StepInput) -> Result<EngineOutput, EstimationError> {
        // Work on a copy; the engine only moves forward if the whole step succeeds.
        let mut filter = self.filter.clone();

        // 1. PREDICT: every step advances the filter, with or without data.
        filter.predict(&input.control, input.dt)?;

        // 2. UPDATE: fuse the first reading this engine's model understands.
        let z = filter.measurement_model().and_then(|model| {
            input
                .measurements
                .iter()
                .find_map(|message| model.extract(&message.data))
        });
        let innovation = match z {
            Some(z) => Some(filter.update(&z)?),
            None => None,
        };

        // 3. Confidence follows the innovation, or decays through a dropout.
        let confidence = match &innovation {
            Some(inn) => confidence_from_nis(inn.nis, inn.dim()),
            None => self.confidence * self.confidence_config.dropout_decay,
        };

        // 4. Publish a fresh snapshot.
        let state = filter.get_state();
        let mut belief = BeliefState::new(
            self.id.clone(),
            state.position(),
            state.velocity(),
            state.position_covariance(),
            confidence,
            input.timestamp,
        )?
        .with_metadata("measurement_fused", MetadataValue::Bool(innovation.is_some()));
        if let Some(inn) = &innovation {
            belief = belief
                .with_metadata("innovation_norm", MetadataValue::Float(inn.norm))
                .with_metadata("nis", MetadataValue::Float(inn.nis));
        }
        if let Some(field) = input.magnetometer() {
            belief = belief.with_metadata(MAG_VECTOR_KEY, field.into());
        }

        let innovation_norm = innovation.as_ref().map_or(f64::NAN, |inn| inn.norm);
        debug!(
            belief = %self.id,
            t = input.timestamp,
            fused = innovation.is_some(),
            innovation_norm,
            confidence,
            "engine step"
        );

        // 5. Commit.
        self.filter = filter;
        self.confidence = confidence;
        Ok(EngineOutput {
            belief,
            innovation_norm,
        })
    }

    fn reset(&mut self) {
        self.filter = self.initial_filter.clone();
        self.confidence = self.confidence_config.initial;
    }
}
