// smbna_core/src/beliefs/mod.rs

//! Belief engines: one independent estimator per sensor modality, each
//! publishing a fresh `BeliefState` every timestep.

use dyn_clone::DynClone;
use std::fmt::Debug;

use crate::belief::BeliefState;
use crate::error::EstimationError;
use crate::messages::StepInput;
use crate::types::BeliefId;

/// What one engine publishes for one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub belief: BeliefState,
    /// `||y||` of the fused measurement, or NaN when nothing was fused.
    pub innovation_norm: f64,
}

impl EngineOutput {
    pub fn measurement_fused(&self) -> bool {
        !self.innovation_norm.is_nan()
    }
}

/// The contract for any independent state-estimation source.
///
/// An engine exclusively owns its filter state. It reads the shared step
/// input, ignores readings its models do not understand, and publishes an
/// immutable snapshot.
pub trait BeliefEngine: DynClone + Debug + Send + Sync {
    /// Stable identifier, unique within one pipeline.
    fn id(&self) -> &BeliefId;

    /// Advances the engine by one timestep.
    fn step(&mut self, input: &StepInput) -> Result<EngineOutput, EstimationError>;

    /// Returns the engine to its construction-time state.
    fn reset(&mut self);
}

dyn_clone::clone_trait_object!(BeliefEngine);

pub mod kalman_engine;

pub use kalman_engine::{ConfidenceConfig, KalmanBeliefEngine};
