// smbna_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::beliefs::BeliefEngine;
pub use crate::estimation::StateEstimator;
pub use crate::field::FieldModel;
pub use crate::invariants::Invariant;
pub use crate::messages::{MeasurementData, MeasurementMessage, StepInput};
pub use crate::models::estimation::dynamics::EstimationDynamics;
pub use crate::models::estimation::measurement::Measurement;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::belief::{BeliefHistory, BeliefState, MetadataValue, MAG_VECTOR_KEY};
pub use crate::state::layout::{planar_layout, spatial_layout};
pub use crate::state::{FilterState, StateVariable};
pub use crate::types::{BeliefId, Control, State};

// --- Configuration and Errors ---
pub use crate::config::{
    AggregationPolicy, ArbiterConfig, InvariantConfig, NavigationConfig, RefusalConfig,
};
pub use crate::error::{ArbitrationError, ConfigError, EstimationError, PipelineError};

// --- Estimation Algorithms ---
pub use crate::estimation::filters::kf::KalmanFilter;
pub use crate::estimation::kalman::{kf_predict, kf_update, KfPredictParams, KfUpdateParams};
pub use crate::estimation::Innovation;

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::beliefs::{ConfidenceConfig, EngineOutput, KalmanBeliefEngine};
pub use crate::field::{DipoleFieldModel, UniformFieldModel};
pub use crate::models::estimation::dynamics::constant_velocity::ConstantVelocityModel;
pub use crate::models::estimation::measurement::position::PositionMeasurementModel;
pub use crate::models::estimation::measurement::velocity::VelocityMeasurementModel;

// --- Decision Logic ---
pub use crate::arbitration::{trust_score, ArbitrationOutcome, Decision, RefusalReason, TrustArbiter};
pub use crate::pipeline::{NavigationPipeline, StepReport};
pub use crate::refusal::{should_refuse_navigation, RefusalGate, DEFAULT_REFUSAL_THRESHOLD};
pub use crate::scoring::{InvariantScorer, ScoreReport};
