// smbna_sim/src/simulation/runner.rs

//! Closed-loop runs: environment, estimators and decision logic stepped in
//! lockstep, with one record per timestep.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use nalgebra::{DMatrix, DVector, Vector2, Vector3};
use tracing::{debug, info};

use smbna_core::prelude::*;

use crate::simulation::config::{ScenarioConfig, Variant};
use crate::simulation::environment::{Environment, TruthState};
use crate::simulation::metrics::{nan_safe_stats, SeriesStats};
use crate::simulation::prng::SimulationRng;

/// Id of the GPS-aided belief in both variants.
pub const GPS_BELIEF: &str = "gps";
/// Id of the IMU-only belief of the multi-belief variant.
pub const DEAD_RECKONING_BELIEF: &str = "dead_reckoning";

// =========================================================================
// == Records ==
// =========================================================================

/// Everything observed at one timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub time: f64,
    pub truth: TruthState,
    /// Position the vehicle navigates on, `None` when navigation was refused.
    pub estimate: Option<Vector2<f64>>,
    pub gps_available: bool,
    pub gps_spoofed: bool,
    /// Innovation norm of the GPS belief, NaN when nothing was fused.
    pub innovation_norm: f64,
    pub decision: Decision,
    /// Aggregated invariant penalty per belief. Empty for the baseline.
    pub penalties: BTreeMap<BeliefId, f64>,
    /// Trust per belief. Empty for the baseline.
    pub trust: BTreeMap<BeliefId, f64>,
}

impl StepRecord {
    pub fn position_error(&self) -> Option<f64> {
        self.estimate.map(|est| (est - self.truth.position).norm())
    }

    /// A spoofed GPS fix made it into the navigation output.
    pub fn spoof_accepted(&self) -> bool {
        self.gps_spoofed && self.decision.selected().map(BeliefId::as_str) == Some(GPS_BELIEF)
    }
}

/// The full trace of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationLog {
    pub variant: Variant,
    pub seed: u64,
    pub records: Vec<StepRecord>,
}

/// Headline numbers of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub variant: Variant,
    pub seed: u64,
    pub steps: usize,
    pub refusals: usize,
    pub refusal_rate: f64,
    /// Fraction of steps with a GPS fix.
    pub gps_availability: f64,
    pub spoofed_fixes: usize,
    pub spoofs_accepted: usize,
    pub mean_position_error: Option<f64>,
    /// Error at the last step that produced an estimate.
    pub final_position_error: Option<f64>,
    pub innovation: Option<SeriesStats>,
}

impl SimulationLog {
    pub fn summary(&self) -> RunSummary {
        let steps = self.records.len();
        let ratio = |count: usize| {
            if steps == 0 {
                0.0
            } else {
                count as f64 / steps as f64
            }
        };
        let refusals = self.records.iter().filter(|r| r.decision.is_unsafe()).count();
        let gps_steps = self.records.iter().filter(|r| r.gps_available).count();
        let errors: Vec<f64> = self.records.iter().filter_map(StepRecord::position_error).collect();

        RunSummary {
            variant: self.variant,
            seed: self.seed,
            steps,
            refusals,
            refusal_rate: ratio(refusals),
            gps_availability: ratio(gps_steps),
            spoofed_fixes: self.records.iter().filter(|r| r.gps_spoofed).count(),
            spoofs_accepted: self.records.iter().filter(|r| r.spoof_accepted()).count(),
            mean_position_error: nan_safe_stats(errors.iter().copied()).map(|s| s.mean),
            final_position_error: errors.last().copied(),
            innovation: nan_safe_stats(self.records.iter().map(|r| r.innovation_norm)),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3} m"));
        writeln!(f, "variant:              {} (seed {})", self.variant, self.seed)?;
        writeln!(f, "steps:                {}", self.steps)?;
        writeln!(
            f,
            "refusals:             {} ({:.1}%)",
            self.refusals,
            100.0 * self.refusal_rate
        )?;
        writeln!(f, "gps availability:     {:.1}%", 100.0 * self.gps_availability)?;
        writeln!(
            f,
            "spoofed fixes:        {} ({} accepted)",
            self.spoofed_fixes, self.spoofs_accepted
        )?;
        writeln!(f, "mean position error:  {}", opt(self.mean_position_error))?;
        writeln!(f, "final position error: {}", opt(self.final_position_error))?;
        match &self.innovation {
            Some(stats) => write!(f, "innovation norm:      {stats}"),
            None => write!(f, "innovation norm:      n/a"),
        }
    }
}

// =========================================================================
// == Navigators ==
// =========================================================================

/// What a navigator reports for one step.
struct NavigationStep {
    decision: Decision,
    estimate: Option<Vector2<f64>>,
    innovation_norm: f64,
    penalties: BTreeMap<BeliefId, f64>,
    trust: BTreeMap<BeliefId, f64>,
}

/// The estimator stack under test.
enum Navigator {
    /// A lone GPS filter; the innovation gate is its only defense.
    Baseline {
        engine: KalmanBeliefEngine,
        gate: RefusalGate,
    },
    MultiBelief(NavigationPipeline),
}

impl Navigator {
    fn build(config: &ScenarioConfig, initial: &FilterState) -> anyhow::Result<Self> {
        let gps = kalman_engine(
            GPS_BELIEF,
            config,
            initial,
            true,
            config.filter.gps_confidence,
        )?;
        match config.simulation.variant {
            Variant::Baseline => Ok(Navigator::Baseline {
                engine: gps,
                gate: RefusalGate::new(config.navigation.refusal)?,
            }),
            Variant::MultiBelief => {
                let dead_reckoning = kalman_engine(
                    DEAD_RECKONING_BELIEF,
                    config,
                    initial,
                    false,
                    config.filter.dead_reckoning_confidence,
                )?;
                let field = UniformFieldModel::new(Vector3::from(config.sensors.magnetometer.field));
                let pipeline = NavigationPipeline::new(config.navigation, Box::new(field))?
                    .with_engine(Box::new(gps))?
                    .with_engine(Box::new(dead_reckoning))?;
                Ok(Navigator::MultiBelief(pipeline))
            }
        }
    }

    fn step(&mut self, input: &StepInput) -> anyhow::Result<NavigationStep> {
        match self {
            Navigator::Baseline { engine, gate } => {
                let output = engine.step(input)?;
                let decision = if gate.should_refuse(output.innovation_norm) {
                    Decision::NavUnsafe {
                        reason: RefusalReason::InnovationExceeded,
                    }
                } else {
                    Decision::Selected {
                        belief_id: engine.id().clone(),
                        confidence: output.belief.internal_confidence(),
                    }
                };
                let estimate = (!decision.is_unsafe()).then(|| planar(output.belief.position()));
                Ok(NavigationStep {
                    decision,
                    estimate,
                    innovation_norm: output.innovation_norm,
                    penalties: BTreeMap::new(),
                    trust: BTreeMap::new(),
                })
            }
            Navigator::MultiBelief(pipeline) => {
                let report = pipeline.step(input)?;
                let estimate = report.selected_belief().map(|b| planar(b.position()));
                let innovation_norm = report
                    .innovation_norms
                    .get(GPS_BELIEF)
                    .copied()
                    .unwrap_or(f64::NAN);
                Ok(NavigationStep {
                    decision: report.decision,
                    estimate,
                    innovation_norm,
                    penalties: report.scores.penalties,
                    trust: report.trust,
                })
            }
        }
    }
}

fn planar(position: &DVector<f64>) -> Vector2<f64> {
    Vector2::new(position[0], position[1])
}

fn kalman_engine(
    id: &str,
    config: &ScenarioConfig,
    initial: &FilterState,
    gps_aided: bool,
    confidence: ConfidenceConfig,
) -> anyhow::Result<KalmanBeliefEngine> {
    let dim = initial.dim();
    let dynamics = ConstantVelocityModel::for_state(initial);
    let model = if gps_aided {
        let gps = PositionMeasurementModel::isotropic(2, config.sensors.gps.noise_stddev)?;
        Some(Box::new(gps) as Box<dyn Measurement>)
    } else {
        None
    };
    let filter = KalmanFilter::new(
        initial.clone(),
        DMatrix::identity(dim, dim) * config.filter.process_noise,
        Box::new(dynamics),
        model,
    )
    .with_context(|| format!("failed to build the '{id}' filter"))?;
    Ok(KalmanBeliefEngine::new(id, filter, confidence)?)
}

/// Initial estimate: truth perturbed by `initial_error_stddev` on every component.
fn initial_estimate(config: &ScenarioConfig, truth: &TruthState, rng: &mut SimulationRng) -> FilterState {
    let mut state = FilterState::new(planar_layout(), config.filter.initial_covariance, 0.0);
    let sigma = config.filter.initial_error_stddev;
    state.vector = DVector::from_iterator(
        truth.as_array().len(),
        truth.as_array().into_iter().map(|x| x + rng.gaussian(sigma)),
    );
    state
}

// =========================================================================
// == Run ==
// =========================================================================

/// Runs one seeded scenario to completion.
pub fn run_simulation(config: &ScenarioConfig) -> anyhow::Result<SimulationLog> {
    config.validate()?;
    let mut rng = SimulationRng::from_seed(config.simulation.seed);

    // 1. Estimators start from a perturbed copy of the initial truth.
    let truth = TruthState::from_config(&config.truth);
    let initial = initial_estimate(config, &truth, &mut rng);
    let mut navigator = Navigator::build(config, &initial)?;

    // 2. The environment takes over the generator for all sensor noise.
    let mut environment = Environment::new(config, rng);
    let steps = config.step_count();
    info!(
        variant = %config.simulation.variant,
        seed = config.simulation.seed,
        steps,
        "starting simulation"
    );

    let mut records = Vec::with_capacity(steps);
    for k in 1..=steps {
        let frame = environment.step(k);
        let nav = navigator
            .step(&frame.input)
            .with_context(|| format!("navigation failed at t = {:.2}", frame.input.timestamp))?;

        let record = StepRecord {
            time: frame.input.timestamp,
            truth: *environment.truth(),
            estimate: nav.estimate,
            gps_available: frame.gps.fix.is_some(),
            gps_spoofed: frame.gps.spoofed,
            innovation_norm: nav.innovation_norm,
            decision: nav.decision,
            penalties: nav.penalties,
            trust: nav.trust,
        };
        if record.spoof_accepted() {
            debug!(t = record.time, innovation_norm = record.innovation_norm, "spoofed fix accepted");
        }
        records.push(record);
    }

    let log = SimulationLog {
        variant: config.simulation.variant,
        seed: config.simulation.seed,
        records,
    };
    let summary = log.summary();
    info!(
        refusals = summary.refusals,
        spoofs_accepted = summary.spoofs_accepted,
        mean_position_error = ?summary.mean_position_error,
        "simulation finished"
    );
    Ok(log)
}
