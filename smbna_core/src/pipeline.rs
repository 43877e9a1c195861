// smbna_core/src/pipeline.rs

//! One navigation cycle end to end: engines, invariant scoring, trust
//! arbitration and the innovation gate.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::arbitration::{Decision, RefusalReason, TrustArbiter};
use crate::belief::{BeliefHistory, BeliefState};
use crate::beliefs::BeliefEngine;
use crate::config::NavigationConfig;
use crate::error::{ConfigError, EstimationError, PipelineError};
use crate::field::FieldModel;
use crate::invariants::{standard_invariants, Invariant};
use crate::messages::StepInput;
use crate::refusal::RefusalGate;
use crate::scoring::{InvariantScorer, ScoreReport};
use crate::types::BeliefId;

/// Everything one cycle produced. Raw numbers are kept for logging and analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub timestamp: f64,
    /// Beliefs published this step, in engine registration order.
    pub beliefs: Vec<BeliefState>,
    /// Innovation norm per belief (NaN where nothing was fused).
    pub innovation_norms: BTreeMap<BeliefId, f64>,
    pub scores: ScoreReport,
    pub trust: BTreeMap<BeliefId, f64>,
    /// Final decision, after the gate.
    pub decision: Decision,
    /// `true` when the gate overturned a selection.
    pub gate_vetoed: bool,
}

impl StepReport {
    /// The belief navigation should use, if the step was not refused.
    pub fn selected_belief(&self) -> Option<&BeliefState> {
        let id = self.decision.selected()?;
        self.beliefs.iter().find(|b| b.belief_id() == id)
    }

    pub fn is_unsafe(&self) -> bool {
        self.decision.is_unsafe()
    }
}

/// Owns the engines and their histories and runs the per-step control flow.
#[derive(Debug)]
pub struct NavigationPipeline {
    engines: Vec<Box<dyn BeliefEngine>>,
    histories: BTreeMap<BeliefId, BeliefHistory>,
    scorer: InvariantScorer,
    arbiter: TrustArbiter,
    gate: RefusalGate,
    history_capacity: Option<usize>,
}

impl NavigationPipeline {
    /// Builds a pipeline with the five standard invariants.
    pub fn new(config: NavigationConfig, field_model: Box<dyn FieldModel>) -> Result<Self, ConfigError> {
        let invariants = standard_invariants(&config.invariants, field_model);
        Self::with_invariants(config, invariants)
    }

    /// Builds a pipeline with a custom invariant set.
    pub fn with_invariants(
        config: NavigationConfig,
        invariants: Vec<Box<dyn Invariant>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            engines: Vec::new(),
            histories: BTreeMap::new(),
            scorer: InvariantScorer::new(invariants, config.aggregation),
            arbiter: TrustArbiter::new(config.arbiter)?,
            gate: RefusalGate::new(config.refusal)?,
            history_capacity: config.history_capacity,
        })
    }

    /// Registers an engine. Belief ids must be unique.
    pub fn add_engine(&mut self, engine: Box<dyn BeliefEngine>) -> Result<(), ConfigError> {
        let id = engine.id().clone();
        if self.histories.contains_key(&id) {
            return Err(ConfigError::DuplicateBelief(id));
        }
        let history = match self.history_capacity {
            Some(cap) => BeliefHistory::with_capacity_limit(cap),
            None => BeliefHistory::new(),
        };
        info!(belief = %id, "registered belief engine");
        self.histories.insert(id, history);
        self.engines.push(engine);
        Ok(())
    }

    pub fn with_engine(mut self, engine: Box<dyn BeliefEngine>) -> Result<Self, ConfigError> {
        self.add_engine(engine)?;
        Ok(self)
    }

    pub fn engine_ids(&self) -> Vec<&BeliefId> {
        self.engines.iter().map(|e| e.id()).collect()
    }

    pub fn history(&self, id: &BeliefId) -> Option<&BeliefHistory> {
        self.histories.get(id)
    }

    pub fn histories(&self) -> &BTreeMap<BeliefId, BeliefHistory> {
        &self.histories
    }

    pub fn gate(&self) -> &RefusalGate {
        &self.gate
    }

    /// Runs one cycle.
    ///
    /// Beliefs are scored against the histories as they stood *before* this
    /// step; the new snapshots are appended only after the decision is made.
    /// The cycle is atomic: on `Err` no engine has advanced and no history
    /// has grown.
    pub fn step(&mut self, input: &StepInput) -> Result<StepReport, PipelineError> {
        self.check_monotonic(input.timestamp)?;

        // 1. Step staged copies of every engine. All outputs are collected
        //    before scoring, and nothing is committed until the cycle succeeds.
        let mut staged = self.engines.clone();
        let mut beliefs = Vec::with_capacity(staged.len());
        let mut innovation_norms = BTreeMap::new();
        for engine in &mut staged {
            let output = engine.step(input).map_err(|source| PipelineError::Engine {
                belief_id: engine.id().clone(),
                source,
            })?;
            innovation_norms.insert(engine.id().clone(), output.innovation_norm);
            beliefs.push(output.belief);
        }

        // 2. Score.
        let scores = self.scorer.evaluate(&beliefs, &self.histories);

        // 3. Arbitrate.
        let outcome = self.arbiter.evaluate(&beliefs, &scores.penalties)?;

        // 4. Gate the selected belief on its raw innovation.
        let selected_norm = outcome
            .decision
            .selected()
            .map(|id| innovation_norms.get(id).copied().unwrap_or(f64::NAN));
        let gate_vetoed = selected_norm.is_some_and(|norm| self.gate.should_refuse(norm));
        let decision = if gate_vetoed {
            warn!(
                belief = ?outcome.decision.selected(),
                innovation_norm = ?selected_norm,
                threshold = self.gate.threshold(),
                "refusal gate vetoed selection"
            );
            Decision::NavUnsafe {
                reason: RefusalReason::InnovationExceeded,
            }
        } else {
            outcome.decision
        };

        match &decision {
            Decision::NavUnsafe { reason } => {
                info!(t = input.timestamp, %reason, "NAV_UNSAFE")
            }
            Decision::Selected {
                belief_id,
                confidence,
            } => debug!(t = input.timestamp, belief = %belief_id, confidence, "navigation selected"),
        }

        // 5. Commit. `check_monotonic` already cleared every append, and
        //    engines stamp their beliefs with the input time.
        self.engines = staged;
        for belief in &beliefs {
            if let Some(history) = self.histories.get_mut(belief.belief_id()) {
                history
                    .push(belief.clone())
                    .map_err(|source| PipelineError::Engine {
                        belief_id: belief.belief_id().clone(),
                        source,
                    })?;
            }
        }

        Ok(StepReport {
            timestamp: input.timestamp,
            beliefs,
            innovation_norms,
            scores,
            trust: outcome.trust,
            decision,
            gate_vetoed,
        })
    }

    /// Resets every engine and clears every history.
    pub fn reset(&mut self) {
        for engine in &mut self.engines {
            engine.reset();
        }
        for history in self.histories.values_mut() {
            history.clear();
        }
    }

    fn check_monotonic(&self, timestamp: f64) -> Result<(), PipelineError> {
        for (id, history) in &self.histories {
            if let Some(last) = history.last() {
                if timestamp < last.timestamp() {
                    return Err(PipelineError::Engine {
                        belief_id: id.clone(),
                        source: EstimationError::TimestampRegression {
                            belief_id: id.clone(),
                            previous: last.timestamp(),
                            current: timestamp,
                        },
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beliefs::{ConfidenceConfig, KalmanBeliefEngine};
    use crate::estimation::filters::kf::KalmanFilter;
    use crate::field::UniformFieldModel;
    use crate::messages::MeasurementData;
    use crate::models::estimation::dynamics::constant_velocity::ConstantVelocityModel;
    use crate::models::estimation::measurement::position::PositionMeasurementModel;
    use crate::models::estimation::measurement::Measurement;
    use crate::state::layout::planar_layout;
    use crate::state::FilterState;
    use nalgebra::{DMatrix, DVector};

    /// `gps_sigma: None` builds a dead-reckoning engine.
    fn engine(id: &str, gps_sigma: Option<f64>) -> Box<dyn BeliefEngine> {
        engine_at(id, gps_sigma, 0.0)
    }

    fn engine_at(id: &str, gps_sigma: Option<f64>, x0: f64) -> Box<dyn BeliefEngine> {
        let mut state = FilterState::new(planar_layout(), 1.0, 0.0);
        state.vector[0] = x0;
        let dynamics = ConstantVelocityModel::for_state(&state);
        let gps = gps_sigma.is_some();
        let model: Option<Box<dyn Measurement>> = gps_sigma
            .map(|sigma| Box::new(PositionMeasurementModel::isotropic(2, sigma).unwrap()) as _);
        let filter =
            KalmanFilter::new(state, DMatrix::identity(5, 5) * 0.01, Box::new(dynamics), model)
                .unwrap();
        let confidence = if gps {
            ConfidenceConfig::default()
        } else {
            ConfidenceConfig::dead_reckoning()
        };
        Box::new(KalmanBeliefEngine::new(id, filter, confidence).unwrap())
    }

    fn pipeline() -> NavigationPipeline {
        NavigationPipeline::new(
            NavigationConfig::default(),
            Box::new(UniformFieldModel::default()),
        )
        .unwrap()
    }

    fn gps_input(t: f64, x: f64, y: f64) -> StepInput {
        StepInput::new(t, 0.1, DVector::zeros(2))
            .with_measurement(MeasurementData::GpsPosition(DVector::from_row_slice(&[x, y])))
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut p = pipeline();
        p.add_engine(engine("gps", Some(1.0))).unwrap();
        let err = p.add_engine(engine("gps", None)).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateBelief(BeliefId::from("gps")));
    }

    #[test]
    fn empty_pipeline_refuses() {
        let report = pipeline().step(&StepInput::new(0.1, 0.1, DVector::zeros(2))).unwrap();
        assert_eq!(report.decision.refusal_reason(), Some(RefusalReason::NoBeliefs));
    }

    #[test]
    fn histories_grow_after_each_step() {
        let mut p = pipeline().with_engine(engine("gps", Some(1.0))).unwrap();
        for i in 1..=3 {
            p.step(&gps_input(i as f64 * 0.1, 0.0, 0.0)).unwrap();
        }
        assert_eq!(p.history(&BeliefId::from("gps")).map(BeliefHistory::len), Some(3));
    }

    #[test]
    fn large_innovation_is_vetoed() {
        // A loose R keeps the NIS (and so the confidence) healthy while the
        // raw residual still exceeds the gate.
        let mut p = pipeline().with_engine(engine("gps", Some(100.0))).unwrap();
        let report = p.step(&gps_input(0.1, 25.0, 0.0)).unwrap();

        assert!(report.trust[&BeliefId::from("gps")] > 0.9);

        assert!(report.gate_vetoed);
        assert_eq!(
            report.decision.refusal_reason(),
            Some(RefusalReason::InnovationExceeded)
        );
        assert!(report.selected_belief().is_none());
    }

    #[test]
    fn gate_ignores_beliefs_that_were_not_selected() {
        let mut p = NavigationPipeline::with_invariants(NavigationConfig::default(), Vec::new())
            .unwrap()
            .with_engine(engine("gps", Some(1.0)))
            .unwrap()
            .with_engine(engine_at("gps_far", Some(1.0), 500.0))
            .unwrap();
        let report = p.step(&gps_input(0.1, 0.0, 0.0)).unwrap();

        assert!(report.innovation_norms[&BeliefId::from("gps_far")] > 20.0);
        assert_eq!(report.decision.selected(), Some(&BeliefId::from("gps")));
        assert!(!report.gate_vetoed);
    }

    #[test]
    fn failing_engine_rolls_back_the_whole_step() {
        let build = || {
            pipeline()
                .with_engine(engine("dr", None))
                .unwrap()
                .with_engine(engine("gps", Some(1.0)))
                .unwrap()
        };
        let mut p = build();
        // "dr" steps fine before "gps" rejects the 3-D fix.
        let bad = StepInput::new(0.1, 0.1, DVector::zeros(2))
            .with_measurement(MeasurementData::GpsPosition(DVector::zeros(3)));
        let err = p.step(&bad).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Engine {
                source: EstimationError::DimensionMismatch { .. },
                ..
            }
        ));
        assert!(p.histories().values().all(BeliefHistory::is_empty));

        let good = gps_input(0.1, 0.5, 0.0);
        let retried = p.step(&good).unwrap();
        let fresh = build().step(&good).unwrap();
        assert_eq!(retried.beliefs, fresh.beliefs);
    }

    #[test]
    fn timestamp_regression_is_an_error() {
        let mut p = pipeline().with_engine(engine("gps", Some(1.0))).unwrap();
        p.step(&gps_input(1.0, 0.0, 0.0)).unwrap();
        let err = p.step(&gps_input(0.5, 0.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Engine {
                source: EstimationError::TimestampRegression { .. },
                ..
            }
        ));
    }

    #[test]
    fn reset_clears_histories() {
        let mut p = pipeline().with_engine(engine("ins", None)).unwrap();
        p.step(&StepInput::new(0.1, 0.1, DVector::zeros(2))).unwrap();
        p.reset();
        assert!(p.histories().values().all(BeliefHistory::is_empty));
    }
}
