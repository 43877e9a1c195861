// smbna_core/src/scoring.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::belief::{BeliefHistory, BeliefState};
use crate::config::AggregationPolicy;
use crate::invariants::Invariant;
use crate::types::BeliefId;

/// Per-invariant penalties of one belief, keyed by invariant name.
pub type PenaltyBreakdown = BTreeMap<&'static str, f64>;

/// Result of scoring every belief at one timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreReport {
    /// Raw penalty of every (belief, invariant) pair, retained for logging.
    pub per_invariant: BTreeMap<BeliefId, PenaltyBreakdown>,
    /// Aggregated penalty per belief, the arbiter's input.
    pub penalties: BTreeMap<BeliefId, f64>,
}

impl ScoreReport {
    pub fn penalty(&self, id: &BeliefId) -> Option<f64> {
        self.penalties.get(id).copied()
    }
}

/// Runs a fixed set of invariants over all current beliefs.
#[derive(Debug, Clone)]
pub struct InvariantScorer {
    invariants: Vec<Box<dyn Invariant>>,
    aggregation: AggregationPolicy,
}

impl InvariantScorer {
    pub fn new(invariants: Vec<Box<dyn Invariant>>, aggregation: AggregationPolicy) -> Self {
        Self {
            invariants,
            aggregation,
        }
    }

    pub fn invariant_names(&self) -> Vec<&'static str> {
        self.invariants.iter().map(|inv| inv.name()).collect()
    }

    /// Scores every belief against its own history, with all *other* current
    /// beliefs as siblings. A belief with no entry in `histories` is scored
    /// against an empty history.
    pub fn evaluate(
        &self,
        beliefs: &[BeliefState],
        histories: &BTreeMap<BeliefId, BeliefHistory>,
    ) -> ScoreReport {
        let empty = BeliefHistory::new();
        let mut report = ScoreReport::default();

        for (idx, belief) in beliefs.iter().enumerate() {
            let history = histories.get(belief.belief_id()).unwrap_or(&empty);
            let siblings: Vec<&BeliefState> = beliefs
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != idx)
                .map(|(_, b)| b)
                .collect();

            let breakdown: PenaltyBreakdown = self
                .invariants
                .iter()
                .map(|inv| (inv.name(), inv.score(belief, history, &siblings)))
                .collect();
            let penalty = self.aggregate(breakdown.values().copied());

            debug!(
                belief = %belief.belief_id(),
                penalty,
                breakdown = ?breakdown,
                "scored belief"
            );
            report.penalties.insert(belief.belief_id().clone(), penalty);
            report
                .per_invariant
                .insert(belief.belief_id().clone(), breakdown);
        }
        report
    }

    fn aggregate(&self, penalties: impl Iterator<Item = f64>) -> f64 {
        match self.aggregation {
            AggregationPolicy::Sum => penalties.sum(),
            AggregationPolicy::Max => penalties.fold(0.0, f64::max),
        }
    }
}
