use crate::belief::{BeliefHistory, BeliefState};
use crate::invariants::Invariant;

/// Floor on the combined trace so coincident, zero-covariance beliefs do not divide by zero.
const MIN_COMBINED_TRACE: f64 = 1e-9;

/// Compares a belief's position against every sibling belief.
///
/// A sibling disagrees when the position gap exceeds `k` combined standard
/// deviations. The penalty is the worst `delta / trace(P + P_s)` over the
/// disagreeing siblings. Siblings of a different spatial dimension are skipped.
#[derive(Debug, Clone)]
pub struct CrossBeliefCoherence {
    k: f64,
}

impl CrossBeliefCoherence {
    pub fn new(k: f64) -> Self {
        Self { k }
    }
}

impl Invariant for CrossBeliefCoherence {
    fn name(&self) -> &'static str {
        "cross_belief_coherence"
    }

    fn score(&self, belief: &BeliefState, _history: &BeliefHistory, siblings: &[&BeliefState]) -> f64 {
        siblings
            .iter()
            .filter(|s| s.dim() == belief.dim() && s.belief_id() != belief.belief_id())
            .map(|sibling| {
                let delta = (belief.position() - sibling.position()).norm();
                let combined = (belief.covariance() + sibling.covariance())
                    .trace()
                    .max(MIN_COMBINED_TRACE);
                if delta > self.k * combined.sqrt() {
                    delta / combined
                } else {
                    0.0
                }
            })
            .fold(0.0, f64::max)
    }
}
