use crate::belief::{BeliefHistory, BeliefState};
use crate::invariants::Invariant;

/// Catches a belief that claims near-certainty while also reporting an
/// implausibly tight covariance, the signature of a filter that has been
/// captured by a consistent spoofer.
#[derive(Debug, Clone)]
pub struct CovarianceHonesty {
    conf_high: f64,
    sigma_min: f64,
}

impl CovarianceHonesty {
    pub fn new(conf_high: f64, sigma_min: f64) -> Self {
        Self {
            conf_high,
            sigma_min,
        }
    }
}

impl Invariant for CovarianceHonesty {
    fn name(&self) -> &'static str {
        "covariance_honesty"
    }

    fn score(&self, belief: &BeliefState, _history: &BeliefHistory, _siblings: &[&BeliefState]) -> f64 {
        let overconfident = belief.internal_confidence() > self.conf_high;
        let too_tight = belief.covariance().trace() < self.sigma_min;
        if overconfident && too_tight {
            1.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    fn belief(confidence: f64, variance: f64) -> BeliefState {
        BeliefState::from_slices(
            "gps",
            &[0.0, 0.0],
            &[0.0, 0.0],
            DMatrix::identity(2, 2) * variance,
            confidence,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn both_conditions_are_required() {
        let inv = CovarianceHonesty::new(0.95, 0.5);
        let empty = BeliefHistory::new();

        assert_eq!(inv.score(&belief(0.99, 0.1), &empty, &[]), 1.0);
        assert_eq!(inv.score(&belief(0.90, 0.1), &empty, &[]), 0.0);
        assert_eq!(inv.score(&belief(0.99, 1.0), &empty, &[]), 0.0);
    }

    #[test]
    fn thresholds_are_strict() {
        let inv = CovarianceHonesty::new(0.95, 0.5);
        // trace = 0.5 exactly, confidence = 0.95 exactly
        assert_eq!(inv.score(&belief(0.95, 0.1), &BeliefHistory::new(), &[]), 0.0);
        assert_eq!(inv.score(&belief(0.99, 0.25), &BeliefHistory::new(), &[]), 0.0);
    }
}
