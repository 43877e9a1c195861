// smbna_core/src/invariants/temporal.rs

use crate::belief::{BeliefHistory, BeliefState};
use crate::invariants::{relative_excess, Invariant};

/// Smallest time step used when differencing velocities.
const MIN_DT: f64 = 1e-3;

/// Flags velocity jumps that would need more acceleration than the platform has.
///
/// The timeline examined is the history followed by the current belief; when
/// the history already ends with the current belief it is not counted twice.
/// The last two points of that timeline are differenced.
#[derive(Debug, Clone)]
pub struct TemporalSmoothness {
    max_accel: f64,
}

impl TemporalSmoothness {
    pub fn new(max_accel: f64) -> Self {
        Self { max_accel }
    }
}

impl Invariant for TemporalSmoothness {
    fn name(&self) -> &'static str {
        "temporal_smoothness"
    }

    fn score(&self, belief: &BeliefState, history: &BeliefHistory, _siblings: &[&BeliefState]) -> f64 {
        let previous = if history.last() == Some(belief) {
            history.nth_back(1)
        } else {
            history.last()
        };
        let Some(previous) = previous else {
            return 0.0;
        };
        if previous.dim() != belief.dim() {
            return 0.0;
        }

        let dt = belief.timestamp() - previous.timestamp();
        if dt.is_nan() || dt <= 0.0 {
            return 0.0;
        }

        let accel = (belief.velocity() - previous.velocity()) / dt.max(MIN_DT);
        relative_excess(accel.norm(), self.max_accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::test_support::planar;
    use approx::assert_relative_eq;

    #[test]
    fn velocity_jump_is_penalized() {
        let b1 = planar("gps", [0.0, 0.0], [0.0, 0.0], 1.0);
        let b2 = planar("gps", [0.0, 0.0], [100.0, 100.0], 1.1);
        let inv = TemporalSmoothness::new(10.0);

        // History that already holds the current belief.
        let with_current = BeliefHistory::from_states([b1.clone(), b2.clone()]).unwrap();
        let penalty = inv.score(&b2, &with_current, &[]);
        assert!(penalty > 0.0);

        // History that stops before it.
        let without_current = BeliefHistory::from_states([b1]).unwrap();
        assert_relative_eq!(inv.score(&b2, &without_current, &[]), penalty);

        // |accel| = 100 sqrt(2) / 0.1
        let expected = (1000.0 * 2f64.sqrt() - 10.0) / 10.0;
        assert_relative_eq!(penalty, expected, epsilon = 1e-6);
    }

    #[test]
    fn short_history_scores_zero() {
        let b = planar("gps", [0.0, 0.0], [50.0, 0.0], 1.0);
        let inv = TemporalSmoothness::new(10.0);
        assert_eq!(inv.score(&b, &BeliefHistory::new(), &[]), 0.0);

        let only_current = BeliefHistory::from_states([b.clone()]).unwrap();
        assert_eq!(inv.score(&b, &only_current, &[]), 0.0);
    }

    #[test]
    fn non_positive_dt_scores_zero() {
        let b1 = planar("gps", [0.0, 0.0], [0.0, 0.0], 2.0);
        let b2 = planar("gps", [0.0, 0.0], [90.0, 0.0], 2.0);
        let history = BeliefHistory::from_states([b1]).unwrap();
        assert_eq!(TemporalSmoothness::new(10.0).score(&b2, &history, &[]), 0.0);
    }

    #[test]
    fn gentle_acceleration_is_free() {
        let b1 = planar("gps", [0.0, 0.0], [10.0, 0.0], 0.0);
        let b2 = planar("gps", [1.0, 0.0], [10.5, 0.0], 0.1);
        let history = BeliefHistory::from_states([b1]).unwrap();
        assert_eq!(TemporalSmoothness::new(10.0).score(&b2, &history, &[]), 0.0);
    }
}
