use crate::belief::{BeliefHistory, BeliefState};
use crate::invariants::{relative_excess, Invariant};

/// Penalizes speeds the airframe cannot reach.
#[derive(Debug, Clone)]
pub struct PhysicsFeasibility {
    max_airspeed: f64,
}

impl PhysicsFeasibility {
    pub fn new(max_airspeed: f64) -> Self {
        Self { max_airspeed }
    }
}

impl Invariant for PhysicsFeasibility {
    fn name(&self) -> &'static str {
        "physics_feasibility"
    }

    fn score(&self, belief: &BeliefState, _history: &BeliefHistory, _siblings: &[&BeliefState]) -> f64 {
        relative_excess(belief.speed(), self.max_airspeed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::test_support::planar;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stationary_belief_is_feasible() {
        let b = planar("gps", [0.0, 0.0], [0.0, 0.0], 0.0);
        assert_eq!(PhysicsFeasibility::new(100.0).score(&b, &BeliefHistory::new(), &[]), 0.0);
    }

    #[test]
    fn overspeed_is_relative_excess() {
        let b = planar("gps", [0.0, 0.0], [100.0, 100.0], 0.0);
        let penalty = PhysicsFeasibility::new(100.0).score(&b, &BeliefHistory::new(), &[]);
        assert_abs_diff_eq!(penalty, 0.414, epsilon = 1e-3);
    }
}
