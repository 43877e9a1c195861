// smbna_core/src/invariants/mod.rs

//! Consistency checks that turn a belief, its history and its siblings into a
//! non-negative penalty. `0.0` means no violation was detected.

use crate::belief::{BeliefHistory, BeliefState};
use crate::config::InvariantConfig;
use crate::field::FieldModel;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A single, independent consistency check.
///
/// Implementations are pure: the same inputs always give the same penalty,
/// and missing data (short history, no siblings, no measured field) scores
/// zero rather than failing.
pub trait Invariant: DynClone + Debug + Send + Sync {
    /// Stable name used as the key of the per-invariant penalty breakdown.
    fn name(&self) -> &'static str;

    /// Penalty in `[0, +inf)` for `belief`.
    ///
    /// `history` holds earlier states of the same belief (it may or may not
    /// already end with `belief`). `siblings` are the other current beliefs,
    /// never `belief` itself.
    fn score(&self, belief: &BeliefState, history: &BeliefHistory, siblings: &[&BeliefState]) -> f64;
}

dyn_clone::clone_trait_object!(Invariant);

/// The five standard checks, configured from `config`.
pub fn standard_invariants(
    config: &InvariantConfig,
    field_model: Box<dyn FieldModel>,
) -> Vec<Box<dyn Invariant>> {
    vec![
        Box::new(TemporalSmoothness::new(config.max_accel)),
        Box::new(PhysicsFeasibility::new(config.max_airspeed)),
        Box::new(CovarianceHonesty::new(config.conf_high, config.sigma_min)),
        Box::new(CrossBeliefCoherence::new(config.coherence_k)),
        Box::new(EarthFieldStructure::new(config.max_field_angle, field_model)),
    ]
}

/// `(value - limit) / limit` when `value` exceeds `limit`, else zero.
pub(crate) fn relative_excess(value: f64, limit: f64) -> f64 {
    if value > limit {
        (value - limit) / limit
    } else {
        0.0
    }
}

pub mod coherence;
pub mod covariance;
pub mod earth_field;
pub mod physics;
pub mod temporal;

pub use coherence::CrossBeliefCoherence;
pub use covariance::CovarianceHonesty;
pub use earth_field::EarthFieldStructure;
pub use physics::PhysicsFeasibility;
pub use temporal::TemporalSmoothness;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::UniformFieldModel;

    #[test]
    fn standard_set_has_unique_names() {
        let set = standard_invariants(
            &InvariantConfig::default(),
            Box::new(UniformFieldModel::default()),
        );
        let mut names: Vec<_> = set.iter().map(|inv| inv.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn relative_excess_is_zero_at_the_limit() {
        assert_eq!(relative_excess(100.0, 100.0), 0.0);
        assert!((relative_excess(150.0, 100.0) - 0.5).abs() < 1e-12);
        assert_eq!(relative_excess(f64::NAN, 100.0), 0.0);
    }
}
