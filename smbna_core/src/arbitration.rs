// smbna_core/src/arbitration.rs

//! Trust arbitration: confidence discounted by invariant penalty, then either
//! a single selected belief or an explicit refusal.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::belief::BeliefState;
use crate::config::ArbiterConfig;
use crate::error::{ArbitrationError, ConfigError};
use crate::types::BeliefId;

// =========================================================================
// == Decision Types ==
// =========================================================================

/// Why a timestep produced no navigation output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefusalReason {
    /// No engine published a belief.
    NoBeliefs,
    /// The best trust score fell below the configured minimum.
    ConfidenceCollapse,
    /// The refusal gate vetoed the selected belief's innovation.
    InnovationExceeded,
}

impl RefusalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalReason::NoBeliefs => "no beliefs available",
            RefusalReason::ConfidenceCollapse => "confidence collapse",
            RefusalReason::InnovationExceeded => "innovation exceeds threshold",
        }
    }
}

impl fmt::Display for RefusalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The per-timestep outcome. Exactly one of the two, never retained as state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Navigate on `belief_id`. `confidence` is its trust score, always `> 0`.
    Selected { belief_id: BeliefId, confidence: f64 },
    /// NAV_UNSAFE: withhold the navigation estimate.
    NavUnsafe { reason: RefusalReason },
}

impl Decision {
    pub fn is_unsafe(&self) -> bool {
        matches!(self, Decision::NavUnsafe { .. })
    }

    pub fn selected(&self) -> Option<&BeliefId> {
        match self {
            Decision::Selected { belief_id, .. } => Some(belief_id),
            Decision::NavUnsafe { .. } => None,
        }
    }

    pub fn refusal_reason(&self) -> Option<RefusalReason> {
        match self {
            Decision::Selected { .. } => None,
            Decision::NavUnsafe { reason } => Some(*reason),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Selected {
                belief_id,
                confidence,
            } => write!(f, "selected '{belief_id}' (confidence {confidence:.3})"),
            Decision::NavUnsafe { reason } => write!(f, "NAV_UNSAFE ({reason})"),
        }
    }
}

// =========================================================================
// == Trust ==
// =========================================================================

/// `trust = confidence * exp(-lambda * penalty)`.
///
/// Monotone non-increasing in `penalty` and bounded by `[0, confidence]` for
/// non-negative penalties. A NaN input yields zero trust.
pub fn trust_score(confidence: f64, penalty: f64, lambda: f64) -> f64 {
    if confidence.is_nan() || penalty.is_nan() {
        return 0.0;
    }
    confidence * (-lambda * penalty.max(0.0)).exp()
}

/// Trust scores and the decision they produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ArbitrationOutcome {
    pub decision: Decision,
    pub trust: BTreeMap<BeliefId, f64>,
}

/// Stateless arbiter. Every call recomputes from its inputs.
#[derive(Debug, Clone, Copy)]
pub struct TrustArbiter {
    config: ArbiterConfig,
}

impl TrustArbiter {
    pub fn new(config: ArbiterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Trust of every belief. Fails if any belief has no penalty entry or if
    /// two beliefs share an id.
    pub fn trust_scores(
        &self,
        beliefs: &[BeliefState],
        penalties: &BTreeMap<BeliefId, f64>,
    ) -> Result<BTreeMap<BeliefId, f64>, ArbitrationError> {
        let mut trust = BTreeMap::new();
        for belief in beliefs {
            let id = belief.belief_id();
            let penalty = *penalties
                .get(id)
                .ok_or_else(|| ArbitrationError::MissingPenalty(id.clone()))?;
            if penalty.is_nan() {
                warn!(belief = %id, "NaN penalty, treating belief as untrusted");
            }
            let score = trust_score(belief.internal_confidence(), penalty, self.config.lambda);
            if trust.insert(id.clone(), score).is_some() {
                return Err(ArbitrationError::DuplicateBelief(id.clone()));
            }
        }
        Ok(trust)
    }

    /// Full arbitration: trust scores plus the resulting decision.
    pub fn evaluate(
        &self,
        beliefs: &[BeliefState],
        penalties: &BTreeMap<BeliefId, f64>,
    ) -> Result<ArbitrationOutcome, ArbitrationError> {
        let trust = self.trust_scores(beliefs, penalties)?;

        // argmax, ties go to the lexicographically smallest id
        let best = trust.iter().fold(None, |best: Option<(&BeliefId, f64)>, (id, &t)| match best {
            Some((best_id, best_t)) if best_t > t || (best_t == t && best_id < id) => best,
            _ => Some((id, t)),
        });

        let decision = match best {
            None => Decision::NavUnsafe {
                reason: RefusalReason::NoBeliefs,
            },
            Some((_, best_trust)) if best_trust < self.config.trust_min || best_trust <= 0.0 => {
                Decision::NavUnsafe {
                    reason: RefusalReason::ConfidenceCollapse,
                }
            }
            Some((id, best_trust)) => Decision::Selected {
                belief_id: id.clone(),
                confidence: best_trust,
            },
        };
        Ok(ArbitrationOutcome { decision, trust })
    }

    /// Selects a belief or refuses.
    pub fn arbitrate(
        &self,
        beliefs: &[BeliefState],
        penalties: &BTreeMap<BeliefId, f64>,
    ) -> Result<Decision, ArbitrationError> {
        self.evaluate(beliefs, penalties).map(|outcome| outcome.decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DMatrix;

    fn belief(id: &str, confidence: f64) -> BeliefState {
        BeliefState::from_slices(id, &[0.0, 0.0], &[0.0, 0.0], DMatrix::identity(2, 2), confidence, 0.0)
            .unwrap()
    }

    fn penalties(entries: &[(&str, f64)]) -> BTreeMap<BeliefId, f64> {
        entries.iter().map(|(id, p)| (BeliefId::from(*id), *p)).collect()
    }

    fn arbiter() -> TrustArbiter {
        TrustArbiter::new(ArbiterConfig::default()).unwrap()
    }

    #[test]
    fn trust_is_monotone_and_bounded() {
        let c = 0.8;
        let mut previous = f64::INFINITY;
        for i in 0..50 {
            let p = i as f64 * 0.25;
            let t = trust_score(c, p, 1.0);
            assert!(t <= previous);
            assert!((0.0..=c).contains(&t));
            previous = t;
        }
        assert_eq!(trust_score(c, f64::INFINITY, 1.0), 0.0);
        assert_eq!(trust_score(c, f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn single_clean_belief_is_selected() {
        let beliefs = [belief("gps", 0.95)];
        let decision = arbiter().arbitrate(&beliefs, &penalties(&[("gps", 0.0)])).unwrap();

        match decision {
            Decision::Selected {
                belief_id,
                confidence,
            } => {
                assert_eq!(belief_id.as_str(), "gps");
                assert_abs_diff_eq!(confidence, 0.95, epsilon = 1e-9);
            }
            other => panic!("expected selection, got {other:?}"),
        }
    }

    #[test]
    fn heavy_penalty_collapses_confidence() {
        let beliefs = [belief("gps", 0.1)];
        let outcome = arbiter().evaluate(&beliefs, &penalties(&[("gps", 10.0)])).unwrap();

        assert_abs_diff_eq!(outcome.trust[&BeliefId::from("gps")], 4.54e-6, epsilon = 1e-7);
        assert_eq!(
            outcome.decision,
            Decision::NavUnsafe {
                reason: RefusalReason::ConfidenceCollapse
            }
        );
        assert_eq!(
            outcome.decision.refusal_reason().map(|r| r.to_string()),
            Some("confidence collapse".to_string())
        );
    }

    #[test]
    fn empty_set_refuses() {
        let decision = arbiter().arbitrate(&[], &BTreeMap::new()).unwrap();
        assert_eq!(decision.refusal_reason(), Some(RefusalReason::NoBeliefs));
        assert_eq!(RefusalReason::NoBeliefs.as_str(), "no beliefs available");
    }

    #[test]
    fn missing_penalty_is_an_error() {
        let beliefs = [belief("gps", 0.9), belief("ins", 0.9)];
        let err = arbiter()
            .arbitrate(&beliefs, &penalties(&[("gps", 0.0)]))
            .unwrap_err();
        assert_eq!(err, ArbitrationError::MissingPenalty(BeliefId::from("ins")));
    }

    #[test]
    fn shared_id_is_an_error() {
        let beliefs = [belief("gps", 0.9), belief("gps", 0.4)];
        let p = penalties(&[("gps", 0.0)]);
        assert_eq!(
            arbiter().evaluate(&beliefs, &p).unwrap_err(),
            ArbitrationError::DuplicateBelief(BeliefId::from("gps"))
        );
        assert!(arbiter().arbitrate(&beliefs, &p).is_err());
    }

    #[test]
    fn ties_go_to_smallest_id() {
        let beliefs = [belief("zeta", 0.9), belief("alpha", 0.9), belief("mid", 0.9)];
        let p = penalties(&[("zeta", 0.0), ("alpha", 0.0), ("mid", 0.0)]);
        let decision = arbiter().arbitrate(&beliefs, &p).unwrap();
        assert_eq!(decision.selected().map(BeliefId::as_str), Some("alpha"));
    }

    #[test]
    fn penalty_outweighs_confidence() {
        let beliefs = [belief("gps", 0.99), belief("ins", 0.7)];
        let p = penalties(&[("gps", 2.0), ("ins", 0.0)]);
        let decision = arbiter().arbitrate(&beliefs, &p).unwrap();
        assert_eq!(decision.selected().map(BeliefId::as_str), Some("ins"));
    }

    #[test]
    fn arbitration_is_idempotent() {
        let beliefs = [belief("gps", 0.6), belief("ins", 0.5)];
        let p = penalties(&[("gps", 0.3), ("ins", 0.1)]);
        let a = arbiter();
        assert_eq!(a.evaluate(&beliefs, &p).unwrap(), a.evaluate(&beliefs, &p).unwrap());
    }

    #[test]
    fn zero_confidence_never_selected() {
        let a = TrustArbiter::new(ArbiterConfig {
            trust_min: 0.0,
            ..Default::default()
        })
        .unwrap();
        let decision = a.arbitrate(&[belief("gps", 0.0)], &penalties(&[("gps", 0.0)])).unwrap();
        assert!(decision.is_unsafe());
    }

    #[test]
    fn rejects_invalid_config() {
        let err = TrustArbiter::new(ArbiterConfig {
            lambda: -1.0,
            ..Default::default()
        });
        assert!(err.is_err());
    }
}
