// smbna_sim/src/simulation/spoofing.rs

//! Adversarial GPS injection models.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::simulation::prng::SimulationRng;

/// How, and when, the simulated GPS lies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpoofingConfig {
    /// Honest receiver.
    None,
    /// Each fix is independently spoofed with `probability`; a spoofed fix is
    /// displaced by a Gaussian offset of `magnitude` meters per axis.
    Bias { probability: f64, magnitude: f64 },
    /// From `start_time` on, every fix is dragged along `direction` (radians)
    /// at `rate` meters per second. Slow enough to fool a lone filter.
    Drift {
        start_time: f64,
        rate: f64,
        #[serde(default)]
        direction: f64,
    },
}

impl Default for SpoofingConfig {
    fn default() -> Self {
        SpoofingConfig::Bias {
            probability: 0.05,
            magnitude: 15.0,
        }
    }
}

impl SpoofingConfig {
    /// Offset added to the honest fix at time `t`, or `None` if the fix is clean.
    pub fn offset(&self, t: f64, rng: &mut SimulationRng) -> Option<Vector2<f64>> {
        match *self {
            SpoofingConfig::None => None,
            SpoofingConfig::Bias {
                probability,
                magnitude,
            } => rng.chance(probability).then(|| rng.gaussian2(magnitude)),
            SpoofingConfig::Drift {
                start_time,
                rate,
                direction,
            } => (t >= start_time)
                .then(|| Vector2::new(direction.cos(), direction.sin()) * rate * (t - start_time)),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match *self {
            SpoofingConfig::None => {}
            SpoofingConfig::Bias {
                probability,
                magnitude,
            } => {
                anyhow::ensure!(
                    (0.0..=1.0).contains(&probability),
                    "spoofing.probability must lie in [0, 1], got {probability}"
                );
                anyhow::ensure!(
                    magnitude.is_finite() && magnitude >= 0.0,
                    "spoofing.magnitude must be >= 0, got {magnitude}"
                );
            }
            SpoofingConfig::Drift {
                start_time, rate, ..
            } => {
                anyhow::ensure!(start_time.is_finite(), "spoofing.start_time must be finite");
                anyhow::ensure!(rate.is_finite(), "spoofing.rate must be finite");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn honest_receiver_never_spoofs() {
        let mut rng = SimulationRng::from_seed(0);
        assert!((0..100).all(|i| SpoofingConfig::None.offset(i as f64, &mut rng).is_none()));
    }

    #[test]
    fn certain_bias_always_spoofs() {
        let mut rng = SimulationRng::from_seed(0);
        let spoof = SpoofingConfig::Bias {
            probability: 1.0,
            magnitude: 15.0,
        };
        assert!((0..20).all(|i| spoof.offset(i as f64, &mut rng).is_some()));
    }

    #[test]
    fn drift_grows_linearly_after_start() {
        let mut rng = SimulationRng::from_seed(0);
        let spoof = SpoofingConfig::Drift {
            start_time: 10.0,
            rate: 2.0,
            direction: 0.0,
        };
        assert!(spoof.offset(9.9, &mut rng).is_none());
        let offset = spoof.offset(15.0, &mut rng).unwrap();
        assert_relative_eq!(offset, Vector2::new(10.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn rejects_bad_probability() {
        let spoof = SpoofingConfig::Bias {
            probability: 1.5,
            magnitude: 1.0,
        };
        assert!(spoof.validate().is_err());
    }
}
