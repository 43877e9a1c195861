// smbna_sim/src/simulation/prng.rs

use nalgebra::{Vector2, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// A newtype wrapper around `ChaCha8Rng`.
/// This is the central, deterministic pseudo-random number generator for the simulation.
/// Every random draw of a run goes through one instance, so a seed fixes the run.
#[derive(Debug, Clone)]
pub struct SimulationRng(pub ChaCha8Rng);

impl SimulationRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// One draw from `N(0, stddev^2)`.
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        let z: f64 = StandardNormal.sample(&mut self.0);
        z * stddev
    }

    pub fn gaussian2(&mut self, stddev: f64) -> Vector2<f64> {
        Vector2::new(self.gaussian(stddev), self.gaussian(stddev))
    }

    pub fn gaussian3(&mut self, stddev: f64) -> Vector3<f64> {
        Vector3::new(self.gaussian(stddev), self.gaussian(stddev), self.gaussian(stddev))
    }

    /// `true` with probability `p`. The caller validates `p` in `[0, 1]`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.0.gen_bool(p)
    }
}
