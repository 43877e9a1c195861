// smbna_core/src/estimation/mod.rs

use crate::error::EstimationError;
use crate::state::FilterState;
use crate::types::Control;
use nalgebra::{DMatrix, DVector};

/// Residual information produced by one measurement update.
#[derive(Debug, Clone, PartialEq)]
pub struct Innovation {
    /// `y = z - H x`
    pub residual: DVector<f64>,
    /// `S = H P H^T + R`
    pub covariance: DMatrix<f64>,
    /// Euclidean norm `||y||`, the quantity the refusal gate thresholds.
    pub norm: f64,
    /// Normalized innovation squared, `y^T S^-1 y`.
    pub nis: f64,
}

impl Innovation {
    pub fn dim(&self) -> usize {
        self.residual.len()
    }
}

/// The contract for any algorithm that performs the "State Estimator" role.
/// Its sole responsibility is to estimate the state of one sensor modality.
pub trait StateEstimator: Send + Sync {
    /// Advances the state by `dt` seconds under control input `u`.
    fn predict(&mut self, control: &Control, dt: f64) -> Result<(), EstimationError>;

    /// Fuses the measurement vector `z` with the current prediction.
    fn update(&mut self, z: &DVector<f64>) -> Result<Innovation, EstimationError>;

    /// Returns a reference to the current best estimate of the state.
    fn get_state(&self) -> &FilterState;
}

pub mod filters;
pub mod kalman;
