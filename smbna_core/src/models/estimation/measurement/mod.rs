// smbna_core/src/models/estimation/measurement/mod.rs

use crate::error::EstimationError;
use crate::messages::MeasurementData;
use crate::state::FilterState;
use crate::utils::is_symmetric_psd;
use dyn_clone::DynClone;
use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

// --- MEASUREMENT MODEL TRAIT ---
// Represents the linear model of a sensor. `z = H x + v`, `v ~ N(0, R)`
pub trait Measurement: DynClone + Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Number of rows in the measurement vector `z`.
    fn get_measurement_dim(&self) -> usize;

    /// Returns the measurement noise covariance matrix `R`.
    fn get_r(&self) -> &DMatrix<f64>;

    /// Pulls the measurement vector `z` out of a sensor message.
    ///
    /// If this model can process the data it returns `Some(z)`. If it cannot
    /// or should ignore it, it returns `None`.
    fn extract(&self, data: &MeasurementData) -> Option<DVector<f64>>;

    /// Calculates the measurement matrix `H` for the given state layout.
    fn calculate_jacobian(&self, filter_state: &FilterState) -> Result<DMatrix<f64>, EstimationError>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn Measurement>`.
dyn_clone::clone_trait_object!(Measurement);

/// Builds an `m x n` matrix with a single 1 per row, selecting `indices` from the state.
pub(crate) fn selection_matrix(indices: &[usize], state_dim: usize) -> DMatrix<f64> {
    let mut h = DMatrix::zeros(indices.len(), state_dim);
    for (row, &col) in indices.iter().enumerate() {
        h[(row, col)] = 1.0;
    }
    h
}

/// Checks that `r` is a square, symmetric PSD matrix of dimension 2 or 3.
pub(crate) fn validate_noise(r: &DMatrix<f64>) -> Result<(), EstimationError> {
    if !r.is_square() || !(2..=3).contains(&r.nrows()) {
        return Err(EstimationError::DimensionMismatch {
            context: "measurement noise R",
            expected: 3,
            actual: r.nrows(),
        });
    }
    if !is_symmetric_psd(r) {
        return Err(EstimationError::NotPositiveSemidefinite("measurement noise R"));
    }
    Ok(())
}

pub mod position;
pub mod velocity;
