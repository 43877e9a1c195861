// smbna_core/src/models/estimation/measurement/position.rs

use crate::error::EstimationError;
use crate::messages::MeasurementData;
use crate::models::estimation::measurement::{selection_matrix, validate_noise, Measurement};
use crate::state::FilterState;
use nalgebra::{DMatrix, DVector};

/// Absolute position fix (GPS). `H` selects the position block of the state.
#[derive(Debug, Clone)]
pub struct PositionMeasurementModel {
    // The R matrix for this sensor
    noise_covariance: DMatrix<f64>,
}

impl PositionMeasurementModel {
    pub fn new(noise_covariance: DMatrix<f64>) -> Result<Self, EstimationError> {
        validate_noise(&noise_covariance)?;
        Ok(Self { noise_covariance })
    }

    /// Isotropic noise: `R = sigma^2 I`.
    pub fn isotropic(dim: usize, sigma: f64) -> Result<Self, EstimationError> {
        Self::new(DMatrix::identity(dim, dim) * sigma.powi(2))
    }
}

impl Measurement for PositionMeasurementModel {
    fn name(&self) -> &'static str {
        "position"
    }

    fn get_measurement_dim(&self) -> usize {
        self.noise_covariance.nrows()
    }

    fn get_r(&self) -> &DMatrix<f64> {
        &self.noise_covariance
    }

    fn extract(&self, data: &MeasurementData) -> Option<DVector<f64>> {
        // This model only cares about GPS data.
        match data {
            MeasurementData::GpsPosition(z) => Some(z.clone()),
            _ => None,
        }
    }

    fn calculate_jacobian(&self, filter_state: &FilterState) -> Result<DMatrix<f64>, EstimationError> {
        let indices = filter_state.position_indices();
        if indices.len() != self.get_measurement_dim() {
            return Err(EstimationError::MissingStateVariable("position measurement"));
        }
        Ok(selection_matrix(&indices, filter_state.dim()))
    }
}
