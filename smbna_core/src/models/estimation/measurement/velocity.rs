use crate::error::EstimationError;
use crate::messages::MeasurementData;
use crate::models::estimation::measurement::{selection_matrix, validate_noise, Measurement};
use crate::state::FilterState;
use nalgebra::{DMatrix, DVector};

/// Velocity aiding (Doppler, optical flow). `H` selects the velocity block.
#[derive(Debug, Clone)]
pub struct VelocityMeasurementModel {
    noise_covariance: DMatrix<f64>,
}

impl VelocityMeasurementModel {
    pub fn new(noise_covariance: DMatrix<f64>) -> Result<Self, EstimationError> {
        validate_noise(&noise_covariance)?;
        Ok(Self { noise_covariance })
    }

    pub fn isotropic(dim: usize, sigma: f64) -> Result<Self, EstimationError> {
        Self::new(DMatrix::identity(dim, dim) * sigma.powi(2))
    }
}

impl Measurement for VelocityMeasurementModel {
    fn name(&self) -> &'static str {
        "velocity"
    }

    fn get_measurement_dim(&self) -> usize {
        self.noise_covariance.nrows()
    }

    fn get_r(&self) -> &DMatrix<f64> {
        &self.noise_covariance
    }

    fn extract(&self, data: &MeasurementData) -> Option<DVector<f64>> {
        match data {
            MeasurementData::Velocity(z) => Some(z.clone()),
            _ => None,
        }
    }

    fn calculate_jacobian(&self, filter_state: &FilterState) -> Result<DMatrix<f64>, EstimationError> {
        let indices = filter_state.velocity_indices();
        if indices.len() != self.get_measurement_dim() {
            return Err(EstimationError::MissingStateVariable("velocity measurement"));
        }
        Ok(selection_matrix(&indices, filter_state.dim()))
    }
}
