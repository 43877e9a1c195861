// smbna_core/src/estimation/filters/kf.rs

use crate::error::EstimationError;
use crate::estimation::kalman::{kf_predict, kf_update, KfPredictParams, KfUpdateParams};
use crate::estimation::{Innovation, StateEstimator};
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::models::estimation::measurement::Measurement;
use crate::state::FilterState;
use crate::types::Control;
use crate::utils::is_symmetric_psd;
use nalgebra::{DMatrix, DVector};

/// A linear Kalman filter over a layout-aware `FilterState`.
///
/// `Q` and `R` are fixed at construction. A filter without a measurement
/// model only predicts (dead reckoning).
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    /// The current state of the filter (x, P, t).
    state: FilterState,
    /// The process noise covariance matrix (Q), modeling uncertainty in the dynamics.
    process_noise_q: DMatrix<f64>,

    dynamics: Box<dyn EstimationDynamics>,

    measurement_model: Option<Box<dyn Measurement>>,
}

impl KalmanFilter {
    /// Creates a new filter, validating every matrix it will use.
    pub fn new(
        initial_state: FilterState,
        process_noise_q: DMatrix<f64>,
        dynamics: Box<dyn EstimationDynamics>,
        measurement_model: Option<Box<dyn Measurement>>,
    ) -> Result<Self, EstimationError> {
        let n = initial_state.dim();
        if process_noise_q.nrows() != n || process_noise_q.ncols() != n {
            return Err(EstimationError::DimensionMismatch {
                context: "process noise Q",
                expected: n,
                actual: process_noise_q.nrows(),
            });
        }
        if !is_symmetric_psd(&process_noise_q) {
            return Err(EstimationError::NotPositiveSemidefinite("process noise Q"));
        }
        if !initial_state.vector.iter().all(|v| v.is_finite()) {
            return Err(EstimationError::NonFiniteState("initialization"));
        }
        if !is_symmetric_psd(&initial_state.covariance) {
            return Err(EstimationError::NotPositiveSemidefinite("initial covariance P"));
        }
        if initial_state.position_indices().is_empty() {
            return Err(EstimationError::MissingStateVariable("kalman filter"));
        }
        if let Some(model) = &measurement_model {
            // Fails early if the layout cannot support this sensor.
            model.calculate_jacobian(&initial_state)?;
        }

        Ok(Self {
            state: initial_state,
            process_noise_q,
            dynamics,
            measurement_model,
        })
    }

    pub fn measurement_model(&self) -> Option<&dyn Measurement> {
        self.measurement_model.as_deref()
    }

    pub fn control_dim(&self) -> usize {
        self.dynamics.get_control_dim()
    }
}

// --- The Public Trait Implementation ---
impl StateEstimator for KalmanFilter {
    fn predict(&mut self, control: &Control, dt: f64) -> Result<(), EstimationError> {
        let params = KfPredictParams {
            dynamics: self.dynamics.as_ref(),
            process_noise_q: &self.process_noise_q,
        };
        self.state = kf_predict(&self.state, control, &params, dt)?;
        Ok(())
    }

    fn update(&mut self, z: &DVector<f64>) -> Result<Innovation, EstimationError> {
        let model = self
            .measurement_model
            .as_deref()
            .ok_or(EstimationError::NoMeasurementModel)?;
        let (corrected, innovation) = kf_update(&self.state, &KfUpdateParams { model, z })?;
        self.state = corrected;
        Ok(innovation)
    }

    fn get_state(&self) -> &FilterState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::estimation::dynamics::constant_velocity::ConstantVelocityModel;
    use crate::models::estimation::measurement::position::PositionMeasurementModel;
    use crate::state::layout::planar_layout;
    use approx::assert_abs_diff_eq;

    fn gps_filter() -> KalmanFilter {
        let state = FilterState::new(planar_layout(), 1.0, 0.0);
        let dynamics = ConstantVelocityModel::for_state(&state);
        KalmanFilter::new(
            state,
            DMatrix::identity(5, 5) * 0.01,
            Box::new(dynamics),
            Some(Box::new(PositionMeasurementModel::isotropic(2, 2.0).unwrap())),
        )
        .unwrap()
    }

    #[test]
    fn tracks_a_stationary_target() {
        let mut kf = gps_filter();
        let z = DVector::from_row_slice(&[10.0, -5.0]);
        for _ in 0..200 {
            kf.predict(&DVector::zeros(2), 0.1).unwrap();
            kf.update(&z).unwrap();
        }
        let pos = kf.get_state().position();
        assert_abs_diff_eq!(pos[0], 10.0, epsilon = 1e-3);
        assert_abs_diff_eq!(pos[1], -5.0, epsilon = 1e-3);
        assert!(is_symmetric_psd(&kf.get_state().covariance));
    }

    #[test]
    fn filter_without_model_refuses_updates() {
        let state = FilterState::new(planar_layout(), 1.0, 0.0);
        let dynamics = ConstantVelocityModel::for_state(&state);
        let mut kf =
            KalmanFilter::new(state, DMatrix::zeros(5, 5), Box::new(dynamics), None).unwrap();

        assert_eq!(
            kf.update(&DVector::zeros(2)),
            Err(EstimationError::NoMeasurementModel)
        );
    }

    #[test]
    fn rejects_indefinite_process_noise() {
        let state = FilterState::new(planar_layout(), 1.0, 0.0);
        let dynamics = ConstantVelocityModel::for_state(&state);
        let mut q = DMatrix::identity(5, 5);
        q[(2, 2)] = -0.5;

        let err = KalmanFilter::new(state, q, Box::new(dynamics), None).unwrap_err();
        assert_eq!(err, EstimationError::NotPositiveSemidefinite("process noise Q"));
    }

    #[test]
    fn rejects_wrongly_sized_process_noise() {
        let state = FilterState::new(planar_layout(), 1.0, 0.0);
        let dynamics = ConstantVelocityModel::for_state(&state);
        let err = KalmanFilter::new(state, DMatrix::zeros(4, 4), Box::new(dynamics), None)
            .unwrap_err();
        assert!(matches!(err, EstimationError::DimensionMismatch { .. }));
    }

    #[test]
    fn failed_predict_leaves_state_untouched() {
        let mut kf = gps_filter();
        let before = kf.get_state().clone();
        assert!(kf.predict(&DVector::zeros(2), -1.0).is_err());
        assert_eq!(kf.get_state(), &before);
    }
}
