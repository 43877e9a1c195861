// smbna_core/src/estimation/kalman.rs

use crate::error::EstimationError;
use crate::estimation::Innovation;
use crate::models::estimation::dynamics::EstimationDynamics;
use crate::models::estimation::measurement::Measurement;
use crate::state::FilterState;
use crate::types::Control;
use crate::utils::symmetrize;
use nalgebra::{DMatrix, DVector};

/// A container for parameters needed by the prediction step.
pub struct KfPredictParams<'a> {
    pub dynamics: &'a dyn EstimationDynamics,
    pub process_noise_q: &'a DMatrix<f64>,
}

/// A container for parameters needed by the measurement update step.
pub struct KfUpdateParams<'a> {
    pub model: &'a dyn Measurement,
    pub z: &'a DVector<f64>,
}

/// PURE FUNCTION: Performs one prediction step.
///
/// `x <- F x + B u`, `P <- F P F^T + Q`. Takes a state and returns the new,
/// predicted state. It has no side effects.
pub fn kf_predict(
    current_state: &FilterState,
    control: &Control,
    params: &KfPredictParams,
    dt: f64,
) -> Result<FilterState, EstimationError> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(EstimationError::NonPositiveDt(dt));
    }
    let n = current_state.dim();
    check_dim("control input", params.dynamics.get_control_dim(), control.len())?;
    check_dim("process noise Q", n, params.process_noise_q.nrows())?;
    check_dim("process noise Q", n, params.process_noise_q.ncols())?;

    // 1. Build the discrete model for this step.
    let f = params.dynamics.transition_matrix(current_state, dt);
    let b = params.dynamics.control_matrix(current_state, dt);

    // 2. Propagate the mean.
    let x_pred = &f * &current_state.vector + &b * control;

    // 3. Propagate the covariance: P_k+1 = F * P_k * F^T + Q
    let mut p_pred = &f * &current_state.covariance * f.transpose() + params.process_noise_q;
    symmetrize(&mut p_pred);

    let predicted = FilterState {
        layout: current_state.layout.clone(),
        vector: x_pred,
        covariance: p_pred,
        last_update_timestamp: current_state.last_update_timestamp + dt,
    };
    if !predicted.is_finite() {
        return Err(EstimationError::NonFiniteState("predict"));
    }
    Ok(predicted)
}

/// PURE FUNCTION: Performs one linear measurement update.
///
/// Returns the corrected state together with the innovation. A singular
/// innovation covariance is a configuration error, never a skipped update.
pub fn kf_update(
    predicted_state: &FilterState,
    params: &KfUpdateParams,
) -> Result<(FilterState, Innovation), EstimationError> {
    let h_jac = params.model.calculate_jacobian(predicted_state)?;
    let r_mat = params.model.get_r();
    check_dim("measurement vector", h_jac.nrows(), params.z.len())?;
    check_dim("measurement noise R", h_jac.nrows(), r_mat.nrows())?;

    let p_priori = &predicted_state.covariance;
    let x_priori = &predicted_state.vector;

    // 1. Innovation and its covariance.
    let y = params.z - &h_jac * x_priori;
    let s = &h_jac * p_priori * h_jac.transpose() + r_mat;

    // 2. Kalman gain.
    let s_inv = s
        .clone()
        .try_inverse()
        .filter(|inv| inv.iter().all(|v| v.is_finite()))
        .ok_or(EstimationError::SingularInnovationCovariance)?;
    let k_gain = p_priori * h_jac.transpose() * &s_inv;

    // 3. Correct the mean and covariance.
    let new_x = x_priori + &k_gain * &y;
    let n = predicted_state.dim();
    let i_kh = DMatrix::<f64>::identity(n, n) - &k_gain * &h_jac;
    let mut new_p = i_kh * p_priori;
    symmetrize(&mut new_p);

    let nis = y.dot(&(&s_inv * &y));
    let innovation = Innovation {
        norm: y.norm(),
        nis,
        residual: y,
        covariance: s,
    };

    let corrected = FilterState {
        layout: predicted_state.layout.clone(),
        vector: new_x,
        covariance: new_p,
        last_update_timestamp: predicted_state.last_update_timestamp,
    };
    if !corrected.is_finite() {
        return Err(EstimationError::NonFiniteState("update"));
    }
    Ok((corrected, innovation))
}

fn check_dim(context: &'static str, expected: usize, actual: usize) -> Result<(), EstimationError> {
    if expected != actual {
        return Err(EstimationError::DimensionMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}
