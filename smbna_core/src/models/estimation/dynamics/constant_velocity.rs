use crate::models::estimation::dynamics::EstimationDynamics;
use crate::state::FilterState;
use nalgebra::DMatrix;

/// Constant-velocity kinematics driven by acceleration inputs.
///
/// For every axis carrying both a position and a velocity variable:
/// `position += velocity * dt` and `velocity += u_axis * dt`. Variables with
/// no kinematic partner (e.g. heading) are held constant.
///
/// The control vector has one entry per kinematic axis, in layout order, so a
/// planar state takes `[ax, ay]` and a spatial one `[ax, ay, az]`.
#[derive(Debug, Clone)]
pub struct ConstantVelocityModel {
    /// Number of kinematic axes (2 for planar, 3 for spatial).
    pub axes: usize,
}

impl ConstantVelocityModel {
    /// Builds a model matching the kinematic axes of `state`.
    pub fn for_state(state: &FilterState) -> Self {
        Self {
            axes: state.kinematic_pairs().len(),
        }
    }
}

impl EstimationDynamics for ConstantVelocityModel {
    fn get_control_dim(&self) -> usize {
        self.axes
    }

    fn transition_matrix(&self, state: &FilterState, dt: f64) -> DMatrix<f64> {
        let n = state.dim();
        let mut f = DMatrix::identity(n, n);
        for (p_idx, v_idx) in state.kinematic_pairs() {
            f[(p_idx, v_idx)] = dt;
        }
        f
    }

    fn control_matrix(&self, state: &FilterState, dt: f64) -> DMatrix<f64> {
        let mut b = DMatrix::zeros(state.dim(), self.axes);
        for (axis, (_, v_idx)) in state.kinematic_pairs().into_iter().take(self.axes).enumerate() {
            b[(v_idx, axis)] = dt;
        }
        b
    }
}
