// smbna_core/src/models/estimation/dynamics/mod.rs

use crate::state::FilterState;
use dyn_clone::DynClone;
use nalgebra::DMatrix;
use std::fmt::Debug;

/// A trait for linear (or linearized) motion models used within state estimators.
///
/// The model supplies the discrete-time transition `F(dt)` and control-input
/// `B(dt)` matrices for the predict step `x <- F x + B u`. Implementations are
/// `Send + Sync` so one engine per sensor modality can run on its own thread.
pub trait EstimationDynamics: DynClone + Debug + Send + Sync {
    /// Returns the number of dimensions in the control input vector `u`.
    fn get_control_dim(&self) -> usize;

    /// Discrete state-transition matrix `F` for a step of `dt` seconds.
    ///
    /// # Arguments
    /// * `state`: The filter state, used for its layout.
    /// * `dt`: Time step duration. The caller guarantees `dt > 0`.
    fn transition_matrix(&self, state: &FilterState, dt: f64) -> DMatrix<f64>;

    /// Control-input matrix `B` (N x M) mapping `u` into state increments.
    fn control_matrix(&self, state: &FilterState, dt: f64) -> DMatrix<f64>;
}

// This macro automatically generates the implementation of `Clone` for `Box<dyn EstimationDynamics>`.
dyn_clone::clone_trait_object!(EstimationDynamics);

pub mod constant_velocity;
