// smbna_core/src/state.rs

use nalgebra::{DMatrix, DVector};

use crate::error::EstimationError;

pub mod layout;

/// An enum that defines every variable that can exist in a filter state vector.
/// All kinematic variables are expressed in the local-level navigation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateVariable {
    // --- Cartesian Position ---
    Px,
    Py,
    Pz,
    // --- Cartesian Velocity ---
    Vx,
    Vy,
    Vz,
    // --- Planar heading (radians). Carried, not observed. ---
    Heading,
}

impl StateVariable {
    /// The velocity variable that drives this position variable, if any.
    pub fn rate_of(self) -> Option<StateVariable> {
        match self {
            StateVariable::Px => Some(StateVariable::Vx),
            StateVariable::Py => Some(StateVariable::Vy),
            StateVariable::Pz => Some(StateVariable::Vz),
            _ => None,
        }
    }

    fn is_position(self) -> bool {
        matches!(
            self,
            StateVariable::Px | StateVariable::Py | StateVariable::Pz
        )
    }

    fn is_velocity(self) -> bool {
        matches!(
            self,
            StateVariable::Vx | StateVariable::Vy | StateVariable::Vz
        )
    }
}

/// The "smart" state object used by filters. It bundles the state vector
/// with its schema (the layout), covariance, and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// The ordered "schema" of the state vector.
    pub layout: Vec<StateVariable>,
    /// The actual numerical data vector `x`.
    pub vector: DVector<f64>,
    /// The covariance matrix `P`.
    pub covariance: DMatrix<f64>,
    /// The timestamp of the last predict or update.
    pub last_update_timestamp: f64,
}

impl FilterState {
    /// Creates a state with a given layout, a zero vector and the covariance
    /// set to a scaled identity matrix.
    pub fn new(layout: Vec<StateVariable>, initial_covariance_val: f64, timestamp: f64) -> Self {
        let dim = layout.len();
        Self {
            layout,
            vector: DVector::zeros(dim),
            covariance: DMatrix::identity(dim, dim) * initial_covariance_val,
            last_update_timestamp: timestamp,
        }
    }

    /// Creates a state from explicit parts, checking that the dimensions agree.
    pub fn from_parts(
        layout: Vec<StateVariable>,
        vector: DVector<f64>,
        covariance: DMatrix<f64>,
        timestamp: f64,
    ) -> Result<Self, EstimationError> {
        let dim = layout.len();
        if vector.len() != dim {
            return Err(EstimationError::DimensionMismatch {
                context: "filter state vector",
                expected: dim,
                actual: vector.len(),
            });
        }
        if covariance.nrows() != dim || covariance.ncols() != dim {
            return Err(EstimationError::DimensionMismatch {
                context: "filter state covariance",
                expected: dim,
                actual: covariance.nrows().max(covariance.ncols()),
            });
        }
        Ok(Self {
            layout,
            vector,
            covariance,
            last_update_timestamp: timestamp,
        })
    }

    /// Returns the dimension (number of rows) of the state vector.
    pub fn dim(&self) -> usize {
        self.layout.len()
    }

    /// Finds the index of a specific `StateVariable` in the layout.
    pub fn find_idx(&self, var: StateVariable) -> Option<usize> {
        self.layout.iter().position(|v| *v == var)
    }

    /// Indices of the position variables, in layout order.
    pub fn position_indices(&self) -> Vec<usize> {
        self.indices_where(StateVariable::is_position)
    }

    /// Indices of the velocity variables, in layout order.
    pub fn velocity_indices(&self) -> Vec<usize> {
        self.indices_where(StateVariable::is_velocity)
    }

    /// `(position_idx, velocity_idx)` for every axis that carries both.
    pub fn kinematic_pairs(&self) -> Vec<(usize, usize)> {
        self.layout
            .iter()
            .enumerate()
            .filter_map(|(p_idx, var)| {
                let rate = var.rate_of()?;
                let v_idx = self.find_idx(rate)?;
                Some((p_idx, v_idx))
            })
            .collect()
    }

    pub fn position(&self) -> DVector<f64> {
        self.gather(&self.position_indices())
    }

    pub fn velocity(&self) -> DVector<f64> {
        self.gather(&self.velocity_indices())
    }

    /// The position block of `P`.
    pub fn position_covariance(&self) -> DMatrix<f64> {
        let idx = self.position_indices();
        DMatrix::from_fn(idx.len(), idx.len(), |r, c| {
            self.covariance[(idx[r], idx[c])]
        })
    }

    pub fn is_finite(&self) -> bool {
        self.vector.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }

    fn indices_where(&self, pred: impl Fn(StateVariable) -> bool) -> Vec<usize> {
        self.layout
            .iter()
            .enumerate()
            .filter(|(_, var)| pred(**var))
            .map(|(i, _)| i)
            .collect()
    }

    fn gather(&self, idx: &[usize]) -> DVector<f64> {
        DVector::from_iterator(idx.len(), idx.iter().map(|&i| self.vector[i]))
    }
}
