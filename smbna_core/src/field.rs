// smbna_core/src/field.rs

//! Reference models of the Earth's magnetic field, used by the field-structure
//! invariant to judge a belief's position against its measured field.

use dyn_clone::DynClone;
use nalgebra::{DVector, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Predicts the field vector an ideal magnetometer would read at a position.
pub trait FieldModel: DynClone + Debug + Send + Sync {
    /// Expected field at `position` (2-D positions are taken at z = 0).
    fn expected_field(&self, position: &DVector<f64>) -> Vector3<f64>;
}

dyn_clone::clone_trait_object!(FieldModel);

/// Lifts a 2-D or 3-D position into 3-D, padding missing axes with zero.
pub fn to_vector3(position: &DVector<f64>) -> Vector3<f64> {
    Vector3::from_fn(|i, _| position.get(i).copied().unwrap_or(0.0))
}

/// The same field everywhere. Adequate over the few kilometers a small
/// drone covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformFieldModel {
    pub field: Vector3<f64>,
}

impl UniformFieldModel {
    pub fn new(field: Vector3<f64>) -> Self {
        Self { field }
    }
}

impl Default for UniformFieldModel {
    /// Roughly mid-latitude: north and strongly downward, in microtesla.
    fn default() -> Self {
        Self::new(Vector3::new(20.0, 0.0, 45.0))
    }
}

impl FieldModel for UniformFieldModel {
    fn expected_field(&self, _position: &DVector<f64>) -> Vector3<f64> {
        self.field
    }
}

/// Centered dipole: `B(r) = k (3 (m . r_hat) r_hat - m) / |r|^3`.
///
/// `origin` places the dipole center in the navigation frame, so positions
/// near the origin of a local frame still see a well-defined field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DipoleFieldModel {
    /// Unit direction of the dipole moment.
    pub moment: Vector3<f64>,
    /// Scale factor `k`.
    pub strength: f64,
    /// Dipole center expressed in the navigation frame.
    pub origin: Vector3<f64>,
}

impl DipoleFieldModel {
    pub fn new(moment: Vector3<f64>, strength: f64, origin: Vector3<f64>) -> Self {
        let moment = moment.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::z);
        Self {
            moment,
            strength,
            origin,
        }
    }
}

impl FieldModel for DipoleFieldModel {
    fn expected_field(&self, position: &DVector<f64>) -> Vector3<f64> {
        let r = to_vector3(position) - self.origin;
        let dist = r.norm();
        if dist <= f64::EPSILON {
            // Singular at the center; report no field, which the invariant skips.
            return Vector3::zeros();
        }
        let r_hat = r / dist;
        (r_hat * (3.0 * self.moment.dot(&r_hat)) - self.moment) * (self.strength / dist.powi(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_field_ignores_position() {
        let model = UniformFieldModel::default();
        let a = model.expected_field(&DVector::from_row_slice(&[0.0, 0.0]));
        let b = model.expected_field(&DVector::from_row_slice(&[1e4, -3e3, 50.0]));
        assert_eq!(a, b);
    }

    #[test]
    fn dipole_on_axis_is_twice_the_equatorial_magnitude() {
        let model = DipoleFieldModel::new(Vector3::z(), 1.0, Vector3::zeros());
        let axial = model.expected_field(&DVector::from_row_slice(&[0.0, 0.0, 2.0]));
        let equatorial = model.expected_field(&DVector::from_row_slice(&[2.0, 0.0, 0.0]));

        assert_relative_eq!(axial, Vector3::new(0.0, 0.0, 0.25), epsilon = 1e-12);
        assert_relative_eq!(equatorial, Vector3::new(0.0, 0.0, -0.125), epsilon = 1e-12);
    }

    #[test]
    fn dipole_center_yields_zero_field() {
        let model = DipoleFieldModel::new(Vector3::z(), 1.0, Vector3::new(1.0, 1.0, 0.0));
        let b = model.expected_field(&DVector::from_row_slice(&[1.0, 1.0]));
        assert_eq!(b, Vector3::zeros());
    }

    #[test]
    fn planar_positions_are_padded() {
        let v = to_vector3(&DVector::from_row_slice(&[1.0, 2.0]));
        assert_eq!(v, Vector3::new(1.0, 2.0, 0.0));
    }
}
