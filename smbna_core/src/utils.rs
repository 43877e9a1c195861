// smbna_core/src/utils.rs

use nalgebra::{DMatrix, Vector3};

/// Absolute slack allowed when checking symmetry and eigenvalue signs.
const PSD_TOLERANCE: f64 = 1e-9;

/// Returns `true` if `m` is square, finite, symmetric and has no eigenvalue
/// below zero (within a tolerance scaled by the matrix magnitude).
pub fn is_symmetric_psd(m: &DMatrix<f64>) -> bool {
    if !m.is_square() || m.iter().any(|v| !v.is_finite()) {
        return false;
    }
    if m.is_empty() {
        return true;
    }

    let scale = m.amax().max(1.0);
    let tolerance = PSD_TOLERANCE * scale;

    let n = m.nrows();
    for r in 0..n {
        for c in (r + 1)..n {
            if (m[(r, c)] - m[(c, r)]).abs() > tolerance {
                return false;
            }
        }
    }

    let min_eigenvalue = m
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    min_eigenvalue >= -tolerance
}

/// Replaces `m` with `(m + m^T) / 2`, removing round-off asymmetry.
pub fn symmetrize(m: &mut DMatrix<f64>) {
    let sym = (&*m + m.transpose()) * 0.5;
    *m = sym;
}

/// Angle in radians between two vectors, or `None` if either has zero length.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> Option<f64> {
    let denom = a.norm() * b.norm();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return None;
    }
    // Clamp guards acos against round-off just outside [-1, 1].
    let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
    Some(cos.acos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_is_psd() {
        assert!(is_symmetric_psd(&DMatrix::identity(3, 3)));
    }

    #[test]
    fn zero_matrix_is_psd() {
        assert!(is_symmetric_psd(&DMatrix::zeros(2, 2)));
    }

    #[test]
    fn negative_eigenvalue_is_rejected() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -0.5]);
        assert!(!is_symmetric_psd(&m));
    }

    #[test]
    fn asymmetric_matrix_is_rejected() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.0, 1.0]);
        assert!(!is_symmetric_psd(&m));
    }

    #[test]
    fn symmetrize_averages_off_diagonals() {
        let mut m = DMatrix::from_row_slice(2, 2, &[1.0, 0.2, 0.4, 1.0]);
        symmetrize(&mut m);
        assert_abs_diff_eq!(m[(0, 1)], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(m[(1, 0)], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn angle_between_orthogonal_vectors() {
        let angle = angle_between(&Vector3::x(), &Vector3::y()).unwrap();
        assert_abs_diff_eq!(angle, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn angle_with_zero_vector_is_undefined() {
        assert!(angle_between(&Vector3::zeros(), &Vector3::x()).is_none());
    }
}
