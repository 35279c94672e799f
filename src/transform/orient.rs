#![allow(non_snake_case)]

use crate::error::{Result, TransformError};
use crate::prelude::*;

/// Relative tolerance below which the reference vector counts as parallel to the chord.
const PARALLEL_TOL: f64 = 1e-12;

/// Reference orientation of an element from its chord and a vector in the local x-z plane.
///
/// Columns are the local axes: `e1` along the chord, `e2 = vz × e1` and
/// `e3 = e1 × e2`.
pub fn orientation_from_chord(chord: &Vector3, vz: &Vector3) -> Result<Matrix3> {
    let length = chord.norm();
    if length == 0. {
        return Err(TransformError::ZeroReferenceLength);
    }
    let e1: Vector3 = chord / length;
    let e2: Vector3 = vz.cross(&e1);
    let ynorm = e2.norm();
    if ynorm <= PARALLEL_TOL * vz.norm() || ynorm == 0. {
        return Err(TransformError::ParallelReferenceVector);
    }
    let e2 = e2 / ynorm;
    let e3 = e1.cross(&e2);
    Ok(Matrix3::from_columns(&[e1, e2, e3]))
}

/// Unit quaternion of an orthonormal frame.
pub fn quaternion_from_frame(R: &Matrix3) -> UnitQuaternion {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*R))
}

#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_orientation_along_x() {
        let R0 =
            orientation_from_chord(&Vector3::new(10., 0., 0.), &Vector3::new(0., 0., 1.)).unwrap();
        assert_relative_eq!(R0, Matrix3::identity());
        assert_relative_eq!(quaternion_from_frame(&R0), UnitQuaternion::identity());
    }

    #[test]
    fn test_orientation_vertical_column() {
        // Column along global Z with the local x-z plane holding global X
        let R0 =
            orientation_from_chord(&Vector3::new(0., 0., 3.), &Vector3::new(1., 0., 0.)).unwrap();
        assert_relative_eq!(R0.column(0).into_owned(), Vector3::new(0., 0., 1.));
        assert_relative_eq!(R0.column(1).into_owned(), Vector3::new(0., -1., 0.));
        assert_relative_eq!(R0.column(2).into_owned(), Vector3::new(1., 0., 0.));
        assert_relative_eq!(R0.determinant(), 1., epsilon = 1e-14);
    }

    #[test]
    fn test_orientation_skew_is_orthonormal() {
        let R0 =
            orientation_from_chord(&Vector3::new(3., -1., 2.), &Vector3::new(0.2, 0.1, 1.))
                .unwrap();
        assert_relative_eq!(R0.transpose() * R0, Matrix3::identity(), epsilon = 1e-14);
        let q = quaternion_from_frame(&R0);
        assert_relative_eq!(*q.to_rotation_matrix().matrix(), R0, epsilon = 1e-14);
    }

    #[test]
    fn test_orientation_failures() {
        assert!(matches!(
            orientation_from_chord(&Vector3::zeros(), &Vector3::z()),
            Err(TransformError::ZeroReferenceLength)
        ));
        assert!(matches!(
            orientation_from_chord(&Vector3::new(0., 0., 2.), &Vector3::new(0., 0., -5.)),
            Err(TransformError::ParallelReferenceVector)
        ));
    }
}
