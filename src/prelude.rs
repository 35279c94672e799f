use nalgebra;
use nalgebra::{U12, U3};

pub use itertools::{izip, Itertools};
pub use std::ops::AddAssign;

//------------------------------------------------------------------------------
// Types
//------------------------------------------------------------------------------

/// Matrix (3 x 3)
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Matrix (3 x Element DOFs)
pub type Matrix3x12 = nalgebra::OMatrix<f64, U3, U12>;

/// Matrix (Element DOFs x Element DOFs)
pub type Matrix12 = nalgebra::OMatrix<f64, U12, U12>;

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Vector6 = nalgebra::Vector6<f64>;

/// Column vector (Element DOFs)
pub type Vector12 = nalgebra::OVector<f64, U12>;

/// Column vector (dynamic length)
pub type VectorD = nalgebra::DVector<f64>;

pub type UnitQuaternion = nalgebra::UnitQuaternion<f64>;

pub type Rotation3 = nalgebra::Rotation3<f64>;

/// Number of element end nodes
pub const NEN: usize = 2;

/// Degrees of freedom per node
pub const NDF: usize = 6;

/// Degrees of freedom per element
pub const NDE: usize = NEN * NDF;

//------------------------------------------------------------------------------
// Traits
//------------------------------------------------------------------------------

pub trait RotVecExt {
    fn tangent_matrix(&self) -> Matrix3;
    fn tangent_matrix_inv(&self) -> Matrix3;
    fn tangent_matrix_inv_variation(&self, m: &Vector3) -> Matrix3;
    fn tilde(&self) -> Matrix3;
}

impl RotVecExt for Vector3 {
    fn tilde(&self) -> Matrix3 {
        Matrix3::new(
            0.0, -self[2], self[1], self[2], 0.0, -self[0], -self[1], self[0], 0.0,
        )
    }
    /// Left Jacobian of the exponential map
    fn tangent_matrix(&self) -> Matrix3 {
        let phi = self.magnitude();
        if phi == 0. {
            Matrix3::identity()
        } else {
            Matrix3::identity()
                + (1. - phi.cos()) / phi.powi(2) * self.tilde()
                + (1. - phi.sin() / phi) / phi.powi(2) * (self.tilde() * self.tilde())
        }
    }
    /// Inverse of the left Jacobian, singular at phi = 2 pi
    fn tangent_matrix_inv(&self) -> Matrix3 {
        let phi = self.magnitude();
        if phi == 0. {
            return Matrix3::identity();
        }
        // Series below 1e-4 avoids cancellation in 1/phi^2 - cot(phi/2)/(2 phi)
        let c = if phi < 1e-4 {
            1. / 12. + phi.powi(2) / 720.
        } else {
            1. / phi.powi(2) - (1. + phi.cos()) / (2. * phi * phi.sin())
        };
        Matrix3::identity() - 0.5 * self.tilde() + c * (self.tilde() * self.tilde())
    }
    /// Derivative of `J⁻ᵀ(v) m` with respect to `v`, for fixed `m`
    fn tangent_matrix_inv_variation(&self, m: &Vector3) -> Matrix3 {
        let phi = self.magnitude();
        // c of tangent_matrix_inv and c'(phi) / phi
        let (c, dc) = if phi < 1e-2 {
            (
                1. / 12. + phi.powi(2) / 720.,
                1. / 360. + phi.powi(2) / 7560.,
            )
        } else {
            let cot = (1. + phi.cos()) / phi.sin();
            (
                1. / phi.powi(2) - cot / (2. * phi),
                -2. / phi.powi(4)
                    + 1. / (4. * phi.powi(2) * (0.5 * phi).sin().powi(2))
                    + cot / (2. * phi.powi(3)),
            )
        };
        let vm = self.dot(m);
        let w: Vector3 = self * vm - m * phi.powi(2);
        -0.5 * m.tilde()
            + c * (Matrix3::identity() * vm + self * m.transpose() - 2. * m * self.transpose())
            + dc * w * self.transpose()
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_tilde_is_cross_product() {
        let a = Vector3::new(1., -2., 3.);
        let b = Vector3::new(0.5, 4., -1.);
        assert_relative_eq!(a.tilde() * b, a.cross(&b));
        assert_relative_eq!(a.tilde().transpose(), -a.tilde());
    }

    #[test]
    fn test_tangent_matrix_inverse() {
        for v in [
            Vector3::new(0.1, -0.2, 0.3),
            Vector3::new(1.2, 0.4, -0.9),
            Vector3::new(1e-6, 0., 2e-6),
        ] {
            assert_relative_eq!(
                v.tangent_matrix() * v.tangent_matrix_inv(),
                Matrix3::identity(),
                epsilon = 1e-12
            );
        }
        assert_relative_eq!(Vector3::zeros().tangent_matrix_inv(), Matrix3::identity());
    }

    #[test]
    fn test_tangent_matrix_is_left_jacobian() {
        // exp(v + dv) = exp(J(v) dv) exp(v) to first order
        let v = Vector3::new(0.4, -0.7, 0.2);
        let dv = Vector3::new(1e-7, 2e-7, -1e-7);
        let lhs = UnitQuaternion::from_scaled_axis(v + dv);
        let rhs = UnitQuaternion::from_scaled_axis(v.tangent_matrix() * dv)
            * UnitQuaternion::from_scaled_axis(v);
        assert_relative_eq!(lhs, rhs, epsilon = 1e-13);
    }

    #[test]
    fn test_tangent_matrix_inv_variation() {
        let m = Vector3::new(1.5, -0.5, 2.);
        let h = 1e-6;
        for v in [
            Vector3::new(0.4, -0.7, 0.2),
            Vector3::new(-1.9, 1.2, 0.6),
            Vector3::new(2e-3, -1e-3, 4e-3),
            Vector3::zeros(),
        ] {
            let H = v.tangent_matrix_inv_variation(&m);
            for k in 0..3 {
                let mut dv = Vector3::zeros();
                dv[k] = h;
                let gp: Vector3 = (v + dv).tangent_matrix_inv().transpose() * m;
                let gm: Vector3 = (v - dv).tangent_matrix_inv().transpose() * m;
                assert_relative_eq!(
                    H.column(k).into_owned(),
                    (gp - gm) / (2. * h),
                    epsilon = 1e-8
                );
            }
        }
    }
}
