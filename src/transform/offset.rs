#![allow(non_snake_case)]

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// How user supplied joint offsets combine with the nodal geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetFlags {
    /// Offsets are components along the reference local axes instead of global axes
    #[serde(default)]
    pub local: bool,
    /// Offsets are fractions of the node to node length
    #[serde(default)]
    pub normalized: bool,
}

/// Offsets in global components for the reference configuration.
///
/// `R` and `length` describe the node to node chord, without offsets.
pub fn resolve_offsets(
    offsets: &[Vector3; NEN],
    flags: OffsetFlags,
    R: &Matrix3,
    length: f64,
) -> [Vector3; NEN] {
    (*offsets).map(|o| {
        let o = if flags.normalized { o * length } else { o };
        if flags.local {
            R * o
        } else {
            o
        }
    })
}

/// Map from nodal increments to end point increments, `δx_end = δu − õ δθ`.
pub fn offset_matrix(offsets: &[Vector3; NEN]) -> Matrix12 {
    let mut B = Matrix12::identity();
    for (n, o) in offsets.iter().enumerate() {
        B.fixed_view_mut::<3, 3>(n * NDF, n * NDF + 3)
            .copy_from(&(-o.tilde()));
    }
    B
}

/// Add the stiffness from offsets turning with their node under end forces `f`.
///
/// `f` is the force on the element end points, ordered like the global vector.
pub fn add_offset_stiffness(K: &mut Matrix12, f: &Vector12, offsets: &[Vector3; NEN]) {
    for (n, o) in offsets.iter().enumerate() {
        let fa: Vector3 = f.fixed_rows::<3>(n * NDF).into_owned();
        K.fixed_view_mut::<3, 3>(n * NDF + 3, n * NDF + 3)
            .add_assign(&(fa.tilde() * o.tilde()));
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_resolve_offsets() {
        let R = Matrix3::new(0., -1., 0., 1., 0., 0., 0., 0., 1.);
        let o = [Vector3::new(0.1, 0., 0.), Vector3::new(0., 0.2, 0.)];

        let g = resolve_offsets(&o, OffsetFlags::default(), &R, 10.);
        assert_eq!(g, o);

        let g = resolve_offsets(
            &o,
            OffsetFlags {
                local: true,
                normalized: true,
            },
            &R,
            10.,
        );
        assert_relative_eq!(g[0], Vector3::new(0., 1., 0.));
        assert_relative_eq!(g[1], Vector3::new(-2., 0., 0.));
    }

    #[test]
    fn test_offset_matrix() {
        let o = [Vector3::new(0., 0., 0.5), Vector3::new(0., 0., -0.5)];
        let B = offset_matrix(&o);

        // Rotation of node I about X swings a vertical offset along -Y
        let mut du = Vector12::zeros();
        du[3] = 0.1;
        let dx: Vector12 = B * du;
        assert_relative_eq!(
            dx.fixed_rows::<3>(0).into_owned(),
            Vector3::new(0.1, 0., 0.).cross(&o[0])
        );
        assert_relative_eq!(dx.fixed_rows::<3>(0).into_owned(), Vector3::new(0., -0.05, 0.));
        assert_relative_eq!(dx[3], 0.1);
    }
}
