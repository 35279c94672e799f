#![allow(non_snake_case)]

use crate::error::{Result, TransformError};
use crate::prelude::*;

//------------------------------------------------------------------------------
// Isometry
//------------------------------------------------------------------------------

/// Builds the corotational triad of an element and linearizes the local
/// deformation it induces.
///
/// Global increments are ordered `[δx_I, δθ_I, δx_J, δθ_J]`, with `δx` the
/// translation of the element end points and `δθ` spatial rotation increments,
/// i.e. `δR = θ̃ R`.
pub trait Isometry {
    fn initialize(&mut self, R0: &Matrix3, dX: &Vector3) -> Result<()>;

    /// Recompute the triad for nodal rotations `R` and deformed chord `dx`.
    fn update(&mut self, R: &[Matrix3; NEN], dx: &Vector3) -> Result<()>;

    /// Current corotational basis, columns are the local axes.
    fn rotation(&self) -> Matrix3;

    /// Linear map from global increments to local deformation increments at
    /// local deformation `ul`.
    fn compute_tangent(&self, ul: &Vector12) -> Matrix12;

    /// Add the variation of `Tᵗ p` caused by the motion of the triad, for
    /// local forces `p` held fixed.
    fn add_tangent(&self, K: &mut Matrix12, p: &Vector12, ul: &Vector12);
}

//------------------------------------------------------------------------------
// Mean director triad
//------------------------------------------------------------------------------

/// Triad with `e1` along the chord and `e2` in the plane of `e1` and the mean
/// of the nodal directors `q_n = R_n (0, 1, 0)`.
#[derive(Debug, Clone, Default)]
pub struct MidpointIsometry {
    /// Corotational basis
    e: Matrix3,
    /// Deformed chord length
    Ln: f64,
    /// Nodal directors
    q: [Vector3; NEN],
    /// Mean director components along e1 and e2
    alpha: f64,
    beta: f64,
    /// Triad spin per global increment
    G: Matrix3x12,
}

impl MidpointIsometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deformed_length(&self) -> f64 {
        self.Ln
    }

    /// Spin of the triad produced by a global increment, `ω = G δu`.
    pub fn spin_matrix(&self) -> &Matrix3x12 {
        &self.G
    }

    fn axes(&self) -> (Vector3, Vector3, Vector3) {
        (
            self.e.column(0).into_owned(),
            self.e.column(1).into_owned(),
            self.e.column(2).into_owned(),
        )
    }

    fn mean_director(&self) -> Vector3 {
        0.5 * (self.q[0] + self.q[1])
    }

    fn compute_spin(&self) -> Matrix3x12 {
        let (e1, e2, e3) = self.axes();
        let mut G: Matrix3x12 = Matrix3x12::zeros();

        // Chord translation turns e1 about e2 and e3; e3 stays normal to the
        // mean director, which ties the twist to the translation as well
        let GxI: Matrix3 = ((e1 * (self.alpha / self.beta) + e2) * e3.transpose()
            - e3 * e2.transpose())
            / self.Ln;
        G.fixed_view_mut::<3, 3>(0, 0).copy_from(&GxI);
        G.fixed_view_mut::<3, 3>(0, NDF).copy_from(&(-GxI));

        // Nodal rotations only twist the triad through the director
        for (n, q) in self.q.iter().enumerate() {
            G.fixed_view_mut::<3, 3>(0, n * NDF + 3)
                .copy_from(&(e1 * q.cross(&e3).transpose() / (2. * self.beta)));
        }
        G
    }
}

impl Isometry for MidpointIsometry {
    fn initialize(&mut self, R0: &Matrix3, dX: &Vector3) -> Result<()> {
        self.update(&[*R0; NEN], dX)
    }

    fn update(&mut self, R: &[Matrix3; NEN], dx: &Vector3) -> Result<()> {
        let Ln = dx.norm();
        if Ln == 0. {
            return Err(TransformError::ZeroDeformedLength);
        }
        let e1: Vector3 = dx / Ln;

        for (q, Rn) in self.q.iter_mut().zip(R.iter()) {
            *q = Rn.column(1).into_owned();
        }
        let qm = 0.5 * (self.q[0] + self.q[1]);

        let e3: Vector3 = e1.cross(&qm);
        let e3_norm = e3.norm();
        if e3_norm == 0. {
            return Err(TransformError::DegenerateTriad);
        }
        let e3 = e3 / e3_norm;
        let e2 = e3.cross(&e1);

        self.Ln = Ln;
        self.e = Matrix3::from_columns(&[e1, e2, e3]);
        self.alpha = qm.dot(&e1);
        self.beta = qm.dot(&e2);
        self.G = self.compute_spin();
        Ok(())
    }

    fn rotation(&self) -> Matrix3 {
        self.e
    }

    fn compute_tangent(&self, ul: &Vector12) -> Matrix12 {
        let mut T: Matrix12 = Matrix12::zeros();

        // Elongation
        let e1t = self.e.column(0).transpose();
        T.fixed_view_mut::<1, 3>(NDF, 0).copy_from(&(-e1t));
        T.fixed_view_mut::<1, 3>(NDF, NDF).copy_from(&e1t);

        // Rotation of each node relative to the triad
        for n in 0..NEN {
            let v: Vector3 = ul.fixed_rows::<3>(n * NDF + 3).into_owned();
            let mut PG: Matrix3x12 = -self.G;
            PG.fixed_view_mut::<3, 3>(0, n * NDF + 3)
                .add_assign(&Matrix3::identity());
            T.fixed_view_mut::<3, NDE>(n * NDF + 3, 0)
                .copy_from(&(v.tangent_matrix_inv() * self.e.transpose() * PG));
        }
        T
    }

    fn add_tangent(&self, K: &mut Matrix12, p: &Vector12, ul: &Vector12) {
        let (e1, e2, e3) = self.axes();
        let (alpha, beta, Ln) = (self.alpha, self.beta, self.Ln);
        let qm = self.mean_director();

        // Axial force and nodal moments in global components
        let N = p[NDF];
        let M: [Vector3; NEN] = [0, 1].map(|n| {
            let v: Vector3 = ul.fixed_rows::<3>(n * NDF + 3).into_owned();
            let m: Vector3 = p.fixed_rows::<3>(n * NDF + 3).into_owned();
            self.e * (v.tangent_matrix_inv().transpose() * m)
        });
        let Mt: Vector3 = M[0] + M[1];

        // Gᵗ Mt = [-c/Ln, h_I, c/Ln, h_J]
        let (v1, v2, v3) = (Mt.dot(&e1), Mt.dot(&e2), Mt.dot(&e3));
        let s = v1 * alpha / beta + v2;
        let c: Vector3 = -s * e3 + v3 * e2;

        for k in 0..NDE {
            let mut b = Vector12::zeros();
            b[k] = 1.;
            let d: Vector3 = b.fixed_rows::<3>(NDF) - b.fixed_rows::<3>(0);
            let th: [Vector3; NEN] = [
                b.fixed_rows::<3>(3).into_owned(),
                b.fixed_rows::<3>(NDF + 3).into_owned(),
            ];

            let Om: Vector3 = self.G.column(k).into_owned();
            let de = [Om.cross(&e1), Om.cross(&e2), Om.cross(&e3)];

            let mut df = Vector12::zeros();

            // Axial force follows the chord
            df.fixed_rows_mut::<3>(0).add_assign(&(-N * de[0]));
            df.fixed_rows_mut::<3>(NDF).add_assign(&(N * de[0]));

            // Moments turn with the triad
            for (n, Mn) in M.iter().enumerate() {
                df.fixed_rows_mut::<3>(n * NDF + 3)
                    .add_assign(&Om.cross(Mn));
            }
            df -= self.G.transpose() * Om.cross(&Mt);

            // Variation of G at fixed Mt
            let dLn = e1.dot(&d);
            let dq: Vector3 = 0.5 * izip!(th.iter(), self.q.iter())
                .map(|(t, q)| t.cross(q))
                .fold(Vector3::zeros(), |acc, x| acc + x);
            let dalpha = dq.dot(&e1) + qm.dot(&de[0]);
            let dbeta = dq.dot(&e2) + qm.dot(&de[1]);
            let (dv1, dv2, dv3) = (Mt.dot(&de[0]), Mt.dot(&de[1]), Mt.dot(&de[2]));

            let ds = dv1 * alpha / beta + v1 * dalpha / beta - v1 * alpha * dbeta / beta.powi(2)
                + dv2;
            let dc: Vector3 = -ds * e3 - s * de[2] + dv3 * e2 + v3 * de[1];
            let dcL: Vector3 = dc / Ln - c * dLn / Ln.powi(2);
            df.fixed_rows_mut::<3>(0).add_assign(&dcL);
            df.fixed_rows_mut::<3>(NDF).add_assign(&(-dcL));

            let w = v1 / (2. * beta);
            let dw = dv1 / (2. * beta) - v1 * dbeta / (2. * beta.powi(2));
            for (n, (q, t)) in self.q.iter().zip(th.iter()).enumerate() {
                let dh: Vector3 =
                    dw * q.cross(&e3) + w * (t.cross(q).cross(&e3) + q.cross(&de[2]));
                df.fixed_rows_mut::<3>(n * NDF + 3).add_assign(&(-dh));
            }

            K.column_mut(k).add_assign(&df);
        }
    }
}

//------------------------------------------------------------------------------
// Testing
//------------------------------------------------------------------------------
