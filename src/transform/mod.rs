#![allow(non_snake_case)]

pub mod config;
pub mod isometry;
pub mod offset;
pub mod orient;
pub mod record;

use std::io::Write;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::element::node::FrameNode;
use crate::error::{Result, TransformError};
use crate::prelude::*;

pub use config::{LogMapCorrection, TransformConfig};
pub use isometry::{Isometry, MidpointIsometry};
pub use offset::OffsetFlags;
pub use record::{PrintFormat, TransformRecord};

use offset::{add_offset_stiffness, offset_matrix, resolve_offsets};
use orient::{orientation_from_chord, quaternion_from_frame};

/// Elongation slots of the local deformation vector
const AXIAL_I: usize = 0;
const AXIAL_J: usize = NDF;

/// Below this |cos θ| the tan θ correction is reported as near singular
const TAN_WARN_COS: f64 = 1e-3;

fn near_tan_singularity(theta: f64) -> bool {
    theta.cos().abs() < TAN_WARN_COS
}

//------------------------------------------------------------------------------
// Initial displacement
//------------------------------------------------------------------------------

/// Displacement the nodes already carried when the transform was first initialized.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InitialDisplacement {
    Unchecked,
    Captured([Option<Vector6>; NEN]),
}

impl InitialDisplacement {
    fn of(&self, n: usize) -> Vector6 {
        match self {
            InitialDisplacement::Captured(u0) => u0[n].unwrap_or_else(Vector6::zeros),
            InitialDisplacement::Unchecked => Vector6::zeros(),
        }
    }
}

//------------------------------------------------------------------------------
// Frame transform
//------------------------------------------------------------------------------

/// Corotational transformation of a two node spatial frame element.
///
/// Nodal orientations are unit quaternions updated by left composition with
/// the incremental rotation, `Q ← exp(Δα) Q`, so increments act in the current
/// spatial frame. Local deformations are the elongation of the chord and the
/// logarithm of each nodal rotation relative to the corotational triad.
#[derive(Debug)]
pub struct FrameTransform<N: FrameNode, I: Isometry = MidpointIsometry> {
    tag: usize,
    /// Vector in the local x-z plane
    vz: Vector3,
    offsets: Option<Box<[Vector3; NEN]>>,
    offset_flags: OffsetFlags,
    /// Offsets in global components at the reference configuration
    offsets_ref: Option<[Vector3; NEN]>,
    log_map: LogMapCorrection,

    nodes: Option<[Rc<N>; NEN]>,
    initial_disp: InitialDisplacement,

    /// Reference chord, length and orientation
    dX: Vector3,
    L: f64,
    R0: Matrix3,
    Q0: UnitQuaternion,

    /// Nodal orientations, committed and trial
    Q_past: [UnitQuaternion; NEN],
    Q_pres: [UnitQuaternion; NEN],

    /// Last seen nodal rotation displacement
    alpha: [Vector3; NEN],

    /// Local deformation, committed and previous iteration
    ul: Vector12,
    ulcommit: Vector12,
    ulpr: Vector12,

    Ln: f64,
    T: Matrix12,

    isometry: I,
}

impl<N: FrameNode> FrameTransform<N, MidpointIsometry> {
    pub fn new(
        tag: usize,
        vz: Vector3,
        offsets: Option<[Vector3; NEN]>,
        offset_flags: OffsetFlags,
    ) -> Self {
        Self::with_isometry(tag, vz, offsets, offset_flags, MidpointIsometry::new())
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(
            config.tag,
            Vector3::from(config.vecxz),
            config.offsets.map(|o| o.map(Vector3::from)),
            config.offset_flags,
        )
        .with_log_map_correction(config.log_map)
    }
}

impl<N: FrameNode, I: Isometry> FrameTransform<N, I> {
    pub fn with_isometry(
        tag: usize,
        vz: Vector3,
        offsets: Option<[Vector3; NEN]>,
        offset_flags: OffsetFlags,
        isometry: I,
    ) -> Self {
        FrameTransform {
            tag,
            vz,
            offsets: offsets.map(Box::new),
            offset_flags,
            offsets_ref: None,
            log_map: LogMapCorrection::default(),
            nodes: None,
            initial_disp: InitialDisplacement::Unchecked,
            dX: Vector3::zeros(),
            L: 0.,
            R0: Matrix3::identity(),
            Q0: UnitQuaternion::identity(),
            Q_past: [UnitQuaternion::identity(); NEN],
            Q_pres: [UnitQuaternion::identity(); NEN],
            alpha: [Vector3::zeros(); NEN],
            ul: Vector12::zeros(),
            ulcommit: Vector12::zeros(),
            ulpr: Vector12::zeros(),
            Ln: 0.,
            T: Matrix12::zeros(),
            isometry,
        }
    }

    /// Select how `push_stiffness` accounts for the variation of the rotation logarithm.
    pub fn with_log_map_correction(mut self, log_map: LogMapCorrection) -> Self {
        self.log_map = log_map;
        self
    }

    //--------------------------------------------------------------------------
    // Lifecycle
    //--------------------------------------------------------------------------

    /// Bind the end nodes and set up the reference configuration.
    ///
    /// Nothing is modified when an error is returned.
    pub fn initialize(&mut self, nodes: &[Rc<N>]) -> Result<()> {
        let nodes: [Rc<N>; NEN] = match nodes {
            [i, j] => [Rc::clone(i), Rc::clone(j)],
            _ => {
                return Err(TransformError::MissingNodes {
                    expected: NEN,
                    found: nodes.len(),
                })
            }
        };

        // Displacement carried by the nodes is captured once, on first use
        let initial_disp = match self.initial_disp {
            InitialDisplacement::Unchecked => {
                InitialDisplacement::Captured([0, 1].map(|n| {
                    let u = nodes[n].committed_displacement();
                    if u.iter().any(|&x| x != 0.) {
                        Some(u)
                    } else {
                        None
                    }
                }))
            }
            captured => captured,
        };

        // Node to node chord in the displaced reference configuration
        let X: [Vector3; NEN] = [0, 1].map(|n| {
            nodes[n].coordinates() + initial_disp.of(n).fixed_rows::<3>(0)
        });
        let chord: Vector3 = X[1] - X[0];
        let length = chord.norm();
        if length == 0. {
            return Err(TransformError::ZeroReferenceLength);
        }

        // Chord between the offset end points
        let offsets_ref = match &self.offsets {
            Some(o) => {
                let R = orientation_from_chord(&chord, &self.vz)?;
                Some(resolve_offsets(o, self.offset_flags, &R, length))
            }
            None => None,
        };
        let dX = match &offsets_ref {
            Some(o) => chord + o[1] - o[0],
            None => chord,
        };
        let L = dX.norm();
        if L == 0. {
            return Err(TransformError::ZeroReferenceLength);
        }
        let R0 = orientation_from_chord(&dX, &self.vz)?;
        self.isometry.initialize(&R0, &dX)?;

        let node_tags = [nodes[0].tag(), nodes[1].tag()];
        self.nodes = Some(nodes);
        self.initial_disp = initial_disp;
        self.offsets_ref = offsets_ref;
        self.dX = dX;
        self.L = L;
        self.Ln = L;
        self.R0 = R0;
        self.Q0 = quaternion_from_frame(&R0);
        self.Q_pres = [self.Q0; NEN];
        self.alpha = [Vector3::zeros(); NEN];
        self.ul = Vector12::zeros();
        self.ulpr = Vector12::zeros();
        self.form_tangent();
        self.commit();

        debug!(
            tag = self.tag,
            node_i = node_tags[0],
            node_j = node_tags[1],
            L,
            "initialized frame transform"
        );
        Ok(())
    }

    /// Recompute the local deformation and tangent from the nodal trial displacement.
    pub fn update(&mut self) -> Result<()> {
        let u = self.trial_displacements()?;

        // Rotation since the last update, composed on the left
        for (Q, alpha, un) in izip!(self.Q_pres.iter_mut(), self.alpha.iter_mut(), u.iter()) {
            let theta: Vector3 = un.fixed_rows::<3>(3).into_owned();
            let dAlpha: Vector3 = theta - *alpha;
            *alpha = theta;
            if dAlpha.norm() != 0. {
                *Q = UnitQuaternion::from_scaled_axis(dAlpha) * *Q;
            }
        }
        let R: [Matrix3; NEN] = self.Q_pres.map(|Q| *Q.to_rotation_matrix().matrix());

        // Deformed chord between the end points
        let mut dx: Vector3 = self.dX + u[1].fixed_rows::<3>(0) - u[0].fixed_rows::<3>(0);
        if let (Some(o), Some(on)) = (&self.offsets_ref, self.current_offsets()) {
            dx += (on[1] - o[1]) - (on[0] - o[0]);
        }
        let Ln = dx.norm();
        if Ln == 0. {
            return Err(TransformError::ZeroDeformedLength);
        }

        self.isometry.update(&R, &dx)?;
        let qe = quaternion_from_frame(&self.isometry.rotation());

        self.ulpr = self.ul;
        let mut ul = Vector12::zeros();
        for (n, Q) in self.Q_pres.iter().enumerate() {
            let vr: Vector3 = (qe.inverse() * Q).scaled_axis();
            ul.fixed_rows_mut::<3>(n * NDF + 3).copy_from(&vr);
        }
        ul[AXIAL_I] = 0.;
        ul[AXIAL_J] = Ln - self.L;

        self.ul = ul;
        self.Ln = Ln;
        self.form_tangent();
        Ok(())
    }

    pub fn commit(&mut self) {
        self.ulcommit = self.ul;
        self.Q_past = self.Q_pres;
    }

    pub fn revert_to_last_commit(&mut self) -> Result<()> {
        self.Q_pres = self.Q_past;
        self.ul = self.ulcommit;

        // Later increments are measured from what the nodes report now
        let u = self.trial_displacements()?;
        for (alpha, un) in self.alpha.iter_mut().zip(u.iter()) {
            *alpha = un.fixed_rows::<3>(3).into_owned();
        }

        debug!(tag = self.tag, "reverted frame transform to last commit");
        self.update()
    }

    pub fn revert_to_start(&mut self) -> Result<()> {
        self.ul = Vector12::zeros();
        self.ulcommit = Vector12::zeros();
        self.ulpr = Vector12::zeros();

        self.Q_pres[0] = self.Q0;
        for n in 1..NEN {
            self.Q_pres[n] = self.Q_pres[0];
        }
        self.Q_past = self.Q_pres;
        self.alpha = [Vector3::zeros(); NEN];

        debug!(tag = self.tag, "reverted frame transform to start");
        self.update()
    }

    //--------------------------------------------------------------------------
    // Push to global
    //--------------------------------------------------------------------------

    /// Global nodal forces of local forces `pl`, `Tᵗ pl`.
    pub fn push_response(&self, pl: &Vector12) -> Vector12 {
        self.T.transpose() * pl
    }

    /// Global tangent of local tangent `kl` under local forces `pl`.
    ///
    /// With [`LogMapCorrection::Exact`] this is the derivative of
    /// `push_response(pl)` for `pl` held fixed. Requires `update` to have run
    /// since the nodes last moved.
    pub fn push_stiffness(&self, kl: &Matrix12, pl: &Vector12) -> Matrix12 {
        let mut K: Matrix12 = self.T.transpose() * kl * self.T;

        // Motion of the triad
        let mut Kt = Matrix12::zeros();
        self.isometry.add_tangent(&mut Kt, pl, &self.ul);
        match self.current_offsets() {
            Some(o) => {
                let B = offset_matrix(&o);
                K += B.transpose() * Kt * B;
                let f: Vector12 = self.isometry.compute_tangent(&self.ul).transpose() * pl;
                add_offset_stiffness(&mut K, &f, &o);
            }
            None => K += Kt,
        }

        // Variation of the logarithm
        match self.log_map {
            LogMapCorrection::Exact => {
                // Rows of T are J⁻¹(v) X, so d(Xᵗ J⁻ᵀ m) = Tᵗ Jᵗ H T
                for n in 0..NEN {
                    let v: Vector3 = self.ul.fixed_rows::<3>(n * NDF + 3).into_owned();
                    let m: Vector3 = pl.fixed_rows::<3>(n * NDF + 3).into_owned();
                    let Tn = self.T.fixed_rows::<3>(n * NDF + 3);
                    let H: Matrix3 =
                        v.tangent_matrix().transpose() * v.tangent_matrix_inv_variation(&m);
                    K += Tn.transpose() * H * Tn;
                }
            }
            LogMapCorrection::Tangent => {
                // Singular at θ = ±π/2
                for k in (0..NEN).flat_map(|n| n * NDF + 3..n * NDF + 6) {
                    let theta = self.ul[k];
                    if near_tan_singularity(theta) {
                        warn!(
                            tag = self.tag,
                            dof = k,
                            theta,
                            "local rotation near the tan singularity"
                        );
                    }
                    let Tk = self.T.row(k);
                    K += (pl[k] * theta.tan()) * Tk.transpose() * Tk;
                }
            }
        }
        K
    }

    //--------------------------------------------------------------------------
    // Accessors
    //--------------------------------------------------------------------------

    pub fn tag(&self) -> usize {
        self.tag
    }

    pub fn initial_length(&self) -> f64 {
        self.L
    }

    pub fn deformed_length(&self) -> f64 {
        self.Ln
    }

    /// Reference local axes x, y, z.
    pub fn local_axes(&self) -> [Vector3; 3] {
        [0, 1, 2].map(|i| self.R0.column(i).into_owned())
    }

    /// Current corotational basis.
    pub fn rotation(&self) -> Matrix3 {
        self.isometry.rotation()
    }

    /// Current orientation of node `n`.
    ///
    /// # Panics
    ///
    /// Panics if `n >= NEN`.
    pub fn node_rotation(&self, n: usize) -> Matrix3 {
        *self.Q_pres[n].to_rotation_matrix().matrix()
    }

    /// Local translational deformation of node `n`.
    ///
    /// # Panics
    ///
    /// Panics if `n >= NEN`.
    pub fn node_position(&self, n: usize) -> Vector3 {
        self.ul.fixed_rows::<3>(n * NDF).into_owned()
    }

    /// Rotation of node `n` relative to the corotational triad, as a rotation vector.
    ///
    /// # Panics
    ///
    /// Panics if `n >= NEN`.
    pub fn node_rotation_logarithm(&self, n: usize) -> Vector3 {
        self.ul.fixed_rows::<3>(n * NDF + 3).into_owned()
    }

    /// Joint offset of node `n` in global components at the reference configuration,
    /// `None` without offsets.
    ///
    /// # Panics
    ///
    /// Panics if `n >= NEN`.
    pub fn node_offset(&self, n: usize) -> Option<Vector3> {
        self.offsets_ref.map(|o| o[n])
    }

    pub fn basic_trial_displacement(&self) -> &Vector12 {
        &self.ul
    }

    /// Local deformation since the last commit.
    pub fn basic_increment(&self) -> Vector12 {
        self.ul - self.ulcommit
    }

    /// Local deformation since the previous update.
    pub fn state_variation(&self) -> Vector12 {
        self.ul - self.ulpr
    }

    pub fn tangent(&self) -> &Matrix12 {
        &self.T
    }

    //--------------------------------------------------------------------------
    // Sensitivity
    //--------------------------------------------------------------------------

    pub fn displacement_sensitivity(&self, grad: usize) -> VectorD {
        warn!(
            tag = self.tag,
            grad, "displacement sensitivity is not implemented for frame transforms"
        );
        VectorD::zeros(1)
    }

    pub fn is_shape_sensitivity(&self) -> bool {
        false
    }

    //--------------------------------------------------------------------------
    // Output
    //--------------------------------------------------------------------------

    pub fn record(&self) -> TransformRecord {
        TransformRecord::new(self.tag, &self.vz, self.offsets.as_deref())
    }

    pub fn print<W: Write>(&self, w: &mut W, format: PrintFormat) -> Result<()> {
        let record = self.record();
        match format {
            PrintFormat::Summary => write!(w, "{}", record)?,
            PrintFormat::Json => write!(w, "{}", record.to_json()?)?,
        }
        Ok(())
    }

    //--------------------------------------------------------------------------
    // Internal
    //--------------------------------------------------------------------------

    /// Nodal trial displacement relative to the captured initial displacement.
    fn trial_displacements(&self) -> Result<[Vector6; NEN]> {
        let nodes = self.nodes.as_ref().ok_or(TransformError::Uninitialized)?;
        Ok([0, 1].map(|n| nodes[n].trial_displacement() - self.initial_disp.of(n)))
    }

    /// Offsets turned with their node.
    fn current_offsets(&self) -> Option<[Vector3; NEN]> {
        let o = self.offsets_ref?;
        let Q0_inv = self.Q0.inverse();
        Some([0, 1].map(|n| (self.Q_pres[n] * Q0_inv) * o[n]))
    }

    fn form_tangent(&mut self) {
        let T = self.isometry.compute_tangent(&self.ul);
        self.T = match self.current_offsets() {
            Some(o) => T * offset_matrix(&o),
            None => T,
        };
    }
}

impl<N: FrameNode, I: Isometry + Clone> Clone for FrameTransform<N, I> {
    fn clone(&self) -> Self {
        FrameTransform {
            tag: self.tag,
            vz: self.vz,
            offsets: self.offsets.clone(),
            offset_flags: self.offset_flags,
            offsets_ref: self.offsets_ref,
            log_map: self.log_map,
            nodes: self.nodes.clone(),
            initial_disp: self.initial_disp,
            dX: self.dX,
            L: self.L,
            R0: self.R0,
            Q0: self.Q0,
            Q_past: self.Q_past,
            Q_pres: self.Q_pres,
            alpha: self.alpha,
            ul: self.ul,
            ulcommit: self.ulcommit,
            ulpr: self.ulpr,
            Ln: self.Ln,
            T: self.T,
            isometry: self.isometry.clone(),
        }
    }
}

//------------------------------------------------------------------------------
// Testing
//------------------------------------------------------------------------------
