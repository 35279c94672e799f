#![allow(non_snake_case)]

use std::rc::Rc;

use approx::assert_relative_eq;
use corotframe::{
    element::node::{FrameNode, Node},
    prelude::*,
    transform::{FrameTransform, OffsetFlags},
};

const L: f64 = 10.;
const EA: f64 = 1.0e4;
const GJ: f64 = 80.;
const EI: f64 = 100.;

/// Linear elastic basic stiffness of a slender frame element
fn basic_stiffness() -> Matrix12 {
    let mut kl = Matrix12::zeros();
    kl[(6, 6)] = EA / L;
    kl[(3, 3)] = GJ / L;
    kl[(9, 9)] = GJ / L;
    kl[(3, 9)] = -GJ / L;
    kl[(9, 3)] = -GJ / L;
    for (i, j) in [(4, 10), (5, 11)] {
        kl[(i, i)] = 4. * EI / L;
        kl[(j, j)] = 4. * EI / L;
        kl[(i, j)] = 2. * EI / L;
        kl[(j, i)] = 2. * EI / L;
    }
    kl
}

struct Cantilever {
    transf: FrameTransform<Node>,
    tip: Rc<Node>,
    kl: Matrix12,
}

impl Cantilever {
    fn new() -> Self {
        let nodes = [
            Rc::new(Node::new(1, Vector3::zeros())),
            Rc::new(Node::new(2, Vector3::new(L, 0., 0.))),
        ];
        let mut transf: FrameTransform<Node> =
            FrameTransform::new(1, Vector3::new(0., 0., 1.), None, OffsetFlags::default());
        transf.initialize(&nodes).unwrap();
        Cantilever {
            transf,
            tip: nodes[1].clone(),
            kl: basic_stiffness(),
        }
    }

    /// Tip force with the free end at total displacement `u`.
    fn tip_force(&mut self, u: &Vector6) -> Vector6 {
        self.tip.set_trial_displacement(u);
        self.transf.update().unwrap();
        let pl: Vector12 = self.kl * self.transf.basic_trial_displacement();
        self.transf.push_response(&pl).fixed_rows::<6>(NDF).into_owned()
    }

    /// Newton iteration on the free end, returns the number of iterations.
    fn solve(&mut self, load: &Vector6) -> Option<usize> {
        for iter in 0..50 {
            self.transf.update().unwrap();
            let pl: Vector12 = self.kl * self.transf.basic_trial_displacement();
            let f = self.transf.push_response(&pl);
            let r: Vector6 = f.fixed_rows::<6>(NDF) - load;
            if r.norm() < 1e-10 {
                self.transf.commit();
                self.tip.commit_state();
                return Some(iter);
            }
            let K = self.transf.push_stiffness(&self.kl, &pl);
            let du = K.fixed_view::<6, 6>(NDF, NDF).into_owned().lu().solve(&(-r))?;
            self.tip.increment_trial_displacement(&du);
        }
        None
    }
}

#[test]
fn test_small_tip_load() {
    let mut beam = Cantilever::new();
    let P = 3.0e-3;
    let iter = beam.solve(&Vector6::new(0., 0., -P, 0., 0., 0.));
    assert!(matches!(iter, Some(i) if i <= 4));

    let u = beam.tip.trial_displacement();
    assert_relative_eq!(u[2], -P * L.powi(3) / (3. * EI), max_relative = 1e-3);
    assert_relative_eq!(u[4], P * L.powi(2) / (2. * EI), max_relative = 1e-3);
    assert_relative_eq!(u[1], 0., epsilon = 1e-12);
}

#[test]
fn test_large_tip_load() {
    let mut beam = Cantilever::new();
    let P = 0.6;
    for step in 1..=10 {
        let load = Vector6::new(0., 0., -P * step as f64 / 10., 0., 0., 0.);
        let iter = beam.solve(&load);
        assert!(iter.is_some(), "step {} failed to converge", step);
        assert!(iter.unwrap() <= 5, "step {} took {:?} iterations", step, iter);
    }

    let u = beam.tip.trial_displacement();
    assert!(u[2] < 0.);
    assert!(u[4] > 0.);
    // Tip swings back toward the root
    assert!(u[0] < 0.);

    // Root reactions balance the tip load about the displaced tip
    let pl: Vector12 = beam.kl * beam.transf.basic_trial_displacement();
    let f = beam.transf.push_response(&pl);
    assert_relative_eq!(f[0], 0., epsilon = 1e-9);
    assert_relative_eq!(f[1], 0., epsilon = 1e-9);
    assert_relative_eq!(f[2], P, epsilon = 1e-9);
    assert_relative_eq!(f[3], 0., epsilon = 1e-9);
    assert_relative_eq!(f[4], -P * (L + u[0]), epsilon = 1e-8);
    assert_relative_eq!(f[5], 0., epsilon = 1e-9);

    // Converged tangent is the derivative of the tip force
    let K = beam.transf.push_stiffness(&beam.kl, &pl);
    let h = 1e-6;
    for k in 0..NDF {
        let mut du = Vector6::zeros();
        du[k] = h;
        let fp = beam.tip_force(&(u + du));
        let fm = beam.tip_force(&(u - du));
        beam.tip_force(&u);
        assert_relative_eq!(
            K.fixed_view::<6, 1>(NDF, NDF + k).into_owned(),
            (fp - fm) / (2. * h),
            epsilon = 1e-5
        );
    }
}
