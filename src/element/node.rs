use std::cell::Cell;

use crate::prelude::*;

/// Read access a frame transformation needs from an element end node.
///
/// Displacements are totals accumulated since the start of the analysis. The
/// rotational components are the additive sum of the rotation increments that
/// have been applied to the node, which is not a rotation vector once the
/// increments stop being coaxial.
pub trait FrameNode {
    fn tag(&self) -> usize;
    fn coordinates(&self) -> Vector3;
    fn trial_displacement(&self) -> Vector6;
    fn committed_displacement(&self) -> Vector6;
}

/// Node with trial and committed displacement.
///
/// The displacement lives in cells so a solver can move the node while
/// transformations hold shared handles to it.
#[derive(Debug, Clone)]
pub struct Node {
    tag: usize,
    position: Vector3,
    trial: Cell<Vector6>,
    committed: Cell<Vector6>,
}

impl Node {
    pub fn new(tag: usize, position: Vector3) -> Self {
        Node {
            tag,
            position,
            trial: Cell::new(Vector6::zeros()),
            committed: Cell::new(Vector6::zeros()),
        }
    }

    pub fn set_trial_displacement(&self, u: &Vector6) {
        self.trial.set(*u);
    }

    pub fn increment_trial_displacement(&self, du: &Vector6) {
        self.trial.set(self.trial.get() + du);
    }

    pub fn commit_state(&self) {
        self.committed.set(self.trial.get());
    }

    pub fn revert_to_last_commit(&self) {
        self.trial.set(self.committed.get());
    }

    pub fn revert_to_start(&self) {
        self.trial.set(Vector6::zeros());
        self.committed.set(Vector6::zeros());
    }
}

impl FrameNode for Node {
    fn tag(&self) -> usize {
        self.tag
    }
    fn coordinates(&self) -> Vector3 {
        self.position
    }
    fn trial_displacement(&self) -> Vector6 {
        self.trial.get()
    }
    fn committed_displacement(&self) -> Vector6 {
        self.committed.get()
    }
}
