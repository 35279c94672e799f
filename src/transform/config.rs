use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::prelude::*;

use super::offset::OffsetFlags;

/// Treatment of the variation of the nodal rotation logarithm in the tangent stiffness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMapCorrection {
    /// Exact derivative of the inverse Jacobian, consistent with the resisting force
    #[default]
    Exact,
    /// `p tan θ` per local rotation, singular at θ = ±π/2
    Tangent,
}

/// Constructor parameters of a frame transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    pub tag: usize,
    /// Vector in the local x-z plane, not parallel to the element chord
    pub vecxz: [f64; 3],
    /// Rigid joint offset of each end node
    #[serde(default)]
    pub offsets: Option<[[f64; 3]; NEN]>,
    #[serde(default)]
    pub offset_flags: OffsetFlags,
    #[serde(default)]
    pub log_map: LogMapCorrection,
}

impl TransformConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
