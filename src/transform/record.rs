use std::fmt;

use serde::Serialize;

use crate::prelude::*;

/// Type identifier reported for corotational frame transforms
pub const TRANSFORM_TYPE: &str = "CorotFrameTransf3d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintFormat {
    Summary,
    Json,
}

/// Keyed description of a transform as supplied by the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformRecord {
    pub name: usize,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub vecxz: [f64; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsets: Option<Vec<[f64; 3]>>,
}

impl TransformRecord {
    pub fn new(tag: usize, vz: &Vector3, offsets: Option<&[Vector3; NEN]>) -> Self {
        TransformRecord {
            name: tag,
            kind: TRANSFORM_TYPE,
            vecxz: [vz[0], vz[1], vz[2]],
            offsets: offsets.map(|o| o.iter().map(|v| [v[0], v[1], v[2]]).collect_vec()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for TransformRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.kind, self.name)?;
        writeln!(
            f,
            "  vecxz: {} {} {}",
            self.vecxz[0], self.vecxz[1], self.vecxz[2]
        )?;
        if let Some(offsets) = &self.offsets {
            for (n, o) in offsets.iter().enumerate() {
                writeln!(f, "  offset {}: {} {} {}", n + 1, o[0], o[1], o[2])?;
            }
        }
        Ok(())
    }
}
