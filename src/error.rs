//! Error types for frame transformations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransformError>;

#[derive(Error, Debug)]
pub enum TransformError {
    /// A transform connects exactly two end nodes.
    #[error("expected {expected} end nodes, found {found}")]
    MissingNodes { expected: usize, found: usize },

    #[error("element has zero reference length")]
    ZeroReferenceLength,

    #[error("element chord has collapsed to zero length")]
    ZeroDeformedLength,

    #[error("reference vector is parallel to the element chord")]
    ParallelReferenceVector,

    /// The director of the corotational triad is parallel to the chord.
    #[error("corotational triad is degenerate")]
    DegenerateTriad,

    #[error("transform used before initialize")]
    Uninitialized,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransformError {
    /// Whether the error stems from the element geometry rather than its setup.
    pub fn is_degenerate_geometry(&self) -> bool {
        matches!(
            self,
            TransformError::ZeroReferenceLength
                | TransformError::ZeroDeformedLength
                | TransformError::ParallelReferenceVector
                | TransformError::DegenerateTriad
        )
    }
}
