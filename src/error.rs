use thiserror::Error;

use crate::types::BodyId;

/// Faults raised while building a world or registering bodies.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("level grid has no cells")]
    EmptyGrid,
    #[error("grid row {row} has {actual} cells, expected {expected}")]
    RaggedGrid {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("body {id:?} at ({x}, {y}) lies outside the grid")]
    BodyOutOfBounds { id: BodyId, x: f32, y: f32 },
    #[error("body {0:?} is already registered")]
    DuplicateBody(BodyId),
    #[error("body {0:?} is not registered")]
    UnknownBody(BodyId),
    #[error("invalid world config: {0}")]
    InvalidConfig(String),
    #[error("failed to parse RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

pub type Result<T> = std::result::Result<T, WorldError>;
