//! Tessellation errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessellationError {
    #[error("nothing to tessellate")]
    EmptyInput,

    #[error("path tessellation failed: {0}")]
    TessellationFailed(String),

    #[error("tessellation produced more vertices than 16-bit indices can address")]
    TooManyVertices,

    #[error("tessellation callback rejected the output")]
    CallbackRejected,
}

impl From<lyon::lyon_tessellation::TessellationError> for TessellationError {
    fn from(err: lyon::lyon_tessellation::TessellationError) -> Self {
        use lyon::lyon_tessellation::{GeometryBuilderError, TessellationError as Lyon};
        match err {
            Lyon::GeometryBuilder(GeometryBuilderError::TooManyVertices) => {
                TessellationError::TooManyVertices
            }
            other => TessellationError::TessellationFailed(format!("{:?}", other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, TessellationError>;
