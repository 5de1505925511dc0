//! Layer tree errors

use thiserror::Error;

use crate::context::SceneToken;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("layer tree painted before it was prerolled")]
    NotPrerolled,

    #[error("no picture registered for child scene {0}")]
    UnknownScene(SceneToken),
}

pub type Result<T> = std::result::Result<T, LayerError>;
