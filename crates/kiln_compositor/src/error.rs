//! Compositor errors

use std::path::PathBuf;

use kiln_flow::LayerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Renderer context is not valid")]
    InvalidContext,

    #[error("Could not create a command buffer")]
    NoCommandBuffer,

    #[error("Could not create a render pass for '{0}'")]
    NoRenderPass(String),

    #[error("Could not allocate a {width}x{height} frame target")]
    NoRenderTarget { width: u32, height: u32 },

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write TOML: {0}")]
    Serialize(String),

    #[error("Invalid scene: {0}")]
    InvalidScene(String),
}

pub type Result<T> = std::result::Result<T, CompositorError>;
