//! Renderer error types

use thiserror::Error;

use crate::formats::PixelFormat;

/// Renderer-related errors
#[derive(Error, Debug)]
pub enum RendererError {
    /// No GPU adapter matched the request
    #[error("No suitable GPU adapter found")]
    AdapterNotFound,

    /// The device could not be created
    #[error("Failed to request GPU device: {0}")]
    Device(String),

    /// The context has been lost or was never valid
    #[error("Renderer context is not valid")]
    InvalidContext,

    /// A pixel format the backend cannot render to
    #[error("Unsupported pixel format: {0:?}")]
    UnsupportedFormat(PixelFormat),

    /// A texture could not be allocated
    #[error("Texture allocation failed: {0}")]
    TextureAllocation(String),
}

/// Result type for renderer operations
pub type Result<T> = std::result::Result<T, RendererError>;
