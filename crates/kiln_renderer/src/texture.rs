//! Textures

use std::any::Any;

use kiln_core::ISize;

use crate::formats::{PixelFormat, TextureUsage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub format: PixelFormat,
    pub size: ISize,
    pub sample_count: u32,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    pub fn new(format: PixelFormat, size: ISize) -> Self {
        Self {
            format,
            size,
            sample_count: 1,
            usage: TextureUsage::SHADER_READ,
        }
    }

    pub fn render_target(format: PixelFormat, size: ISize, sample_count: u32) -> Self {
        Self {
            format,
            size,
            sample_count,
            usage: TextureUsage::RENDER_TARGET | TextureUsage::SHADER_READ,
        }
    }
}

/// A backend texture, shared as `Arc<dyn Texture>`
pub trait Texture: Send + Sync + std::fmt::Debug {
    fn descriptor(&self) -> &TextureDescriptor;

    fn label(&self) -> &str;

    /// Backends downcast to their concrete texture type through this
    fn as_any(&self) -> &dyn Any;

    fn size(&self) -> ISize {
        self.descriptor().size
    }

    fn format(&self) -> PixelFormat {
        self.descriptor().format
    }
}
