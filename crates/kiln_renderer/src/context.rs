//! The device/session owner

use std::sync::Arc;

use crate::command_buffer::CommandBuffer;
use crate::config::RendererConfig;
use crate::formats::PixelFormat;
use crate::pipeline::{Pipeline, PipelineDescriptor, PipelineLibrary};
use crate::shader::ShaderLibrary;
use crate::texture::{Texture, TextureDescriptor};

/// A rendering context shared by every thread that records for one device
pub trait Context: Send + Sync {
    fn is_valid(&self) -> bool;

    fn config(&self) -> &RendererConfig;

    fn create_command_buffer(&self) -> Option<Box<dyn CommandBuffer>>;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>>;

    fn supports_format(&self, format: PixelFormat) -> bool;

    fn pipeline_library(&self) -> &PipelineLibrary;

    fn shader_library(&self) -> &ShaderLibrary;

    /// Build the backend pipeline for `descriptor`. Called by the pipeline
    /// library on a cache miss; use [`Context::get_pipeline`] instead.
    fn compile_pipeline(&self, descriptor: &PipelineDescriptor) -> Option<Pipeline>;

    /// Cached pipeline for `descriptor`, compiling it on first use
    fn get_pipeline(&self, descriptor: &PipelineDescriptor) -> Option<Arc<Pipeline>> {
        self.pipeline_library()
            .get_pipeline(descriptor, |desc| self.compile_pipeline(desc))
    }
}
