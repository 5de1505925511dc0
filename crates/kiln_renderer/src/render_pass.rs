//! Render passes and the draw commands they record

use std::sync::Arc;

use smallvec::SmallVec;

use kiln_core::{ISize, Matrix};

use crate::buffer::{BufferView, HostBuffer, VertexBuffer};
use crate::formats::{PixelFormat, PrimitiveType};
use crate::pipeline::Pipeline;
use crate::render_target::RenderTarget;
use crate::texture::Texture;

/// A uniform buffer bound to a shader slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferBinding {
    pub slot: u32,
    pub view: BufferView,
}

/// A sampled texture bound to a shader slot
#[derive(Clone, Debug)]
pub struct TextureBinding {
    pub slot: u32,
    pub texture: Arc<dyn Texture>,
}

/// One draw call
#[derive(Clone, Debug, Default)]
pub struct Command {
    pub label: String,
    pub pipeline: Option<Arc<Pipeline>>,
    pub vertex_buffer: VertexBuffer,
    pub vertex_bindings: SmallVec<[BufferBinding; 2]>,
    pub fragment_bindings: SmallVec<[BufferBinding; 2]>,
    pub textures: SmallVec<[TextureBinding; 1]>,
    pub stencil_reference: u32,
    pub primitive_type: PrimitiveType,
}

impl Command {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn bind_vertices(&mut self, vertex_buffer: VertexBuffer) -> &mut Self {
        self.vertex_buffer = vertex_buffer;
        self
    }

    pub fn bind_vertex_uniform(&mut self, slot: u32, view: BufferView) -> &mut Self {
        self.vertex_bindings.push(BufferBinding { slot, view });
        self
    }

    pub fn bind_fragment_uniform(&mut self, slot: u32, view: BufferView) -> &mut Self {
        self.fragment_bindings.push(BufferBinding { slot, view });
        self
    }

    pub fn bind_texture(&mut self, slot: u32, texture: Arc<dyn Texture>) -> &mut Self {
        self.textures.push(TextureBinding { slot, texture });
        self
    }
}

/// Why a command was rejected by a render pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandRejection {
    NoPipeline,
    NoVertices,
    ColorFormatMismatch {
        pipeline: PixelFormat,
        pass: PixelFormat,
    },
    SampleCountMismatch {
        pipeline: u32,
        pass: u32,
    },
    StencilFormatMismatch {
        pipeline: PixelFormat,
        pass: PixelFormat,
    },
}

/// Records commands against one render target
///
/// Passes are created by a [`CommandBuffer`](crate::CommandBuffer) and stay
/// owned by it. Each pass has its own transient host buffer for vertex and
/// uniform data.
#[derive(Debug)]
pub struct RenderPass {
    label: String,
    render_target: RenderTarget,
    commands: Vec<Command>,
    transients: HostBuffer,
}

impl RenderPass {
    pub fn new(render_target: RenderTarget, max_host_buffer_size: usize) -> Self {
        Self {
            label: render_target.label().to_string(),
            render_target,
            commands: Vec::new(),
            transients: HostBuffer::new(max_host_buffer_size),
        }
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn render_target(&self) -> &RenderTarget {
        &self.render_target
    }

    pub fn render_target_size(&self) -> ISize {
        self.render_target.render_target_size()
    }

    /// Maps pass pixel coordinates to clip space
    pub fn orthographic_transform(&self) -> Matrix {
        Matrix::orthographic(self.render_target_size().to_size())
    }

    pub fn transients_buffer(&mut self) -> &mut HostBuffer {
        &mut self.transients
    }

    pub fn transients(&self) -> &HostBuffer {
        &self.transients
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Check that `command` can be drawn into this pass
    pub fn validate_command(&self, command: &Command) -> Result<(), CommandRejection> {
        let pipeline = command.pipeline.as_ref().ok_or(CommandRejection::NoPipeline)?;
        if command.vertex_buffer.vertex_count == 0 {
            return Err(CommandRejection::NoVertices);
        }
        let desc = pipeline.descriptor();

        let pipeline_format = desc.legacy_compatible_color_format();
        let pass_format = self.render_target.color_format();
        if pipeline_format != pass_format {
            return Err(CommandRejection::ColorFormatMismatch {
                pipeline: pipeline_format,
                pass: pass_format,
            });
        }

        let pass_samples = self.render_target.sample_count();
        if desc.sample_count() != pass_samples {
            return Err(CommandRejection::SampleCountMismatch {
                pipeline: desc.sample_count(),
                pass: pass_samples,
            });
        }

        let pass_stencil = self.render_target.stencil_format();
        if desc.stencil_pixel_format() != pass_stencil {
            return Err(CommandRejection::StencilFormatMismatch {
                pipeline: desc.stencil_pixel_format(),
                pass: pass_stencil,
            });
        }
        Ok(())
    }

    /// Record a command. Returns false, leaving the pass unchanged, when the
    /// command has no pipeline, draws nothing, or its pipeline does not match
    /// the pass attachments.
    pub fn add_command(&mut self, command: Command) -> bool {
        match self.validate_command(&command) {
            Ok(()) => {
                self.commands.push(command);
                true
            }
            Err(CommandRejection::NoVertices) => false,
            Err(reason) => {
                tracing::warn!(
                    "render pass '{}' rejected command '{}': {:?}",
                    self.label,
                    command.label,
                    reason
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachments::ColorAttachmentDescriptor;
    use crate::backend::headless::HeadlessTexture;
    use crate::formats::BlendMode;
    use crate::pipeline::PipelineDescriptor;
    use crate::render_target::{Attachment, ColorAttachment};
    use crate::texture::TextureDescriptor;
    use kiln_core::Color;

    fn target(format: PixelFormat) -> RenderTarget {
        let texture = HeadlessTexture::new(
            TextureDescriptor::render_target(format, ISize::new(100, 50), 1),
            "color",
        );
        let mut target = RenderTarget::new();
        target.set_color_attachment(
            0,
            ColorAttachment {
                attachment: Attachment::new(Arc::new(texture)),
                clear_color: Color::TRANSPARENT,
            },
        );
        target
    }

    fn pipeline(format: PixelFormat) -> Arc<Pipeline> {
        let mut desc = PipelineDescriptor::new();
        desc.set_color_attachment_descriptor(
            0,
            ColorAttachmentDescriptor::from_blend_mode(BlendMode::SourceOver, format),
        );
        Arc::new(Pipeline::new(desc, ()))
    }

    fn drawable(pass: &mut RenderPass, format: PixelFormat) -> Command {
        let view = pass.transients_buffer().emplace_slice(&[[0.0f32; 2]; 3]).unwrap();
        let mut command = Command::new("triangle");
        command.pipeline = Some(pipeline(format));
        command.bind_vertices(VertexBuffer {
            vertex_buffer: Some(view),
            index_buffer: None,
            vertex_count: 3,
            index_type: Default::default(),
        });
        command
    }

    #[test]
    fn test_accepts_matching_command() {
        let mut pass = RenderPass::new(target(PixelFormat::R8G8B8A8UNormInt), 1024);
        let command = drawable(&mut pass, PixelFormat::R8G8B8A8UNormInt);
        assert!(pass.add_command(command));
        assert_eq!(pass.commands().len(), 1);
    }

    #[test]
    fn test_rejects_format_mismatch() {
        let mut pass = RenderPass::new(target(PixelFormat::R8G8B8A8UNormInt), 1024);
        let command = drawable(&mut pass, PixelFormat::B8G8R8A8UNormInt);
        assert!(matches!(
            pass.validate_command(&command),
            Err(CommandRejection::ColorFormatMismatch { .. })
        ));
        assert!(!pass.add_command(command));
        assert!(pass.commands().is_empty());
    }

    #[test]
    fn test_rejects_missing_pipeline_and_empty_draws() {
        let mut pass = RenderPass::new(target(PixelFormat::R8G8B8A8UNormInt), 1024);
        assert!(!pass.add_command(Command::new("no pipeline")));

        let mut empty = Command::new("empty");
        empty.pipeline = Some(pipeline(PixelFormat::R8G8B8A8UNormInt));
        assert_eq!(pass.validate_command(&empty), Err(CommandRejection::NoVertices));
        assert!(!pass.add_command(empty));
    }

    #[test]
    fn test_orthographic_maps_corners() {
        let pass = RenderPass::new(target(PixelFormat::R8G8B8A8UNormInt), 1024);
        let ortho = pass.orthographic_transform();
        let p = ortho.transform_point(kiln_core::Point::new(100.0, 50.0));
        assert!((p.x - 1.0).abs() < 1e-6);
        assert!((p.y + 1.0).abs() < 1e-6);
    }
}
