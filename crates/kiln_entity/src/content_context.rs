//! Shared rendering state for contents: pipelines, tessellator, config

use std::sync::Arc;

use kiln_core::{Matrix, SmoothingApproximation};
use kiln_renderer::{
    BlendMode, ColorAttachmentDescriptor, ColorWriteMask, CompareFunction, Context, Pipeline,
    PipelineDescriptor, PixelFormat, PrimitiveType, RenderPass, RendererConfig, ShaderFunction,
    ShaderStage, StencilAttachmentDescriptor, StencilOperation,
};

use crate::primitives::{SolidVertex, TextureVertex};
use crate::shaders;
use crate::tessellator::Tessellator;

/// The pipelines contents can ask for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Flat color
    SolidFill,
    /// Sampled texture with opacity
    TextureFill,
    /// Winding count into the stencil buffer, no color writes
    StencilFill,
    /// Clip depth into the stencil buffer, no color writes
    ClipWrite,
    /// Sampled texture through a color matrix
    ColorMatrixFilter,
}

impl PipelineKind {
    fn library_id(self) -> &'static str {
        match self {
            PipelineKind::TextureFill => shaders::TEXTURE_FILL,
            PipelineKind::ColorMatrixFilter => shaders::COLOR_MATRIX_FILTER,
            _ => shaders::SOLID_FILL,
        }
    }

    fn writes_color(self) -> bool {
        !matches!(self, PipelineKind::StencilFill | PipelineKind::ClipWrite)
    }

    fn samples_texture(self) -> bool {
        matches!(self, PipelineKind::TextureFill | PipelineKind::ColorMatrixFilter)
    }
}

/// Per-draw pipeline variations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentContextOptions {
    pub sample_count: u32,
    pub blend_mode: BlendMode,
    pub stencil_compare: CompareFunction,
    pub stencil_operation: StencilOperation,
    /// Applied to fragments failing the stencil test
    pub stencil_failure: StencilOperation,
    pub stencil_read_mask: u32,
    pub color_format: PixelFormat,
    pub stencil_format: PixelFormat,
    pub primitive_type: PrimitiveType,
}

impl Default for ContentContextOptions {
    fn default() -> Self {
        Self {
            sample_count: 1,
            blend_mode: BlendMode::SourceOver,
            stencil_compare: CompareFunction::Equal,
            stencil_operation: StencilOperation::Keep,
            stencil_failure: StencilOperation::Keep,
            stencil_read_mask: !0,
            color_format: PixelFormat::R8G8B8A8UNormInt,
            stencil_format: PixelFormat::Unknown,
            primitive_type: PrimitiveType::Triangle,
        }
    }
}

impl ContentContextOptions {
    /// Options matching the attachments of `pass`
    pub fn for_pass(pass: &RenderPass) -> Self {
        let target = pass.render_target();
        Self {
            sample_count: target.sample_count(),
            color_format: target.color_format(),
            stencil_format: target.stencil_format(),
            ..Default::default()
        }
    }

    pub fn with_primitive_type(mut self, primitive_type: PrimitiveType) -> Self {
        self.primitive_type = primitive_type;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_stencil(mut self, compare: CompareFunction, operation: StencilOperation) -> Self {
        self.stencil_compare = compare;
        self.stencil_operation = operation;
        self
    }

    pub fn has_stencil(&self) -> bool {
        self.stencil_format.is_stencil()
    }

    pub fn apply_to_descriptor(&self, kind: PipelineKind, desc: &mut PipelineDescriptor) {
        let library = kind.library_id();
        let vertex_descriptor = if kind.samples_texture() {
            TextureVertex::descriptor()
        } else {
            SolidVertex::descriptor()
        };

        let mut color = ColorAttachmentDescriptor::from_blend_mode(self.blend_mode, self.color_format);
        if !kind.writes_color() {
            color.write_mask = ColorWriteMask::NONE;
        }

        desc.set_label(format!("{:?} Pipeline", kind))
            .set_sample_count(self.sample_count)
            .add_stage_entrypoint(ShaderFunction::new(library, shaders::VERTEX_ENTRY, ShaderStage::Vertex))
            .add_stage_entrypoint(ShaderFunction::new(
                library,
                shaders::FRAGMENT_ENTRY,
                ShaderStage::Fragment,
            ))
            .set_vertex_descriptor(vertex_descriptor)
            .set_color_attachment_descriptor(0, color)
            .set_primitive_type(self.primitive_type);

        if !self.has_stencil() {
            return;
        }

        let front = StencilAttachmentDescriptor {
            stencil_compare: self.stencil_compare,
            stencil_failure: self.stencil_failure,
            depth_stencil_pass: self.stencil_operation,
            read_mask: self.stencil_read_mask,
            ..Default::default()
        };
        // Back faces count winding the other way
        let back = match (kind, self.stencil_operation) {
            (PipelineKind::StencilFill, StencilOperation::IncrementWrap) => StencilAttachmentDescriptor {
                depth_stencil_pass: StencilOperation::DecrementWrap,
                ..front
            },
            _ => front,
        };
        desc.set_stencil_pixel_format(self.stencil_format)
            .set_stencil_attachment_descriptors_front_back(front, back);
    }
}

/// Everything contents need to turn an entity into commands
pub struct ContentContext {
    context: Arc<dyn Context>,
    tessellator: Tessellator,
    config: RendererConfig,
}

impl ContentContext {
    /// Wrap `context`, registering the built-in shaders with its library
    pub fn new(context: Arc<dyn Context>) -> Self {
        let library = context.shader_library();
        library.register(shaders::SOLID_FILL, shaders::SOLID_FILL_SHADER);
        library.register(shaders::TEXTURE_FILL, shaders::TEXTURE_FILL_SHADER);
        library.register(shaders::COLOR_MATRIX_FILTER, shaders::COLOR_MATRIX_FILTER_SHADER);
        let config = context.config().clone();
        Self {
            context,
            tessellator: Tessellator::new(),
            config,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.context.is_valid()
    }

    pub fn context(&self) -> &Arc<dyn Context> {
        &self.context
    }

    pub fn tessellator(&self) -> &Tessellator {
        &self.tessellator
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Curve flattening parameters for geometry drawn under `transform`
    pub fn smoothing_approximation(&self, transform: &Matrix) -> SmoothingApproximation {
        let scale = transform.max_basis_length_xy() * self.config.tessellation_scale;
        SmoothingApproximation::new(scale, self.config.angle_tolerance, self.config.cusp_limit)
    }

    pub fn get_pipeline(
        &self,
        kind: PipelineKind,
        options: ContentContextOptions,
    ) -> Option<Arc<Pipeline>> {
        let mut desc = PipelineDescriptor::new();
        options.apply_to_descriptor(kind, &mut desc);
        let pipeline = self.context.get_pipeline(&desc);
        if pipeline.is_none() {
            tracing::warn!("no pipeline for {:?} with {:?}", kind, options);
        }
        pipeline
    }
}

impl std::fmt::Debug for ContentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentContext")
            .field("tessellator", &self.tessellator)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_renderer::HeadlessContext;

    fn renderer() -> ContentContext {
        ContentContext::new(Arc::new(HeadlessContext::default()))
    }

    #[test]
    fn test_registers_shaders() {
        let renderer = renderer();
        let library = renderer.context().shader_library();
        assert!(library.contains(shaders::SOLID_FILL));
        assert!(library.contains(shaders::TEXTURE_FILL));
        assert!(library.contains(shaders::COLOR_MATRIX_FILTER));
    }

    #[test]
    fn test_color_matrix_filter_samples_texture() {
        let mut desc = PipelineDescriptor::new();
        ContentContextOptions::default().apply_to_descriptor(PipelineKind::ColorMatrixFilter, &mut desc);
        assert_eq!(desc.vertex_descriptor().unwrap().stride as usize, std::mem::size_of::<TextureVertex>());
        assert!(!desc.color_attachment_descriptor(0).unwrap().write_mask.is_empty());
        assert!(renderer()
            .get_pipeline(PipelineKind::ColorMatrixFilter, ContentContextOptions::default())
            .is_some());
    }

    #[test]
    fn test_same_options_share_pipeline() {
        let renderer = renderer();
        let options = ContentContextOptions::default();
        let a = renderer.get_pipeline(PipelineKind::SolidFill, options).unwrap();
        let b = renderer.get_pipeline(PipelineKind::SolidFill, options).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = renderer
            .get_pipeline(PipelineKind::SolidFill, options.with_blend_mode(BlendMode::Plus))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn test_stencil_fill_counts_back_faces_down() {
        let options = ContentContextOptions {
            stencil_format: PixelFormat::S8UInt,
            ..Default::default()
        }
        .with_stencil(CompareFunction::Always, StencilOperation::IncrementWrap);
        let mut desc = PipelineDescriptor::new();
        options.apply_to_descriptor(PipelineKind::StencilFill, &mut desc);

        let front = desc.front_stencil_attachment_descriptor().unwrap();
        let back = desc.back_stencil_attachment_descriptor().unwrap();
        assert_eq!(front.depth_stencil_pass, StencilOperation::IncrementWrap);
        assert_eq!(back.depth_stencil_pass, StencilOperation::DecrementWrap);
        assert!(desc.color_attachment_descriptor(0).unwrap().write_mask.is_empty());
        assert_eq!(desc.stencil_pixel_format(), PixelFormat::S8UInt);
    }

    #[test]
    fn test_no_stencil_state_without_stencil_format() {
        let mut desc = PipelineDescriptor::new();
        ContentContextOptions::default().apply_to_descriptor(PipelineKind::SolidFill, &mut desc);
        assert!(!desc.has_stencil_attachment_descriptors());
        assert_eq!(desc.stencil_pixel_format(), PixelFormat::Unknown);
    }

    #[test]
    fn test_smoothing_scales_with_transform() {
        let renderer = renderer();
        let approximation = renderer.smoothing_approximation(&Matrix::scale(3.0, 2.0, 1.0));
        assert_eq!(approximation.scale, 3.0);
    }

    #[test]
    fn test_larger_tessellation_scale_is_finer() {
        let config = RendererConfig {
            tessellation_scale: 4.0,
            ..Default::default()
        };
        let renderer = ContentContext::new(Arc::new(HeadlessContext::new(config)));
        let approximation = renderer.smoothing_approximation(&Matrix::scale(3.0, 2.0, 1.0));
        assert_eq!(approximation.scale, 12.0);
    }
}
