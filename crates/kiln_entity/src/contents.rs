//! What an entity draws
//!
//! Every variant records its commands into the render pass it is given and
//! reports whether that succeeded. Draws test the stencil buffer against the
//! entity's stencil depth, so clips recorded earlier at a shallower depth
//! mask them.

use std::sync::Arc;

use kiln_core::{Color, ColorMatrix, Matrix, Rect};
use kiln_renderer::{
    BlendMode, BufferView, Command, CompareFunction, PrimitiveType, RenderPass, StencilOperation,
    Texture, VertexBuffer,
};

use crate::content_context::{ContentContext, ContentContextOptions, PipelineKind};
use crate::entity::Entity;
use crate::geometry::{Geometry, GeometryResult, ResultMode};
use crate::primitives::{ColorMatrixFragInfo, FrameInfo, SolidFragInfo, TextureFragInfo};
use crate::shaders::slots;
use crate::tessellator::StrokeStyle;

#[derive(Clone, Debug)]
pub enum Contents {
    SolidColor(SolidColorContents),
    SolidStroke(SolidStrokeContents),
    Texture(TextureContents),
    Filter(FilterContents),
    Clip(ClipContents),
    ClipRestore(ClipRestoreContents),
}

impl Contents {
    pub fn solid_color(color: Color, geometry: Geometry) -> Self {
        Contents::SolidColor(SolidColorContents { color, geometry })
    }

    pub fn solid_stroke(color: Color, style: StrokeStyle) -> Self {
        Contents::SolidStroke(SolidStrokeContents { color, style })
    }

    pub fn texture(texture: Arc<dyn Texture>) -> Self {
        Contents::Texture(TextureContents::new(texture))
    }

    pub fn clip(geometry: Geometry) -> Self {
        Contents::Clip(ClipContents { geometry })
    }

    pub fn clip_restore() -> Self {
        Contents::ClipRestore(ClipRestoreContents)
    }

    pub fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        match self {
            Contents::SolidColor(c) => c.render(renderer, entity, pass),
            Contents::SolidStroke(c) => c.render(renderer, entity, pass),
            Contents::Texture(c) => c.render(renderer, entity, pass),
            Contents::Filter(c) => c.render(renderer, entity, pass),
            Contents::Clip(c) => c.render(renderer, entity, pass),
            Contents::ClipRestore(c) => c.render(renderer, entity, pass),
        }
    }

    /// Device-space bounds of the pixels this contents colors
    pub fn coverage(&self, entity: &Entity) -> Option<Rect> {
        match self {
            Contents::SolidColor(c) => c.geometry.get_coverage(entity.transform()),
            Contents::SolidStroke(c) => {
                Geometry::stroke_path(Arc::clone(entity.path()), c.style).get_coverage(entity.transform())
            }
            Contents::Texture(_) => entity.path().transformed_bounding_box(entity.transform()),
            Contents::Filter(c) => c.coverage(entity.transform()),
            Contents::Clip(_) | Contents::ClipRestore(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command encoding
// ─────────────────────────────────────────────────────────────────────────────

struct Draw<'a> {
    label: &'a str,
    kind: PipelineKind,
    options: ContentContextOptions,
    vertex_buffer: VertexBuffer,
    stencil_reference: u32,
}

fn emplace_uniforms<F: bytemuck::Pod>(
    pass: &mut RenderPass,
    transform: &Matrix,
    frag: &F,
) -> Option<(BufferView, BufferView)> {
    let host = pass.transients_buffer();
    let frame = host.emplace_uniform(&FrameInfo::new(transform))?;
    let frag = host.emplace_uniform(frag)?;
    Some((frame, frag))
}

fn encode_solid(
    renderer: &ContentContext,
    pass: &mut RenderPass,
    draw: Draw<'_>,
    transform: &Matrix,
    color: Color,
) -> bool {
    let Some(pipeline) = renderer.get_pipeline(draw.kind, draw.options) else {
        return false;
    };
    let Some((frame, frag)) = emplace_uniforms(pass, transform, &SolidFragInfo::new(color)) else {
        tracing::warn!("host buffer full, dropping '{}'", draw.label);
        return false;
    };

    let mut command = Command::new(draw.label);
    command.pipeline = Some(pipeline);
    command.stencil_reference = draw.stencil_reference;
    command.primitive_type = draw.options.primitive_type;
    command
        .bind_vertices(draw.vertex_buffer)
        .bind_vertex_uniform(slots::FRAME_INFO, frame)
        .bind_fragment_uniform(slots::FRAG_INFO, frag);
    pass.add_command(command)
}

fn encode_texture<F: bytemuck::Pod>(
    renderer: &ContentContext,
    pass: &mut RenderPass,
    draw: Draw<'_>,
    transform: &Matrix,
    frag: &F,
    texture: &Arc<dyn Texture>,
) -> bool {
    let Some(pipeline) = renderer.get_pipeline(draw.kind, draw.options) else {
        return false;
    };
    let Some((frame, frag)) = emplace_uniforms(pass, transform, frag) else {
        tracing::warn!("host buffer full, dropping '{}'", draw.label);
        return false;
    };

    let mut command = Command::new(draw.label);
    command.pipeline = Some(pipeline);
    command.stencil_reference = draw.stencil_reference;
    command.primitive_type = draw.options.primitive_type;
    command
        .bind_vertices(draw.vertex_buffer)
        .bind_vertex_uniform(slots::FRAME_INFO, frame)
        .bind_fragment_uniform(slots::FRAG_INFO, frag)
        .bind_texture(slots::TEXTURE, Arc::clone(texture));
    pass.add_command(command)
}

/// Where the whole of `texture` lands when its `source_rect` is stretched
/// over `destination`. `None` when either is empty.
fn texture_coverage(texture: &dyn Texture, source_rect: &Rect, destination: &Rect) -> Option<Rect> {
    let size = texture.size().to_size();
    if source_rect.is_empty() || size.is_empty() || destination.is_empty() {
        return None;
    }
    let sx = destination.width() / source_rect.width();
    let sy = destination.height() / source_rect.height();
    Some(Rect::new(
        destination.left() - source_rect.left() * sx,
        destination.top() - source_rect.top() * sy,
        size.width * sx,
        size.height * sy,
    ))
}

fn draw_options(pass: &RenderPass, entity: &Entity, result: &GeometryResult) -> ContentContextOptions {
    ContentContextOptions::for_pass(pass)
        .with_primitive_type(result.primitive_type)
        .with_blend_mode(entity.blend_mode())
}

// ─────────────────────────────────────────────────────────────────────────────
// Solid color
// ─────────────────────────────────────────────────────────────────────────────

/// Fills a geometry with one color
#[derive(Clone, Debug)]
pub struct SolidColorContents {
    pub color: Color,
    pub geometry: Geometry,
}

impl SolidColorContents {
    fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        let result = self.geometry.get_position_buffer(renderer, entity, pass);
        if result.vertex_buffer.is_empty() {
            return true;
        }
        let options = draw_options(pass, entity, &result);

        if result.mode == ResultMode::Normal {
            return encode_solid(
                renderer,
                pass,
                Draw {
                    label: "Solid Fill",
                    kind: PipelineKind::SolidFill,
                    options,
                    vertex_buffer: result.vertex_buffer,
                    stencil_reference: entity.stencil_depth(),
                },
                &result.transform,
                self.color,
            );
        }

        // Stencil: count winding with no color writes
        let stenciled = encode_solid(
            renderer,
            pass,
            Draw {
                label: "Stencil Fill",
                kind: PipelineKind::StencilFill,
                options: options.with_stencil(CompareFunction::Always, StencilOperation::IncrementWrap),
                vertex_buffer: result.vertex_buffer,
                stencil_reference: 0,
            },
            &result.transform,
            Color::TRANSPARENT,
        );
        if !stenciled {
            return false;
        }

        // Cover: color where the fill rule passes, and zero the count
        let Some(bounds) = self.geometry.get_coverage(&Matrix::IDENTITY) else {
            return true;
        };
        let cover = Geometry::rect(bounds).get_position_buffer(renderer, entity, pass);
        let mut cover_options = draw_options(pass, entity, &cover)
            .with_stencil(CompareFunction::NotEqual, StencilOperation::Zero);
        cover_options.stencil_failure = StencilOperation::Zero;
        if result.mode == ResultMode::EvenOdd {
            cover_options.stencil_read_mask = 1;
        }
        encode_solid(
            renderer,
            pass,
            Draw {
                label: "Cover Fill",
                kind: PipelineKind::SolidFill,
                options: cover_options,
                vertex_buffer: cover.vertex_buffer,
                stencil_reference: 0,
            },
            &cover.transform,
            self.color,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Solid stroke
// ─────────────────────────────────────────────────────────────────────────────

/// Strokes the entity's path with one color
#[derive(Clone, Debug)]
pub struct SolidStrokeContents {
    pub color: Color,
    pub style: StrokeStyle,
}

impl SolidStrokeContents {
    fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        let geometry = Geometry::stroke_path(Arc::clone(entity.path()), self.style);
        let result = geometry.get_position_buffer(renderer, entity, pass);
        if result.vertex_buffer.is_empty() {
            return true;
        }
        let options = draw_options(pass, entity, &result);
        encode_solid(
            renderer,
            pass,
            Draw {
                label: "Solid Stroke",
                kind: PipelineKind::SolidFill,
                options,
                vertex_buffer: result.vertex_buffer,
                stencil_reference: entity.stencil_depth(),
            },
            &result.transform,
            self.color,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Texture
// ─────────────────────────────────────────────────────────────────────────────

/// Draws `source_rect` of a texture into the bounds of the entity's path,
/// clipped to the path
#[derive(Clone, Debug)]
pub struct TextureContents {
    pub texture: Arc<dyn Texture>,
    /// Region of the texture in texels
    pub source_rect: Rect,
    pub opacity: f32,
}

impl TextureContents {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        let source_rect = texture.size().to_size().to_rect();
        Self {
            texture,
            source_rect,
            opacity: 1.0,
        }
    }

    pub fn with_source_rect(mut self, source_rect: Rect) -> Self {
        self.source_rect = source_rect;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    fn texture_coverage(&self, destination: &Rect) -> Option<Rect> {
        texture_coverage(self.texture.as_ref(), &self.source_rect, destination)
    }

    fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        if self.opacity <= 0.0 {
            return true;
        }
        let Some(destination) = entity.path().bounding_box().filter(|b| !b.is_empty()) else {
            return true;
        };
        let Some(coverage) = self.texture_coverage(&destination) else {
            return true;
        };

        let geometry = Geometry::fill_path(Arc::clone(entity.path()));
        let result =
            geometry.get_position_uv_buffer(coverage, &Matrix::IDENTITY, renderer, entity, pass);
        if result.vertex_buffer.is_empty() {
            return true;
        }

        encode_texture(
            renderer,
            pass,
            Draw {
                label: "Texture Fill",
                kind: PipelineKind::TextureFill,
                options: draw_options(pass, entity, &result),
                vertex_buffer: result.vertex_buffer,
                stencil_reference: entity.stencil_depth(),
            },
            &result.transform,
            &TextureFragInfo::new(self.opacity),
            &self.texture,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filters
// ─────────────────────────────────────────────────────────────────────────────

/// A texture fed into a filter
#[derive(Clone, Debug)]
pub struct FilterInput {
    pub texture: Arc<dyn Texture>,
    /// Region of the texture in texels
    pub source_rect: Rect,
    /// Where `source_rect` is drawn, before the entity transform
    pub destination: Rect,
}

impl FilterInput {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        let rect = texture.size().to_size().to_rect();
        Self {
            texture,
            source_rect: rect,
            destination: rect,
        }
    }

    pub fn with_source_rect(mut self, source_rect: Rect) -> Self {
        self.source_rect = source_rect;
        self
    }

    pub fn with_destination(mut self, destination: Rect) -> Self {
        self.destination = destination;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterKind {
    /// Inputs drawn in order, each after the first blended onto the ones
    /// before it with this mode
    Blend(BlendMode),
    /// The first input with its colors transformed
    ColorMatrix(ColorMatrix),
}

/// Combines subpass textures into the pass. Draws nothing outside the
/// destinations of its inputs, so the entity's path only has to be
/// non-empty.
#[derive(Clone, Debug)]
pub struct FilterContents {
    pub kind: FilterKind,
    inputs: Vec<FilterInput>,
    pub opacity: f32,
}

impl FilterContents {
    pub fn blend(mode: BlendMode, inputs: Vec<FilterInput>) -> Self {
        Self {
            kind: FilterKind::Blend(mode),
            inputs,
            opacity: 1.0,
        }
    }

    pub fn color_matrix(matrix: ColorMatrix, input: FilterInput) -> Self {
        Self {
            kind: FilterKind::ColorMatrix(matrix),
            inputs: vec![input],
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Inputs this filter actually reads
    pub fn inputs(&self) -> &[FilterInput] {
        match self.kind {
            FilterKind::Blend(_) => &self.inputs,
            FilterKind::ColorMatrix(_) => &self.inputs[..self.inputs.len().min(1)],
        }
    }

    /// Union of the input destinations under `transform`
    pub fn coverage(&self, transform: &Matrix) -> Option<Rect> {
        self.inputs()
            .iter()
            .filter(|input| !input.destination.is_empty())
            .map(|input| input.destination.transform_bounds(transform))
            .reduce(|a, b| a.union(&b))
    }

    fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        if self.opacity <= 0.0 {
            return true;
        }
        let mut success = true;
        for (index, input) in self.inputs().iter().enumerate() {
            success &= match self.kind {
                FilterKind::Blend(mode) => {
                    let blend_mode = if index == 0 { entity.blend_mode() } else { mode };
                    self.draw_input(
                        renderer,
                        entity,
                        pass,
                        input,
                        ("Blend Filter", PipelineKind::TextureFill, blend_mode),
                        &TextureFragInfo::new(self.opacity),
                    )
                }
                FilterKind::ColorMatrix(matrix) => self.draw_input(
                    renderer,
                    entity,
                    pass,
                    input,
                    ("Color Matrix Filter", PipelineKind::ColorMatrixFilter, entity.blend_mode()),
                    &ColorMatrixFragInfo::new(&matrix, self.opacity),
                ),
            };
        }
        success
    }

    fn draw_input<F: bytemuck::Pod>(
        &self,
        renderer: &ContentContext,
        entity: &Entity,
        pass: &mut RenderPass,
        input: &FilterInput,
        (label, kind, blend_mode): (&str, PipelineKind, BlendMode),
        frag: &F,
    ) -> bool {
        let Some(coverage) =
            texture_coverage(input.texture.as_ref(), &input.source_rect, &input.destination)
        else {
            return true;
        };
        let result = Geometry::rect(input.destination).get_position_uv_buffer(
            coverage,
            &Matrix::IDENTITY,
            renderer,
            entity,
            pass,
        );
        if result.vertex_buffer.is_empty() {
            return true;
        }
        let options = ContentContextOptions::for_pass(pass)
            .with_primitive_type(result.primitive_type)
            .with_blend_mode(blend_mode);
        encode_texture(
            renderer,
            pass,
            Draw {
                label,
                kind,
                options,
                vertex_buffer: result.vertex_buffer,
                stencil_reference: entity.stencil_depth(),
            },
            &result.transform,
            frag,
            &input.texture,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clips
// ─────────────────────────────────────────────────────────────────────────────

/// Raises the stencil from the entity's depth to the next one inside the
/// geometry
#[derive(Clone, Debug)]
pub struct ClipContents {
    pub geometry: Geometry,
}

impl ClipContents {
    fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        if !pass.render_target().stencil_format().is_stencil() {
            tracing::warn!("render pass '{}' has no stencil attachment, clip dropped", pass.label());
            return false;
        }
        let result = self.geometry.get_position_buffer(renderer, entity, pass);
        if result.vertex_buffer.is_empty() {
            return true;
        }
        let options = draw_options(pass, entity, &result)
            .with_stencil(CompareFunction::Equal, StencilOperation::IncrementClamp);
        encode_solid(
            renderer,
            pass,
            Draw {
                label: "Clip",
                kind: PipelineKind::ClipWrite,
                options,
                vertex_buffer: result.vertex_buffer,
                stencil_reference: entity.stencil_depth(),
            },
            &result.transform,
            Color::TRANSPARENT,
        )
    }
}

/// Lowers the stencil back to the entity's depth over the entity's path
/// bounds, undoing deeper clips
#[derive(Clone, Copy, Debug, Default)]
pub struct ClipRestoreContents;

impl ClipRestoreContents {
    fn render(&self, renderer: &ContentContext, entity: &Entity, pass: &mut RenderPass) -> bool {
        if !pass.render_target().stencil_format().is_stencil() {
            return true;
        }
        let Some(bounds) = entity.path().bounding_box() else {
            return true;
        };
        let result = Geometry::rect(bounds).get_position_buffer(renderer, entity, pass);
        if result.vertex_buffer.is_empty() {
            return true;
        }
        let options = ContentContextOptions::for_pass(pass)
            .with_primitive_type(PrimitiveType::TriangleStrip)
            .with_stencil(CompareFunction::Less, StencilOperation::SetToReferenceValue);
        encode_solid(
            renderer,
            pass,
            Draw {
                label: "Restore Clip",
                kind: PipelineKind::ClipWrite,
                options,
                vertex_buffer: result.vertex_buffer,
                stencil_reference: entity.stencil_depth(),
            },
            &result.transform,
            Color::TRANSPARENT,
        )
    }
}
