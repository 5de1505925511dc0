//! Geometry: the shape an entity's contents are drawn through
//!
//! A [`Geometry`] turns itself into vertices for a particular entity and render
//! pass. The result carries the primitive type, the full clip-space transform
//! and a [`ResultMode`] saying whether the vertices can be drawn directly or
//! need a stencil-then-cover pair.

use std::sync::Arc;

use kiln_core::{FillType, Matrix, Path, PathBuilder, Point, Rect, Size};
use kiln_renderer::{HostBuffer, PrimitiveType, RenderPass, VertexBuffer, VertexBufferBuilder};

use crate::content_context::ContentContext;
use crate::entity::Entity;
use crate::primitives::{SolidVertex, TextureVertex};
use crate::tessellator::{StrokeStyle, TessellatedMesh};

/// Coverage reported by geometry that fills the whole pass
pub const MAXIMUM_COVERAGE: Rect = Rect::new(-1.0e18, -1.0e18, 2.0e18, 2.0e18);

/// How a [`GeometryResult`] has to be drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResultMode {
    /// Vertices cover exactly the shape
    #[default]
    Normal,
    /// Vertices count winding; cover where the count is non-zero
    NonZero,
    /// Vertices count winding; cover where the count is odd
    EvenOdd,
}

/// Vertices of a geometry for one draw
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryResult {
    pub primitive_type: PrimitiveType,
    pub vertex_buffer: VertexBuffer,
    /// Pass orthographic projection times the entity transform
    pub transform: Matrix,
    pub mode: ResultMode,
}

impl GeometryResult {
    fn empty(transform: Matrix) -> Self {
        Self {
            primitive_type: PrimitiveType::Triangle,
            vertex_buffer: VertexBuffer::empty(),
            transform,
            mode: ResultMode::Normal,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Geometry {
    /// Fill of an arbitrary path. `inner_rect`, when known, is a rect the
    /// fill is guaranteed to cover.
    FillPath {
        path: Arc<Path>,
        inner_rect: Option<Rect>,
    },
    RoundRect {
        rect: Rect,
        radii: Size,
    },
    Rect(Rect),
    StrokePath {
        path: Arc<Path>,
        style: StrokeStyle,
    },
    /// Every pixel of the pass
    Cover,
}

impl Geometry {
    pub fn fill_path(path: impl Into<Arc<Path>>) -> Self {
        Geometry::FillPath {
            path: path.into(),
            inner_rect: None,
        }
    }

    pub fn fill_path_with_inner_rect(path: impl Into<Arc<Path>>, inner_rect: Rect) -> Self {
        Geometry::FillPath {
            path: path.into(),
            inner_rect: Some(inner_rect),
        }
    }

    pub fn stroke_path(path: impl Into<Arc<Path>>, style: StrokeStyle) -> Self {
        Geometry::StrokePath {
            path: path.into(),
            style,
        }
    }

    pub fn rect(rect: Rect) -> Self {
        Geometry::Rect(rect)
    }

    pub fn round_rect(rect: Rect, radii: Size) -> Self {
        Geometry::RoundRect { rect, radii }
    }

    pub fn cover() -> Self {
        Geometry::Cover
    }

    /// Vertices of this geometry drawn by `entity` into `pass`
    pub fn get_position_buffer(
        &self,
        renderer: &ContentContext,
        entity: &Entity,
        pass: &mut RenderPass,
    ) -> GeometryResult {
        let transform = pass.orthographic_transform() * *entity.transform();
        let approximation = renderer.smoothing_approximation(entity.transform());

        match self {
            Geometry::FillPath { path, .. } => {
                if !has_area(path) {
                    return GeometryResult::empty(transform);
                }
                let tessellator = renderer.tessellator();
                if path.is_convex() || uses_stencil_then_cover(renderer, entity, pass) {
                    let vertex_buffer =
                        tessellator.tessellate_convex(path, pass.transients_buffer(), approximation);
                    return GeometryResult {
                        primitive_type: PrimitiveType::TriangleStrip,
                        vertex_buffer,
                        transform,
                        mode: self.get_result_mode(),
                    };
                }
                match tessellator.tessellate_fill(path, approximation) {
                    Ok(mesh) => mesh_result(&mesh, pass.transients_buffer(), transform),
                    Err(err) => {
                        tracing::warn!("Path fill tessellation failed: {}", err);
                        GeometryResult::empty(transform)
                    }
                }
            }
            Geometry::RoundRect { rect, radii } => {
                if rect.is_empty() {
                    return GeometryResult::empty(transform);
                }
                let path = PathBuilder::new()
                    .add_round_rect(*rect, *radii)
                    .take_path(FillType::NonZero);
                let vertex_buffer = renderer.tessellator().tessellate_convex(
                    &path,
                    pass.transients_buffer(),
                    approximation,
                );
                GeometryResult {
                    primitive_type: PrimitiveType::TriangleStrip,
                    vertex_buffer,
                    transform,
                    mode: ResultMode::Normal,
                }
            }
            Geometry::Rect(rect) => {
                strip_result(*rect, pass.transients_buffer(), transform)
            }
            Geometry::StrokePath { path, style } => {
                match renderer.tessellator().tessellate_stroke(path, style, approximation.scale) {
                    Ok(mesh) => mesh_result(&mesh, pass.transients_buffer(), transform),
                    Err(_) => GeometryResult::empty(transform),
                }
            }
            Geometry::Cover => {
                let bounds = pass.render_target_size().to_size().to_rect();
                let ortho = pass.orthographic_transform();
                strip_result(bounds, pass.transients_buffer(), ortho)
            }
        }
    }

    /// Vertices with texture coordinates. Each position is mapped through
    /// `effect_transform` and then into the unit square of
    /// `texture_coverage`. Always drawn in [`ResultMode::Normal`].
    pub fn get_position_uv_buffer(
        &self,
        texture_coverage: Rect,
        effect_transform: &Matrix,
        renderer: &ContentContext,
        entity: &Entity,
        pass: &mut RenderPass,
    ) -> GeometryResult {
        let transform = pass.orthographic_transform() * *entity.transform();
        let uv_transform = texture_coverage.normalizing_transform() * *effect_transform;
        let approximation = renderer.smoothing_approximation(entity.transform());
        let tessellator = renderer.tessellator();

        let strip = |path: &Path, host: &mut HostBuffer| GeometryResult {
            primitive_type: PrimitiveType::TriangleStrip,
            vertex_buffer: tessellator.tessellate_convex_uv(path, host, approximation, &uv_transform),
            transform,
            mode: ResultMode::Normal,
        };

        match self {
            Geometry::FillPath { path, .. } => {
                if !has_area(path) {
                    return GeometryResult::empty(transform);
                }
                if path.is_convex() {
                    return strip(path, pass.transients_buffer());
                }
                match tessellator.tessellate_fill(path, approximation) {
                    Ok(mesh) => mesh_uv_result(&mesh, &uv_transform, pass.transients_buffer(), transform),
                    Err(err) => {
                        tracing::warn!("Path fill tessellation failed: {}", err);
                        GeometryResult::empty(transform)
                    }
                }
            }
            Geometry::RoundRect { rect, .. } | Geometry::Rect(rect) if rect.is_empty() => {
                GeometryResult::empty(transform)
            }
            Geometry::RoundRect { rect, radii } => {
                let path = PathBuilder::new()
                    .add_round_rect(*rect, *radii)
                    .take_path(FillType::NonZero);
                strip(&path, pass.transients_buffer())
            }
            Geometry::Rect(rect) => strip(&Path::rect(*rect), pass.transients_buffer()),
            Geometry::StrokePath { path, style } => {
                match tessellator.tessellate_stroke(path, style, approximation.scale) {
                    Ok(mesh) => mesh_uv_result(&mesh, &uv_transform, pass.transients_buffer(), transform),
                    Err(_) => GeometryResult::empty(transform),
                }
            }
            Geometry::Cover => {
                let bounds = pass.render_target_size().to_size().to_rect();
                let mut result = strip(&Path::rect(bounds), pass.transients_buffer());
                result.transform = pass.orthographic_transform();
                result
            }
        }
    }

    /// Draw mode of a stencil-then-cover fill of this geometry. Convex paths
    /// and paths enclosing nothing are always [`ResultMode::Normal`].
    pub fn get_result_mode(&self) -> ResultMode {
        match self {
            Geometry::FillPath { path, .. } => {
                if path.is_convex() || !has_area(path) {
                    return ResultMode::Normal;
                }
                match path.fill_type() {
                    FillType::NonZero => ResultMode::NonZero,
                    FillType::Odd => ResultMode::EvenOdd,
                }
            }
            _ => ResultMode::Normal,
        }
    }

    /// Bounds of what this geometry touches under `transform`
    pub fn get_coverage(&self, transform: &Matrix) -> Option<Rect> {
        match self {
            Geometry::FillPath { path, .. } => path.transformed_bounding_box(transform),
            Geometry::RoundRect { rect, .. } | Geometry::Rect(rect) => {
                Some(rect.transform_bounds(transform))
            }
            Geometry::StrokePath { path, style } => path
                .bounding_box()
                .map(|bounds| bounds.expand(style.outset()).transform_bounds(transform)),
            Geometry::Cover => Some(MAXIMUM_COVERAGE),
        }
    }

    /// Whether drawing this geometry under `transform` is guaranteed to
    /// cover every pixel of `rect`
    pub fn covers_area(&self, transform: &Matrix, rect: &Rect) -> bool {
        let inner_covers = |inner: &Rect| {
            transform.is_translation_scale_only() && inner.transform_bounds(transform).contains_rect(rect)
        };
        match self {
            Geometry::FillPath { inner_rect, .. } => inner_rect.as_ref().is_some_and(inner_covers),
            Geometry::Rect(r) => inner_covers(r),
            Geometry::RoundRect { rect: r, radii } => {
                let rx = radii.width.clamp(0.0, r.width() / 2.0);
                let ry = radii.height.clamp(0.0, r.height() / 2.0);
                let wide = Rect::from_ltrb(r.left(), r.top() + ry, r.right(), r.bottom() - ry);
                let tall = Rect::from_ltrb(r.left() + rx, r.top(), r.right() - rx, r.bottom());
                inner_covers(&wide) || inner_covers(&tall)
            }
            Geometry::StrokePath { .. } => false,
            Geometry::Cover => true,
        }
    }

    pub fn is_axis_aligned_rect(&self) -> bool {
        matches!(self, Geometry::Rect(_))
    }
}

fn has_area(path: &Path) -> bool {
    path.bounding_box().is_some_and(|b| !b.is_empty())
}

fn uses_stencil_then_cover(renderer: &ContentContext, entity: &Entity, pass: &RenderPass) -> bool {
    renderer.config().stencil_then_cover
        && pass.render_target().stencil_format().is_stencil()
        && entity.stencil_depth() == 0
        && !entity.is_clip()
}

fn strip_result(rect: Rect, host: &mut HostBuffer, transform: Matrix) -> GeometryResult {
    if rect.is_empty() {
        return GeometryResult::empty(transform);
    }
    let [tl, tr, br, bl] = rect.points();
    let mut builder = VertexBufferBuilder::<SolidVertex>::new();
    builder.add_vertices([tl, tr, bl, br].map(SolidVertex::new));
    GeometryResult {
        primitive_type: PrimitiveType::TriangleStrip,
        vertex_buffer: builder.create_vertex_buffer(host).unwrap_or_default(),
        transform,
        mode: ResultMode::Normal,
    }
}

fn mesh_result(mesh: &TessellatedMesh, host: &mut HostBuffer, transform: Matrix) -> GeometryResult {
    GeometryResult {
        primitive_type: PrimitiveType::Triangle,
        vertex_buffer: mesh.create_vertex_buffer(host).unwrap_or_default(),
        transform,
        mode: ResultMode::Normal,
    }
}

fn mesh_uv_result(
    mesh: &TessellatedMesh,
    uv_transform: &Matrix,
    host: &mut HostBuffer,
    transform: Matrix,
) -> GeometryResult {
    let mut builder = VertexBufferBuilder::<TextureVertex>::new();
    builder.add_vertices(mesh.vertices.iter().map(|&[x, y]| TextureVertex {
        position: [x, y],
        texture_coords: uv_transform.transform_point(Point::new(x, y)).to_array(),
    }));
    for &index in &mesh.indices {
        builder.append_index(index);
    }
    GeometryResult {
        primitive_type: PrimitiveType::Triangle,
        vertex_buffer: builder.create_vertex_buffer(host).unwrap_or_default(),
        transform,
        mode: ResultMode::Normal,
    }
}
