//! A drawable unit: transform, path, contents and the state needed to encode
//! it into a render pass

use std::sync::Arc;

use kiln_core::{Color, Matrix, Path, Rect};
use kiln_renderer::{BlendMode, RenderPass};

use crate::content_context::ContentContext;
use crate::contents::Contents;
use crate::geometry::Geometry;
use crate::tessellator::StrokeStyle;

#[derive(Clone, Debug)]
pub struct Entity {
    transform: Matrix,
    background_color: Color,
    stroke_color: Color,
    stroke_size: f32,
    path: Arc<Path>,
    is_clip: bool,
    contents: Option<Contents>,
    blend_mode: BlendMode,
    stencil_depth: u32,
}

impl Default for Entity {
    fn default() -> Self {
        Self {
            transform: Matrix::IDENTITY,
            background_color: Color::TRANSPARENT,
            stroke_color: Color::TRANSPARENT,
            stroke_size: 0.0,
            path: Arc::new(Path::new()),
            is_clip: false,
            contents: None,
            blend_mode: BlendMode::SourceOver,
            stencil_depth: 0,
        }
    }
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> &Matrix {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Matrix) {
        self.transform = transform;
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
    }

    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.stroke_color = color;
    }

    pub fn stroke_size(&self) -> f32 {
        self.stroke_size
    }

    /// Negative sizes clamp to zero
    pub fn set_stroke_size(&mut self, size: f32) {
        self.stroke_size = size.max(0.0);
    }

    pub fn path(&self) -> &Arc<Path> {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<Arc<Path>>) {
        self.path = path.into();
    }

    pub fn is_clip(&self) -> bool {
        self.is_clip
    }

    pub fn set_is_clip(&mut self, is_clip: bool) {
        self.is_clip = is_clip;
    }

    pub fn contents(&self) -> Option<&Contents> {
        self.contents.as_ref()
    }

    pub fn set_contents(&mut self, contents: Option<Contents>) {
        self.contents = contents;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    pub fn stencil_depth(&self) -> u32 {
        self.stencil_depth
    }

    pub fn set_stencil_depth(&mut self, depth: u32) {
        self.stencil_depth = depth;
    }

    pub fn increment_stencil_depth(&mut self, increment: u32) {
        self.stencil_depth = self.stencil_depth.saturating_add(increment);
    }

    pub fn has_stroke(&self) -> bool {
        self.stroke_size > 0.0 && !self.stroke_color.is_transparent()
    }

    /// True when explicit contents are set or the background is visible
    pub fn has_contents(&self) -> bool {
        self.contents.is_some() || !self.background_color.is_transparent()
    }

    pub fn has_renderable_contents(&self) -> bool {
        let has_empty_path = self.path.bounding_box().map_or(true, |b| b.size.is_empty());
        if has_empty_path {
            return false;
        }
        self.is_clip || self.has_stroke() || self.has_contents()
    }

    /// Device-space bounds of what this entity draws. Clips draw nothing.
    pub fn coverage(&self) -> Option<Rect> {
        if let Some(contents) = &self.contents {
            return contents.coverage(self);
        }
        if self.is_clip {
            return None;
        }
        let bounds = self.path.bounding_box()?;
        let outset = if self.has_stroke() { self.stroke_size * 0.5 } else { 0.0 };
        Some(bounds.expand(outset).transform_bounds(&self.transform))
    }

    /// Encode this entity into `pass`. Returns false if a command could not
    /// be recorded.
    pub fn render(&self, renderer: &ContentContext, pass: &mut RenderPass) -> bool {
        if let Some(contents) = &self.contents {
            return contents.render(renderer, self, pass);
        }

        if self.is_clip {
            return Contents::clip(Geometry::fill_path(Arc::clone(&self.path))).render(renderer, self, pass);
        }

        let mut success = true;
        if !self.background_color.is_transparent() {
            success &= Contents::solid_color(
                self.background_color,
                Geometry::fill_path(Arc::clone(&self.path)),
            )
            .render(renderer, self, pass);
        }
        if self.has_stroke() {
            success &= Contents::solid_stroke(self.stroke_color, StrokeStyle::new(self.stroke_size))
                .render(renderer, self, pass);
        }
        success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Point;

    fn square() -> Path {
        Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn test_stroke_size_clamps() {
        let mut entity = Entity::new();
        entity.set_stroke_size(-3.0);
        assert_eq!(entity.stroke_size(), 0.0);
        entity.set_stroke_size(2.5);
        assert_eq!(entity.stroke_size(), 2.5);
    }

    #[test]
    fn test_has_stroke_needs_size_and_color() {
        let mut entity = Entity::new();
        entity.set_stroke_size(2.0);
        assert!(!entity.has_stroke());
        entity.set_stroke_color(Color::BLACK);
        assert!(entity.has_stroke());
    }

    #[test]
    fn test_empty_path_is_never_renderable() {
        let mut entity = Entity::new();
        entity.set_is_clip(true);
        entity.set_background_color(Color::RED);
        assert!(!entity.has_renderable_contents());

        let mut line = kiln_core::PathBuilder::new();
        line.move_to(Point::new(0.0, 0.0)).line_to(Point::new(10.0, 0.0));
        entity.set_path(line.build());
        assert!(!entity.has_renderable_contents());
    }

    #[test]
    fn test_renderable_contents() {
        let mut entity = Entity::new();
        entity.set_path(square());
        assert!(!entity.has_renderable_contents());

        entity.set_is_clip(true);
        assert!(entity.has_renderable_contents());
        entity.set_is_clip(false);

        entity.set_stroke_size(1.0);
        entity.set_stroke_color(Color::BLUE);
        assert!(entity.has_renderable_contents());
        entity.set_stroke_size(0.0);

        entity.set_background_color(Color::GREEN);
        assert!(entity.has_contents());
        assert!(entity.has_renderable_contents());
    }

    #[test]
    fn test_coverage_follows_transform() {
        let mut entity = Entity::new();
        entity.set_path(square());
        entity.set_background_color(Color::RED);
        entity.set_transform(Matrix::translation(5.0, 5.0, 0.0));
        assert_eq!(entity.coverage(), Some(Rect::new(5.0, 5.0, 10.0, 10.0)));

        entity.set_is_clip(true);
        assert_eq!(entity.coverage(), None);
    }
}
