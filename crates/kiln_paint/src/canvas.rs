//! Canvas - records drawing operations against a graphics-state stack
//!
//! Nothing is tessellated or encoded while recording. Each draw becomes an
//! [`Entity`] carrying the current transform and stencil depth, and the
//! recording is realized when the finished [`Picture`] is rendered.
//!
//! Clips are stencil based: a clip raises the stencil inside its path by one
//! and bumps the depth later draws compare against. Restoring a level that
//! clipped records an entity that lowers the stencil again over the clipped
//! bounds.

use std::sync::Arc;

use kiln_core::{Color, Matrix, Path, PathBuilder, Point, Rect, Size};
use kiln_entity::{Contents, Entity, EntityPass, Geometry, MAXIMUM_COVERAGE};
use smallvec::{smallvec, SmallVec};

use crate::paint::{Paint, PaintStyle};
use crate::picture::Picture;

/// Translucent copies used to approximate a shadow's falloff
const SHADOW_STEPS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq)]
struct CanvasStackEntry {
    transform: Matrix,
    stencil_depth: u32,
    /// Opened by `save_layer`; restoring it closes a subpass
    is_subpass: bool,
    /// Device-space union of the clips recorded at this level
    clip_bounds: Option<Rect>,
}

impl Default for CanvasStackEntry {
    fn default() -> Self {
        Self {
            transform: Matrix::IDENTITY,
            stencil_depth: 0,
            is_subpass: false,
            clip_bounds: None,
        }
    }
}

#[derive(Debug)]
pub struct Canvas {
    stack: SmallVec<[CanvasStackEntry; 8]>,
    /// Open passes; the root first, one more per unrestored `save_layer`
    passes: Vec<EntityPass>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            stack: smallvec![CanvasStackEntry::default()],
            passes: vec![EntityPass::new()],
        }
    }

    fn top(&self) -> &CanvasStackEntry {
        // The base entry is never popped
        &self.stack[self.stack.len() - 1]
    }

    fn top_mut(&mut self) -> &mut CanvasStackEntry {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn current_pass(&mut self) -> &mut EntityPass {
        let last = self.passes.len() - 1;
        &mut self.passes[last]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State stack
    // ─────────────────────────────────────────────────────────────────────────

    pub fn save(&mut self) {
        let entry = CanvasStackEntry {
            is_subpass: false,
            clip_bounds: None,
            ..*self.top()
        };
        self.stack.push(entry);
    }

    /// Like [`save`](Self::save), but draws until the matching restore are
    /// composited as one group with the paint's opacity, blend mode and
    /// color filter.
    /// `bounds` limits the group in the current coordinate space.
    pub fn save_layer(&mut self, paint: &Paint, bounds: Option<Rect>) {
        self.save();
        let top = self.top_mut();
        top.is_subpass = true;
        let transform = top.transform;
        let depth = top.stencil_depth;

        let mut pass = EntityPass::new();
        pass.set_opacity(paint.color.a);
        pass.set_blend_mode(paint.blend_mode);
        pass.set_color_filter(paint.color_filter);
        pass.set_stencil_depth(depth);
        pass.set_bounds(bounds.map(|b| b.transform_bounds(&transform)));
        self.passes.push(pass);
    }

    /// Pop one level. Returns false, changing nothing, at the base level.
    pub fn restore(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        let Some(popped) = self.stack.pop() else {
            return false;
        };

        if popped.is_subpass {
            // Clips inside the layer lived in its own stencil
            if let Some(pass) = self.passes.pop() {
                self.current_pass().add_subpass(pass);
            }
            return true;
        }

        if let Some(clip_bounds) = popped.clip_bounds {
            let depth = self.top().stencil_depth;
            let mut entity = Entity::new();
            entity.set_path(Path::rect(clip_bounds));
            entity.set_stencil_depth(depth);
            entity.set_contents(Some(Contents::clip_restore()));
            self.current_pass().add_entity(entity);
        }
        true
    }

    /// Depth of the state stack; 1 with nothing saved
    pub fn get_save_count(&self) -> usize {
        self.stack.len()
    }

    /// Pop levels until the save count is `count`
    pub fn restore_to_count(&mut self, count: usize) {
        while self.get_save_count() > count.max(1) {
            self.restore();
        }
    }

    pub fn get_current_transformation(&self) -> Matrix {
        self.top().transform
    }

    pub fn stencil_depth(&self) -> u32 {
        self.top().stencil_depth
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transforms
    // ─────────────────────────────────────────────────────────────────────────

    /// Right-multiply `transform` onto the current transformation
    pub fn concat(&mut self, transform: &Matrix) {
        let top = self.top_mut();
        top.transform = top.transform.concat(transform);
    }

    pub fn transform(&mut self, transform: &Matrix) {
        self.concat(transform);
    }

    pub fn reset_transform(&mut self) {
        self.top_mut().transform = Matrix::IDENTITY;
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.concat(&Matrix::translation(dx, dy, 0.0));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.concat(&Matrix::scale(sx, sy, 1.0));
    }

    pub fn rotate(&mut self, radians: f32) {
        self.concat(&Matrix::rotation_z(radians));
    }

    pub fn skew(&mut self, sx: f32, sy: f32) {
        self.concat(&Matrix::skew(sx, sy));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Drawing
    // ─────────────────────────────────────────────────────────────────────────

    fn entity(&self, path: Arc<Path>) -> Entity {
        let top = self.top();
        let mut entity = Entity::new();
        entity.set_transform(top.transform);
        entity.set_stencil_depth(top.stencil_depth);
        entity.set_path(path);
        entity
    }

    fn add_drawing(&mut self, path: Path, paint: &Paint, fill: Option<Geometry>) {
        let path = Arc::new(path);
        let mut entity = self.entity(Arc::clone(&path));
        entity.set_blend_mode(paint.blend_mode);
        entity.set_contents(Some(paint.create_contents(&path, fill)));
        self.current_pass().add_entity(entity);
    }

    pub fn draw_path(&mut self, path: Path, paint: &Paint) {
        self.add_drawing(path, paint, None);
    }

    pub fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.add_drawing(Path::rect(rect), paint, Some(Geometry::rect(rect)));
    }

    pub fn draw_round_rect(&mut self, rect: Rect, radii: Size, paint: &Paint) {
        let path = PathBuilder::new().add_round_rect(rect, radii).build();
        self.add_drawing(path, paint, Some(Geometry::round_rect(rect, radii)));
    }

    pub fn draw_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        let rect = Rect::new(center.x - radius, center.y - radius, radius * 2.0, radius * 2.0);
        self.add_drawing(Path::oval(rect), paint, None);
    }

    /// Fill everything inside the current clip
    pub fn draw_paint(&mut self, paint: &Paint) {
        let paint = Paint {
            style: PaintStyle::Fill,
            ..*paint
        };
        self.add_drawing(Path::rect(MAXIMUM_COVERAGE), &paint, Some(Geometry::cover()));
    }

    /// Intersect the clip with `path` until the matching restore
    pub fn clip_path(&mut self, path: Path) {
        let top = *self.top();
        let device_bounds = path.transformed_bounding_box(&top.transform);

        let path = Arc::new(path);
        let mut entity = self.entity(Arc::clone(&path));
        entity.set_is_clip(true);
        entity.set_contents(Some(Contents::clip(Geometry::fill_path(path))));
        self.current_pass().add_entity(entity);

        let top = self.top_mut();
        top.stencil_depth += 1;
        if let Some(bounds) = device_bounds {
            top.clip_bounds = Some(match top.clip_bounds {
                Some(existing) => existing.union(&bounds),
                None => bounds,
            });
        }
    }

    pub fn clip_rect(&mut self, rect: Rect) {
        self.clip_path(Path::rect(rect));
    }

    /// Approximate the shadow `path` casts at `elevation` with translucent
    /// copies, offset downwards and spreading outwards
    pub fn draw_shadow(&mut self, path: Path, color: Color, elevation: f32) {
        if elevation <= 0.0 || color.is_transparent() {
            return;
        }
        let Some(bounds) = path.bounding_box().filter(|b| !b.is_empty()) else {
            return;
        };
        let path = Arc::new(path);
        let center = bounds.center();
        let step_color = color.with_alpha(color.a / SHADOW_STEPS as f32);

        for step in 1..=SHADOW_STEPS {
            let spread = elevation * step as f32 / SHADOW_STEPS as f32;
            let grow = Matrix::translation(center.x, center.y + elevation * 0.5, 0.0)
                * Matrix::scale(
                    (bounds.width() + spread * 2.0) / bounds.width(),
                    (bounds.height() + spread * 2.0) / bounds.height(),
                    1.0,
                )
                * Matrix::translation(-center.x, -center.y, 0.0);

            let mut entity = self.entity(Arc::clone(&path));
            entity.set_transform(entity.transform().concat(&grow));
            entity.set_contents(Some(Contents::solid_color(
                step_color,
                Geometry::fill_path(Arc::clone(&path)),
            )));
            self.current_pass().add_entity(entity);
        }
    }

    /// Play `picture` back under the current transform and clip
    pub fn draw_picture(&mut self, picture: &Picture) {
        if picture.is_empty() {
            return;
        }
        let top = *self.top();
        let mut pass = picture.pass().clone();
        pass.rebase(&top.transform, top.stencil_depth);
        self.current_pass().add_subpass(pass);
    }

    /// Close every open level and hand back the recording
    pub fn end_recording(mut self) -> Picture {
        self.restore_to_count(1);
        let pass = self.passes.pop().unwrap_or_default();
        tracing::trace!(
            "recorded picture with {} entities in {} subpasses",
            pass.entity_count(),
            pass.subpass_count()
        );
        Picture::new(pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::ColorMatrix;
    use kiln_entity::Element;
    use std::f32::consts::FRAC_PI_2;

    fn entities(pass: &EntityPass) -> Vec<Entity> {
        let mut out = Vec::new();
        pass.iterate_all_entities(&mut |entity| {
            out.push(entity.clone());
            true
        });
        out
    }

    #[test]
    fn test_restore_at_base_is_rejected() {
        let mut canvas = Canvas::new();
        canvas.translate(5.0, 5.0);
        let before = canvas.get_current_transformation();
        assert!(!canvas.restore());
        assert_eq!(canvas.get_save_count(), 1);
        assert_eq!(canvas.get_current_transformation(), before);
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut canvas = Canvas::new();
        canvas.scale(2.0, 3.0);
        let before = canvas.get_current_transformation();

        canvas.save();
        assert_eq!(canvas.get_save_count(), 2);
        canvas.rotate(FRAC_PI_2);
        canvas.translate(10.0, 0.0);
        assert_ne!(canvas.get_current_transformation(), before);

        assert!(canvas.restore());
        assert_eq!(canvas.get_save_count(), 1);
        assert_eq!(canvas.get_current_transformation(), before);
    }

    #[test]
    fn test_concat_right_multiplies() {
        let mut canvas = Canvas::new();
        canvas.translate(10.0, 0.0);
        canvas.scale(2.0, 2.0);
        let point = canvas.get_current_transformation().transform_point(Point::new(1.0, 1.0));
        assert_eq!(point, Point::new(12.0, 2.0));

        canvas.reset_transform();
        assert_eq!(canvas.get_current_transformation(), Matrix::IDENTITY);
    }

    #[test]
    fn test_draws_capture_transform_at_record_time() {
        let mut canvas = Canvas::new();
        canvas.translate(5.0, 0.0);
        canvas.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::RED));
        canvas.translate(100.0, 0.0);

        let picture = canvas.end_recording();
        let recorded = entities(picture.pass());
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].transform(), &Matrix::translation(5.0, 0.0, 0.0));
        assert_eq!(picture.bounds(), Some(Rect::new(5.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_clip_raises_depth_until_restore() {
        let mut canvas = Canvas::new();
        canvas.save();
        canvas.clip_rect(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(canvas.stencil_depth(), 1);
        canvas.draw_rect(Rect::new(0.0, 0.0, 100.0, 100.0), &Paint::fill(Color::BLUE));
        assert!(canvas.restore());
        assert_eq!(canvas.stencil_depth(), 0);
        canvas.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::GREEN));

        let recorded = entities(canvas.end_recording().pass());
        let depths: Vec<_> = recorded.iter().map(|e| e.stencil_depth()).collect();
        assert_eq!(depths, vec![0, 1, 0, 0]);
        assert!(recorded[0].is_clip());
        assert!(matches!(recorded[2].contents(), Some(Contents::ClipRestore(_))));
        assert_eq!(recorded[2].path().bounding_box(), Some(Rect::new(0.0, 0.0, 50.0, 50.0)));
    }

    #[test]
    fn test_restore_without_clip_records_nothing() {
        let mut canvas = Canvas::new();
        canvas.save();
        canvas.translate(1.0, 1.0);
        canvas.restore();
        assert!(canvas.end_recording().pass().is_empty());
    }

    #[test]
    fn test_save_layer_groups_into_subpass() {
        let mut canvas = Canvas::new();
        canvas.translate(10.0, 10.0);
        canvas.save_layer(
            &Paint::fill(Color::BLACK.with_alpha(0.5)),
            Some(Rect::new(0.0, 0.0, 20.0, 20.0)),
        );
        canvas.draw_circle(Point::new(5.0, 5.0), 5.0, &Paint::fill(Color::RED));
        canvas.clip_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
        assert!(canvas.restore());
        assert_eq!(canvas.stencil_depth(), 0);

        let picture = canvas.end_recording();
        let root = picture.pass();
        assert_eq!(root.subpass_count(), 1);
        let Element::Subpass(layer) = &root.elements()[0] else {
            panic!("expected a subpass");
        };
        assert_eq!(layer.opacity(), 0.5);
        assert_eq!(layer.bounds(), Some(Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert_eq!(layer.elements().len(), 2);
    }

    #[test]
    fn test_save_layer_carries_color_filter() {
        let mut canvas = Canvas::new();
        let paint = Paint {
            color_filter: Some(ColorMatrix::saturation(0.0)),
            ..Default::default()
        };
        canvas.save_layer(&paint, None);
        canvas.draw_rect(Rect::new(0.0, 0.0, 4.0, 4.0), &Paint::fill(Color::RED));
        canvas.restore();

        let picture = canvas.end_recording();
        let Element::Subpass(layer) = &picture.pass().elements()[0] else {
            panic!("expected a subpass");
        };
        assert_eq!(layer.color_filter(), Some(&ColorMatrix::saturation(0.0)));
    }

    #[test]
    fn test_end_recording_closes_open_layers() {
        let mut canvas = Canvas::new();
        canvas.save_layer(&Paint::default(), None);
        canvas.draw_rect(Rect::new(0.0, 0.0, 1.0, 1.0), &Paint::default());
        let picture = canvas.end_recording();
        assert_eq!(picture.pass().subpass_count(), 1);
        assert_eq!(picture.pass().entity_count(), 1);
    }

    #[test]
    fn test_draw_picture_rebases_under_current_state() {
        let mut inner = Canvas::new();
        inner.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::fill(Color::RED));
        let picture = inner.end_recording();

        let mut canvas = Canvas::new();
        canvas.clip_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        canvas.translate(20.0, 30.0);
        canvas.draw_picture(&picture);

        let outer = canvas.end_recording();
        let Element::Subpass(played) = &outer.pass().elements()[1] else {
            panic!("expected a subpass");
        };
        assert_eq!(played.stencil_depth(), 1);
        assert_eq!(played.coverage(), Some(Rect::new(20.0, 30.0, 10.0, 10.0)));
        assert_eq!(entities(played)[0].stencil_depth(), 1);
    }

    #[test]
    fn test_shadow_spreads_below_path() {
        let mut canvas = Canvas::new();
        canvas.draw_shadow(Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0)), Color::BLACK, 4.0);
        canvas.draw_shadow(Path::rect(Rect::new(0.0, 0.0, 10.0, 10.0)), Color::BLACK, 0.0);

        let picture = canvas.end_recording();
        assert_eq!(picture.pass().entity_count(), SHADOW_STEPS);
        let bounds = picture.bounds().unwrap();
        assert!(bounds.bottom() > 10.0 + 4.0);
        assert!(bounds.left() < 0.0);
    }

    #[test]
    fn test_stroke_paint_records_stroke_contents() {
        let mut canvas = Canvas::new();
        canvas.draw_round_rect(
            Rect::new(0.0, 0.0, 20.0, 20.0),
            Size::new(4.0, 4.0),
            &Paint::stroke(Color::BLACK, 2.0),
        );
        let recorded = entities(canvas.end_recording().pass());
        assert!(matches!(recorded[0].contents(), Some(Contents::SolidStroke(_))));
    }
}
