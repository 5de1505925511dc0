//! Clipping layers

use kiln_core::{Matrix, PathBuilder, Rect, Size};
use kiln_paint::Paint;

use crate::context::{PaintContext, PrerollContext};
use crate::error::Result;
use crate::layer::{ContainerLayer, Layer};

/// Clips its children to a rect
#[derive(Clone, Debug)]
pub struct ClipRectLayer {
    clip_rect: Rect,
    /// Children fit inside the clip, so painting can skip the clip
    children_inside_clip: bool,
    pub(crate) container: ContainerLayer,
}

impl ClipRectLayer {
    pub fn new(clip_rect: Rect) -> Self {
        Self {
            clip_rect,
            children_inside_clip: false,
            container: ContainerLayer::new(),
        }
    }

    pub fn clip_rect(&self) -> Rect {
        self.clip_rect
    }

    pub fn children_inside_clip(&self) -> bool {
        self.children_inside_clip
    }

    pub fn add_child(&mut self, layer: impl Into<Layer>) {
        self.container.add_child(layer);
    }

    pub(crate) fn preroll(&mut self, context: &mut PrerollContext, matrix: &Matrix) {
        let child_bounds = self.container.preroll_children(context, matrix);
        // Recomputed every frame; children may have moved
        self.children_inside_clip = self.clip_rect.contains_rect(&child_bounds);
        let bounds = child_bounds.intersect_or_empty(&self.clip_rect);
        context.child_paint_bounds = bounds;
        self.container.paint_bounds = bounds;
    }

    pub(crate) fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        let mut scope = context.save();
        if !self.children_inside_clip {
            scope.canvas().clip_rect(self.clip_rect);
        }
        self.container.paint_children(&mut scope)
    }
}

/// Clips its children to a rounded rect, composited as a layer
#[derive(Clone, Debug)]
pub struct ClipRRectLayer {
    clip_rect: Rect,
    radii: Size,
    pub(crate) container: ContainerLayer,
}

impl ClipRRectLayer {
    pub fn new(clip_rect: Rect, radii: Size) -> Self {
        Self {
            clip_rect,
            radii,
            container: ContainerLayer::new(),
        }
    }

    pub fn clip_rect(&self) -> Rect {
        self.clip_rect
    }

    pub fn radii(&self) -> Size {
        self.radii
    }

    pub fn add_child(&mut self, layer: impl Into<Layer>) {
        self.container.add_child(layer);
    }

    pub(crate) fn preroll(&mut self, context: &mut PrerollContext, matrix: &Matrix) {
        let child_bounds = self.container.preroll_children(context, matrix);
        let bounds = child_bounds.intersect_or_empty(&self.clip_rect);
        context.child_paint_bounds = bounds;
        self.container.paint_bounds = bounds;
    }

    pub(crate) fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        let mut scope = context.save_layer(&Paint::default(), Some(self.container.paint_bounds));
        let clip = PathBuilder::new().add_round_rect(self.clip_rect, self.radii).build();
        scope.canvas().clip_path(clip);
        self.container.paint_children(&mut scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{ISize, Point};
    use kiln_paint::Canvas;

    use crate::context::{SceneRegistry, SceneToken};
    use crate::picture::ChildSceneLayer;

    fn scene_at(x: f32, y: f32) -> ChildSceneLayer {
        ChildSceneLayer::new(SceneToken(1), Point::new(x, y), ISize::new(10, 10))
    }

    #[test]
    fn test_clip_intersects_child_bounds() {
        let mut clip = ClipRectLayer::new(Rect::new(0.0, 0.0, 15.0, 15.0));
        clip.add_child(scene_at(10.0, 10.0));
        let mut layer = Layer::from(clip);
        let mut context = PrerollContext::new();
        layer.preroll(&mut context, &Matrix::IDENTITY);

        assert_eq!(layer.paint_bounds(), Rect::new(10.0, 10.0, 5.0, 5.0));
        assert_eq!(context.child_paint_bounds, layer.paint_bounds());
        let Layer::ClipRect(clip) = &layer else { unreachable!() };
        assert!(!clip.children_inside_clip());
    }

    #[test]
    fn test_disjoint_child_gives_empty_bounds() {
        let mut clip = ClipRectLayer::new(Rect::new(0.0, 0.0, 15.0, 15.0));
        clip.add_child(scene_at(100.0, 100.0));
        let mut layer = Layer::from(clip);
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);
        assert_eq!(layer.paint_bounds(), Rect::EMPTY);
    }

    #[test]
    fn test_children_inside_clip_is_recomputed() {
        let mut clip = ClipRectLayer::new(Rect::new(0.0, 0.0, 50.0, 50.0));
        clip.add_child(scene_at(10.0, 10.0));
        let mut layer = Layer::from(clip);
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);
        let Layer::ClipRect(clip) = &mut layer else { unreachable!() };
        assert!(clip.children_inside_clip());

        clip.container.children_mut()[0] = scene_at(45.0, 45.0).into();
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);
        let Layer::ClipRect(clip) = &layer else { unreachable!() };
        assert!(!clip.children_inside_clip());
    }

    #[test]
    fn test_paint_skips_clip_when_children_fit() {
        let mut registry = SceneRegistry::default();
        registry.insert(SceneToken(1), Default::default());

        let mut clip = ClipRectLayer::new(Rect::new(0.0, 0.0, 50.0, 50.0));
        clip.add_child(scene_at(10.0, 10.0));
        let mut layer = Layer::from(clip);
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);

        let mut canvas = Canvas::new();
        let mut context = PaintContext::new(&mut canvas, &registry);
        layer.paint(&mut context).unwrap();
        assert_eq!(context.canvas().get_save_count(), 1);

        // The child scene clips itself; the layer adds no clip of its own
        let picture = canvas.end_recording();
        let mut clips = 0;
        picture.pass().iterate_all_entities(&mut |entity| {
            clips += entity.is_clip() as usize;
            true
        });
        assert_eq!(clips, 1);
    }

    #[test]
    fn test_rrect_paints_inside_a_layer() {
        let mut registry = SceneRegistry::default();
        registry.insert(SceneToken(1), Default::default());

        let mut clip = ClipRRectLayer::new(Rect::new(0.0, 0.0, 50.0, 50.0), Size::new(5.0, 5.0));
        clip.add_child(scene_at(10.0, 10.0));
        let mut layer = Layer::from(clip);
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);

        let mut canvas = Canvas::new();
        let mut context = PaintContext::new(&mut canvas, &registry);
        layer.paint(&mut context).unwrap();
        let picture = canvas.end_recording();
        assert_eq!(picture.pass().subpass_count(), 1);
    }
}
