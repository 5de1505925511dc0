//! Transform and opacity layers

use kiln_core::{Color, Matrix};
use kiln_paint::Paint;

use crate::context::{PaintContext, PrerollContext, SceneUpdateContext};
use crate::error::Result;
use crate::layer::{ContainerLayer, Layer};

#[derive(Clone, Debug)]
pub struct TransformLayer {
    transform: Matrix,
    pub(crate) container: ContainerLayer,
}

impl TransformLayer {
    pub fn new(transform: Matrix) -> Self {
        Self {
            transform,
            container: ContainerLayer::new(),
        }
    }

    pub fn transform(&self) -> &Matrix {
        &self.transform
    }

    pub fn add_child(&mut self, layer: impl Into<Layer>) {
        self.container.add_child(layer);
    }

    pub(crate) fn preroll(&mut self, context: &mut PrerollContext, matrix: &Matrix) {
        let child_matrix = matrix.concat(&self.transform);
        let child_bounds = self.container.preroll_children(context, &child_matrix);
        let bounds = if child_bounds.is_empty() {
            child_bounds
        } else {
            child_bounds.transform_bounds(&self.transform)
        };
        context.child_paint_bounds = bounds;
        self.container.paint_bounds = bounds;
    }

    pub(crate) fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        let mut scope = context.save();
        scope.canvas().concat(&self.transform);
        self.container.paint_children(&mut scope)
    }

    pub(crate) fn update_scene(&self, context: &mut SceneUpdateContext) {
        context.with_transform(&self.transform, |context| self.container.update_scene(context));
    }
}

/// Composites its children as a group at reduced opacity
#[derive(Clone, Debug)]
pub struct OpacityLayer {
    alpha: f32,
    pub(crate) container: ContainerLayer,
}

impl OpacityLayer {
    /// `alpha` is clamped to [0, 1]
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            container: ContainerLayer::new(),
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn add_child(&mut self, layer: impl Into<Layer>) {
        self.container.add_child(layer);
    }

    pub(crate) fn preroll(&mut self, context: &mut PrerollContext, matrix: &Matrix) {
        self.container.paint_bounds = self.container.preroll_children(context, matrix);
    }

    pub(crate) fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        let paint = Paint::fill(Color::WHITE.with_alpha(self.alpha));
        let mut scope = context.save_layer(&paint, Some(self.container.paint_bounds));
        self.container.paint_children(&mut scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{ISize, Point, Rect};
    use kiln_paint::Canvas;

    use crate::context::{SceneRegistry, SceneToken};
    use crate::picture::ChildSceneLayer;

    fn scene() -> ChildSceneLayer {
        ChildSceneLayer::new(SceneToken(3), Point::new(0.0, 0.0), ISize::new(10, 10))
    }

    #[test]
    fn test_transform_maps_child_bounds() {
        let mut transform =
            TransformLayer::new(Matrix::translation(5.0, 0.0, 0.0) * Matrix::scale(2.0, 2.0, 1.0));
        transform.add_child(scene());
        let mut layer = Layer::from(transform);
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);
        assert_eq!(layer.paint_bounds(), Rect::new(5.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_nested_transforms_reach_scene_update() {
        let mut inner = TransformLayer::new(Matrix::translation(0.0, 7.0, 0.0));
        inner.add_child(scene());
        let mut outer = TransformLayer::new(Matrix::translation(3.0, 0.0, 0.0));
        outer.add_child(inner);
        let layer = Layer::from(outer);

        let mut context = SceneUpdateContext::new();
        layer.update_scene(&mut context);
        let placement = context.placements()[0];
        assert_eq!(placement.transform.translation_xy(), Point::new(3.0, 7.0));
    }

    #[test]
    fn test_opacity_paints_a_translucent_group() {
        let mut registry = SceneRegistry::default();
        registry.insert(SceneToken(3), Default::default());

        let mut opacity = OpacityLayer::new(1.5);
        assert_eq!(opacity.alpha(), 1.0);
        opacity = OpacityLayer::new(0.25);
        opacity.add_child(scene());
        let mut layer = Layer::from(opacity);
        layer.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);

        let mut canvas = Canvas::new();
        let mut context = PaintContext::new(&mut canvas, &registry);
        layer.paint(&mut context).unwrap();
        let picture = canvas.end_recording();
        assert_eq!(picture.pass().subpass_count(), 1);
    }
}
