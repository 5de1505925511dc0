//! The layer enum and the container behavior every composite layer shares

use kiln_core::{Matrix, Rect};

use crate::clip::{ClipRRectLayer, ClipRectLayer};
use crate::context::{PaintContext, PrerollContext, SceneUpdateContext};
use crate::error::Result;
use crate::picture::{ChildSceneLayer, PictureLayer};
use crate::transform::{OpacityLayer, TransformLayer};

/// A node of the layer tree
///
/// Paint bounds are only meaningful after [`Layer::preroll`] has run for the
/// current frame.
#[derive(Clone, Debug)]
pub enum Layer {
    Container(ContainerLayer),
    ClipRect(ClipRectLayer),
    ClipRRect(ClipRRectLayer),
    Transform(TransformLayer),
    Opacity(OpacityLayer),
    Picture(PictureLayer),
    ChildScene(ChildSceneLayer),
}

impl Layer {
    /// Compute paint bounds bottom-up under `matrix`
    pub fn preroll(&mut self, context: &mut PrerollContext, matrix: &Matrix) {
        context.stats.layers_prerolled += 1;
        match self {
            Layer::Container(layer) => layer.preroll(context, matrix),
            Layer::ClipRect(layer) => layer.preroll(context, matrix),
            Layer::ClipRRect(layer) => layer.preroll(context, matrix),
            Layer::Transform(layer) => layer.preroll(context, matrix),
            Layer::Opacity(layer) => layer.preroll(context, matrix),
            Layer::Picture(layer) => layer.preroll(context, matrix),
            Layer::ChildScene(layer) => layer.preroll(context, matrix),
        }
    }

    /// Draw into the context's canvas. Layers with empty paint bounds draw
    /// nothing.
    pub fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        if !self.needs_painting() {
            context.stats.layers_skipped += 1;
            return Ok(());
        }
        context.stats.layers_painted += 1;
        match self {
            Layer::Container(layer) => layer.paint(context),
            Layer::ClipRect(layer) => layer.paint(context),
            Layer::ClipRRect(layer) => layer.paint(context),
            Layer::Transform(layer) => layer.paint(context),
            Layer::Opacity(layer) => layer.paint(context),
            Layer::Picture(layer) => layer.paint(context),
            Layer::ChildScene(layer) => layer.paint(context),
        }
    }

    pub fn update_scene(&self, context: &mut SceneUpdateContext) {
        match self {
            Layer::Container(layer) => layer.update_scene(context),
            Layer::ClipRect(layer) => layer.container.update_scene(context),
            Layer::ClipRRect(layer) => layer.container.update_scene(context),
            Layer::Transform(layer) => layer.update_scene(context),
            Layer::Opacity(layer) => layer.container.update_scene(context),
            Layer::Picture(_) => {}
            Layer::ChildScene(layer) => layer.update_scene(context),
        }
    }

    pub fn paint_bounds(&self) -> Rect {
        match self {
            Layer::Container(layer) => layer.paint_bounds,
            Layer::ClipRect(layer) => layer.container.paint_bounds,
            Layer::ClipRRect(layer) => layer.container.paint_bounds,
            Layer::Transform(layer) => layer.container.paint_bounds,
            Layer::Opacity(layer) => layer.container.paint_bounds,
            Layer::Picture(layer) => layer.paint_bounds,
            Layer::ChildScene(layer) => layer.paint_bounds,
        }
    }

    pub fn needs_painting(&self) -> bool {
        !self.paint_bounds().is_empty()
    }

    /// Children of a composite layer, `None` for leaves
    pub fn container_mut(&mut self) -> Option<&mut ContainerLayer> {
        match self {
            Layer::Container(layer) => Some(layer),
            Layer::ClipRect(layer) => Some(&mut layer.container),
            Layer::ClipRRect(layer) => Some(&mut layer.container),
            Layer::Transform(layer) => Some(&mut layer.container),
            Layer::Opacity(layer) => Some(&mut layer.container),
            Layer::Picture(_) | Layer::ChildScene(_) => None,
        }
    }
}

macro_rules! impl_from_layer {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Layer {
                fn from(layer: $ty) -> Self {
                    Layer::$variant(layer)
                }
            }
        )*
    };
}

impl_from_layer! {
    Container => ContainerLayer,
    ClipRect => ClipRectLayer,
    ClipRRect => ClipRRectLayer,
    Transform => TransformLayer,
    Opacity => OpacityLayer,
    Picture => PictureLayer,
    ChildScene => ChildSceneLayer,
}

// ─────────────────────────────────────────────────────────────────────────────
// Container
// ─────────────────────────────────────────────────────────────────────────────

/// Groups children without a visual effect. Z-order is insertion order.
#[derive(Clone, Debug, Default)]
pub struct ContainerLayer {
    children: Vec<Layer>,
    pub(crate) paint_bounds: Rect,
}

impl ContainerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(children: impl IntoIterator<Item = Layer>) -> Self {
        Self {
            children: children.into_iter().collect(),
            paint_bounds: Rect::EMPTY,
        }
    }

    pub fn add_child(&mut self, layer: impl Into<Layer>) {
        self.children.push(layer.into());
    }

    pub fn children(&self) -> &[Layer] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Layer] {
        &mut self.children
    }

    /// Preroll every child in order and return the union of their paint
    /// bounds, also left in `context.child_paint_bounds`
    pub(crate) fn preroll_children(&mut self, context: &mut PrerollContext, matrix: &Matrix) -> Rect {
        let mut bounds = Rect::EMPTY;
        for child in &mut self.children {
            context.child_paint_bounds = Rect::EMPTY;
            child.preroll(context, matrix);
            bounds = bounds.union(&child.paint_bounds());
        }
        context.child_paint_bounds = bounds;
        bounds
    }

    pub(crate) fn paint_children(&self, context: &mut PaintContext<'_>) -> Result<()> {
        for child in &self.children {
            child.paint(context)?;
        }
        Ok(())
    }

    fn preroll(&mut self, context: &mut PrerollContext, matrix: &Matrix) {
        self.paint_bounds = self.preroll_children(context, matrix);
    }

    fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        self.paint_children(context)
    }

    pub(crate) fn update_scene(&self, context: &mut SceneUpdateContext) {
        for child in &self.children {
            child.update_scene(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{ISize, Point};
    use kiln_paint::Canvas;

    use crate::context::{SceneRegistry, SceneToken};

    fn scene(x: f32, y: f32, w: u32, h: u32) -> Layer {
        ChildSceneLayer::new(SceneToken(1), Point::new(x, y), ISize::new(w, h)).into()
    }

    #[test]
    fn test_container_unions_children_in_order() {
        let mut container = Layer::from(ContainerLayer::with_children([
            scene(0.0, 0.0, 10, 10),
            scene(20.0, 5.0, 10, 10),
        ]));
        let mut context = PrerollContext::new();
        container.preroll(&mut context, &Matrix::IDENTITY);

        assert_eq!(container.paint_bounds(), Rect::new(0.0, 0.0, 30.0, 15.0));
        assert_eq!(context.child_paint_bounds, container.paint_bounds());
        assert_eq!(context.stats.layers_prerolled, 3);
    }

    #[test]
    fn test_empty_container_has_empty_bounds() {
        let mut container = Layer::from(ContainerLayer::new());
        container.preroll(&mut PrerollContext::new(), &Matrix::IDENTITY);
        assert!(container.paint_bounds().is_empty());
        assert!(!container.needs_painting());
    }

    #[test]
    fn test_layers_without_bounds_are_skipped() {
        let layer = Layer::from(ContainerLayer::new());
        let mut canvas = Canvas::new();
        let scenes = SceneRegistry::default();
        let mut context = PaintContext::new(&mut canvas, &scenes);
        layer.paint(&mut context).unwrap();
        assert_eq!(context.stats.layers_skipped, 1);
        assert_eq!(context.stats.layers_painted, 0);
    }

    #[test]
    fn test_container_mut_exposes_children() {
        let mut layer = Layer::from(TransformLayer::new(Matrix::IDENTITY));
        layer.container_mut().unwrap().add_child(ContainerLayer::new());
        assert_eq!(layer.container_mut().unwrap().children().len(), 1);
        assert!(Layer::from(ChildSceneLayer::new(SceneToken(0), Point::ZERO, ISize::new(1, 1)))
            .container_mut()
            .is_none());
    }
}
