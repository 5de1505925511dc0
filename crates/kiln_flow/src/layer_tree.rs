//! One frame's layer tree

use kiln_core::{ISize, Matrix, Rect};
use kiln_paint::Canvas;

use crate::context::{
    ChildScenePlacement, FrameStatistics, PaintContext, PrerollContext, SceneRegistry,
    SceneUpdateContext,
};
use crate::error::{LayerError, Result};
use crate::layer::Layer;

/// Result of prerolling a tree
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrerollResult {
    pub paint_bounds: Rect,
    pub child_scene_layer_exists: bool,
    pub stats: FrameStatistics,
}

#[derive(Clone, Debug, Default)]
pub struct LayerTree {
    root: Option<Layer>,
    frame_size: ISize,
    /// Set by `preroll`, cleared by anything that can change the tree
    prerolled: bool,
}

impl LayerTree {
    pub fn new(frame_size: ISize) -> Self {
        Self {
            root: None,
            frame_size,
            prerolled: false,
        }
    }

    pub fn frame_size(&self) -> ISize {
        self.frame_size
    }

    pub fn set_frame_size(&mut self, frame_size: ISize) {
        self.frame_size = frame_size;
        self.prerolled = false;
    }

    pub fn root_layer(&self) -> Option<&Layer> {
        self.root.as_ref()
    }

    /// Mutable access invalidates the last preroll
    pub fn root_layer_mut(&mut self) -> Option<&mut Layer> {
        self.prerolled = false;
        self.root.as_mut()
    }

    pub fn set_root_layer(&mut self, root: impl Into<Layer>) {
        self.root = Some(root.into());
        self.prerolled = false;
    }

    pub fn is_prerolled(&self) -> bool {
        self.prerolled
    }

    pub fn paint_bounds(&self) -> Rect {
        self.root.as_ref().map_or(Rect::EMPTY, Layer::paint_bounds)
    }

    pub fn preroll(&mut self) -> PrerollResult {
        let _span = tracing::trace_span!("preroll").entered();
        let mut context = PrerollContext::new();
        if let Some(root) = &mut self.root {
            root.preroll(&mut context, &Matrix::IDENTITY);
        }
        self.prerolled = true;

        let result = PrerollResult {
            paint_bounds: self.paint_bounds(),
            child_scene_layer_exists: context.child_scene_layer_exists_below,
            stats: context.stats,
        };
        tracing::trace!(
            "prerolled {} layers, bounds {:?}",
            result.stats.layers_prerolled,
            result.paint_bounds
        );
        result
    }

    /// Paint the tree into `canvas`, which is left at the save count it had
    /// on entry even when painting fails
    pub fn paint(&self, canvas: &mut Canvas, scenes: &SceneRegistry) -> Result<FrameStatistics> {
        if !self.prerolled {
            return Err(LayerError::NotPrerolled);
        }
        let _span = tracing::trace_span!("paint").entered();
        let mut context = PaintContext::new(canvas, scenes);
        if let Some(root) = &self.root {
            root.paint(&mut context)?;
        }
        tracing::trace!(
            "painted {} layers, skipped {}",
            context.stats.layers_painted,
            context.stats.layers_skipped
        );
        Ok(context.stats)
    }

    pub fn update_scene(&self) -> Vec<ChildScenePlacement> {
        let mut context = SceneUpdateContext::new();
        if let Some(root) = &self.root {
            root.update_scene(&mut context);
        }
        context.take_placements()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Point;

    use crate::clip::ClipRectLayer;
    use crate::context::SceneToken;
    use crate::layer::ContainerLayer;
    use crate::picture::ChildSceneLayer;

    fn tree() -> LayerTree {
        let mut clip = ClipRectLayer::new(Rect::new(0.0, 0.0, 20.0, 20.0));
        clip.add_child(ChildSceneLayer::new(SceneToken(4), Point::new(5.0, 5.0), ISize::new(5, 5)));
        let mut tree = LayerTree::new(ISize::new(100, 100));
        tree.set_root_layer(ContainerLayer::with_children([clip.into()]));
        tree
    }

    #[test]
    fn test_paint_before_preroll_fails() {
        let tree = tree();
        let mut canvas = Canvas::new();
        assert_eq!(
            tree.paint(&mut canvas, &SceneRegistry::default()),
            Err(LayerError::NotPrerolled)
        );
    }

    #[test]
    fn test_mutation_invalidates_preroll() {
        let mut tree = tree();
        let result = tree.preroll();
        assert!(tree.is_prerolled());
        assert!(result.child_scene_layer_exists);
        assert_eq!(result.paint_bounds, Rect::new(5.0, 5.0, 5.0, 5.0));
        assert_eq!(result.stats.layers_prerolled, 3);

        tree.root_layer_mut();
        assert!(!tree.is_prerolled());
    }

    #[test]
    fn test_unknown_scene_propagates_and_restores() {
        let mut tree = tree();
        tree.preroll();
        let mut canvas = Canvas::new();
        let result = tree.paint(&mut canvas, &SceneRegistry::default());
        assert_eq!(result, Err(LayerError::UnknownScene(SceneToken(4))));
        assert_eq!(canvas.get_save_count(), 1);
        assert_eq!(canvas.stencil_depth(), 0);
    }

    #[test]
    fn test_update_scene_lists_child_scenes() {
        let tree = tree();
        let placements = tree.update_scene();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].token, SceneToken(4));
        assert_eq!(placements[0].size, ISize::new(5, 5));
    }
}
