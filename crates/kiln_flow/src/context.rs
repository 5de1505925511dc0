//! State threaded through the preroll, paint and scene update traversals

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use kiln_core::{ISize, Matrix, Point, Rect};
use kiln_paint::{Canvas, Picture};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Identifies an externally composited scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneToken(pub u32);

impl fmt::Display for SceneToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pictures supplied by the embedder for child scenes
pub type SceneRegistry = FxHashMap<SceneToken, Arc<Picture>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStatistics {
    pub layers_prerolled: usize,
    pub layers_painted: usize,
    pub layers_skipped: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Preroll
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct PrerollContext {
    /// Union of the paint bounds of the children just prerolled
    pub child_paint_bounds: Rect,
    pub child_scene_layer_exists_below: bool,
    pub stats: FrameStatistics,
}

impl PrerollContext {
    pub fn new() -> Self {
        Self::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paint
// ─────────────────────────────────────────────────────────────────────────────

pub struct PaintContext<'a> {
    canvas: &'a mut Canvas,
    scenes: &'a SceneRegistry,
    pub stats: FrameStatistics,
}

impl<'a> PaintContext<'a> {
    pub fn new(canvas: &'a mut Canvas, scenes: &'a SceneRegistry) -> Self {
        Self {
            canvas,
            scenes,
            stats: FrameStatistics::default(),
        }
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut *self.canvas
    }

    pub fn scene(&self, token: SceneToken) -> Option<&Arc<Picture>> {
        self.scenes.get(&token)
    }

    /// Save the canvas; the returned guard restores it when dropped
    pub fn save(&mut self) -> AutoRestore<'_, 'a> {
        let count = self.canvas.get_save_count();
        self.canvas.save();
        AutoRestore { context: self, count }
    }

    /// Open a canvas layer; the returned guard closes it when dropped
    pub fn save_layer(&mut self, paint: &kiln_paint::Paint, bounds: Option<Rect>) -> AutoRestore<'_, 'a> {
        let count = self.canvas.get_save_count();
        self.canvas.save_layer(paint, bounds);
        AutoRestore { context: self, count }
    }
}

impl fmt::Debug for PaintContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintContext")
            .field("save_count", &self.canvas.get_save_count())
            .field("scenes", &self.scenes.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Restores the canvas to the save count it had when created, on every exit
/// path including `?`
pub struct AutoRestore<'c, 'a> {
    context: &'c mut PaintContext<'a>,
    count: usize,
}

impl<'a> Deref for AutoRestore<'_, 'a> {
    type Target = PaintContext<'a>;

    fn deref(&self) -> &Self::Target {
        &*self.context
    }
}

impl DerefMut for AutoRestore<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.context
    }
}

impl Drop for AutoRestore<'_, '_> {
    fn drop(&mut self) {
        self.context.canvas.restore_to_count(self.count);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scene update
// ─────────────────────────────────────────────────────────────────────────────

/// Where a child scene sits in the frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildScenePlacement {
    pub token: SceneToken,
    pub offset: Point,
    pub size: ISize,
    /// Accumulated transform of the layers above the child scene
    pub transform: Matrix,
}

/// Collects child scene placements for an external compositor
#[derive(Clone, Debug)]
pub struct SceneUpdateContext {
    transforms: Vec<Matrix>,
    placements: Vec<ChildScenePlacement>,
}

impl Default for SceneUpdateContext {
    fn default() -> Self {
        Self {
            transforms: vec![Matrix::IDENTITY],
            placements: Vec::new(),
        }
    }
}

impl SceneUpdateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform(&self) -> Matrix {
        self.transforms.last().copied().unwrap_or(Matrix::IDENTITY)
    }

    /// Run `f` with `transform` concatenated onto the current transform
    pub fn with_transform<R>(&mut self, transform: &Matrix, f: impl FnOnce(&mut Self) -> R) -> R {
        let next = self.transform().concat(transform);
        self.transforms.push(next);
        let result = f(self);
        self.transforms.pop();
        result
    }

    pub fn add_child_scene(&mut self, token: SceneToken, offset: Point, size: ISize) {
        let transform = self.transform();
        self.placements.push(ChildScenePlacement {
            token,
            offset,
            size,
            transform,
        });
    }

    pub fn placements(&self) -> &[ChildScenePlacement] {
        &self.placements
    }

    pub fn take_placements(&mut self) -> Vec<ChildScenePlacement> {
        std::mem::take(&mut self.placements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_restore_unwinds_nested_saves() {
        let mut canvas = Canvas::new();
        let scenes = SceneRegistry::default();
        let mut context = PaintContext::new(&mut canvas, &scenes);
        {
            let mut scope = context.save();
            scope.canvas().save();
            scope.canvas().translate(3.0, 4.0);
            assert_eq!(scope.canvas().get_save_count(), 3);
        }
        assert_eq!(context.canvas().get_save_count(), 1);
        assert_eq!(context.canvas().get_current_transformation(), Matrix::IDENTITY);
    }

    #[test]
    fn test_auto_restore_runs_on_error_return() {
        fn failing(context: &mut PaintContext<'_>) -> Result<(), ()> {
            let mut scope = context.save();
            scope.canvas().clip_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
            Err(())
        }
        let mut canvas = Canvas::new();
        let scenes = SceneRegistry::default();
        let mut context = PaintContext::new(&mut canvas, &scenes);
        assert!(failing(&mut context).is_err());
        assert_eq!(context.canvas().get_save_count(), 1);
        assert_eq!(context.canvas().stencil_depth(), 0);
    }

    #[test]
    fn test_scene_update_accumulates_transforms() {
        let mut context = SceneUpdateContext::new();
        context.with_transform(&Matrix::translation(10.0, 0.0, 0.0), |context| {
            context.with_transform(&Matrix::scale(2.0, 2.0, 1.0), |context| {
                context.add_child_scene(SceneToken(7), Point::new(1.0, 1.0), ISize::new(4, 4));
            });
        });
        assert_eq!(context.transform(), Matrix::IDENTITY);
        let placement = context.placements()[0];
        assert_eq!(placement.token, SceneToken(7));
        assert_eq!(
            placement.transform.transform_point(Point::new(1.0, 1.0)),
            Point::new(12.0, 2.0)
        );
    }
}
