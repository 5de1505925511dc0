//! Leaf layers: recorded pictures and externally composited scenes

use std::sync::Arc;

use kiln_core::{ISize, Matrix, Point, Rect};
use kiln_paint::Picture;

use crate::context::{PaintContext, PrerollContext, SceneToken, SceneUpdateContext};
use crate::error::{LayerError, Result};

/// Draws a recorded picture at an offset
#[derive(Clone, Debug)]
pub struct PictureLayer {
    offset: Point,
    picture: Arc<Picture>,
    pub(crate) paint_bounds: Rect,
}

impl PictureLayer {
    pub fn new(offset: Point, picture: Arc<Picture>) -> Self {
        Self {
            offset,
            picture,
            paint_bounds: Rect::EMPTY,
        }
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn picture(&self) -> &Arc<Picture> {
        &self.picture
    }

    pub(crate) fn preroll(&mut self, _context: &mut PrerollContext, _matrix: &Matrix) {
        self.paint_bounds = self
            .picture
            .bounds()
            .map_or(Rect::EMPTY, |bounds| bounds.translate(self.offset.x, self.offset.y));
    }

    pub(crate) fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        let mut scope = context.save();
        let canvas = scope.canvas();
        canvas.translate(self.offset.x, self.offset.y);
        canvas.draw_picture(&self.picture);
        Ok(())
    }
}

/// Embeds a scene composited outside this tree
#[derive(Clone, Debug)]
pub struct ChildSceneLayer {
    scene_token: SceneToken,
    offset: Point,
    physical_size: ISize,
    pub(crate) paint_bounds: Rect,
}

impl ChildSceneLayer {
    pub fn new(scene_token: SceneToken, offset: Point, physical_size: ISize) -> Self {
        Self {
            scene_token,
            offset,
            physical_size,
            paint_bounds: Rect::EMPTY,
        }
    }

    pub fn scene_token(&self) -> SceneToken {
        self.scene_token
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn physical_size(&self) -> ISize {
        self.physical_size
    }

    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.offset, self.physical_size.to_size())
    }

    pub(crate) fn preroll(&mut self, context: &mut PrerollContext, _matrix: &Matrix) {
        context.child_scene_layer_exists_below = true;
        self.paint_bounds = self.bounds();
    }

    /// Paint the scene's picture clipped to the layer's bounds
    pub(crate) fn paint(&self, context: &mut PaintContext<'_>) -> Result<()> {
        let picture = Arc::clone(
            context
                .scene(self.scene_token)
                .ok_or(LayerError::UnknownScene(self.scene_token))?,
        );
        let mut scope = context.save();
        let canvas = scope.canvas();
        canvas.clip_rect(self.bounds());
        canvas.translate(self.offset.x, self.offset.y);
        canvas.draw_picture(&picture);
        Ok(())
    }

    pub(crate) fn update_scene(&self, context: &mut SceneUpdateContext) {
        context.add_child_scene(self.scene_token, self.offset, self.physical_size);
    }
}
