//! Scene files: a TOML description of a layer tree and the pictures it
//! references
//!
//! ```toml
//! [root]
//! type = "clip_rect"
//! rect = [0.0, 0.0, 100.0, 100.0]
//!
//! [[root.children]]
//! type = "picture"
//! offset = [10.0, 10.0]
//!
//! [[root.children.shapes]]
//! shape = "rect"
//! rect = [0.0, 0.0, 40.0, 40.0]
//! paint = { color = { r = 1.0, g = 0.0, b = 0.0, a = 1.0 } }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use kiln_core::{Color, FillType, ISize, Matrix, PathBuilder, Point, Rect, Size};
use kiln_flow::{
    ChildSceneLayer, ClipRRectLayer, ClipRectLayer, ContainerLayer, Layer, LayerTree,
    OpacityLayer, PictureLayer, SceneRegistry, SceneToken, TransformLayer,
};
use kiln_paint::{Canvas, Paint, Picture};
use serde::{Deserialize, Serialize};

use crate::error::{CompositorError, Result};

/// `[x, y, width, height]`
pub type RectArray = [f32; 4];

fn to_rect([x, y, width, height]: RectArray) -> Result<Rect> {
    if !(width >= 0.0 && height >= 0.0) {
        return Err(CompositorError::InvalidScene(format!(
            "rect [{x}, {y}, {width}, {height}] has a negative size"
        )));
    }
    Ok(Rect::new(x, y, width, height))
}

fn to_point([x, y]: [f32; 2]) -> Point {
    Point::new(x, y)
}

fn default_scale() -> [f32; 2] {
    [1.0, 1.0]
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SceneDescription {
    pub root: LayerDescription,
    /// Pictures for `child_scene` layers
    #[serde(default)]
    pub scenes: Vec<ChildSceneDescription>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ChildSceneDescription {
    pub token: SceneToken,
    #[serde(default)]
    pub shapes: Vec<ShapeDescription>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerDescription {
    Container {
        #[serde(default)]
        children: Vec<LayerDescription>,
    },
    ClipRect {
        rect: RectArray,
        #[serde(default)]
        children: Vec<LayerDescription>,
    },
    ClipRrect {
        rect: RectArray,
        radii: [f32; 2],
        #[serde(default)]
        children: Vec<LayerDescription>,
    },
    /// Applied as translate, then rotate, then scale
    Transform {
        #[serde(default)]
        translate: [f32; 2],
        #[serde(default)]
        rotate_degrees: f32,
        #[serde(default = "default_scale")]
        scale: [f32; 2],
        #[serde(default)]
        children: Vec<LayerDescription>,
    },
    Opacity {
        alpha: f32,
        #[serde(default)]
        children: Vec<LayerDescription>,
    },
    Picture {
        #[serde(default)]
        offset: [f32; 2],
        #[serde(default)]
        shapes: Vec<ShapeDescription>,
    },
    ChildScene {
        token: SceneToken,
        #[serde(default)]
        offset: [f32; 2],
        size: [u32; 2],
    },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ShapeDescription {
    Rect {
        rect: RectArray,
        #[serde(default)]
        paint: Paint,
    },
    RoundRect {
        rect: RectArray,
        radii: [f32; 2],
        #[serde(default)]
        paint: Paint,
    },
    Circle {
        center: [f32; 2],
        radius: f32,
        #[serde(default)]
        paint: Paint,
    },
    /// Closed polygon through `points`
    Polygon {
        points: Vec<[f32; 2]>,
        #[serde(default)]
        fill_type: FillType,
        #[serde(default)]
        paint: Paint,
    },
    Shadow {
        rect: RectArray,
        #[serde(default)]
        radii: [f32; 2],
        color: Color,
        elevation: f32,
    },
}

impl SceneDescription {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| CompositorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn build_tree(&self, frame_size: ISize) -> Result<LayerTree> {
        let mut tree = LayerTree::new(frame_size);
        tree.set_root_layer(self.root.build()?);
        Ok(tree)
    }

    /// Record every child scene's picture. Tokens must be unique.
    pub fn build_scenes(&self) -> Result<SceneRegistry> {
        let mut scenes = SceneRegistry::default();
        for scene in &self.scenes {
            let picture = Arc::new(record_shapes(&scene.shapes)?);
            if scenes.insert(scene.token, picture).is_some() {
                return Err(CompositorError::InvalidScene(format!(
                    "scene {} is defined twice",
                    scene.token
                )));
            }
        }
        Ok(scenes)
    }
}

impl LayerDescription {
    pub fn build(&self) -> Result<Layer> {
        let layer: Layer = match self {
            Self::Container { children } => {
                ContainerLayer::with_children(build_all(children)?).into()
            }
            Self::ClipRect { rect, children } => {
                let mut layer = ClipRectLayer::new(to_rect(*rect)?);
                build_all(children)?.into_iter().for_each(|child| layer.add_child(child));
                layer.into()
            }
            Self::ClipRrect {
                rect,
                radii,
                children,
            } => {
                let mut layer = ClipRRectLayer::new(to_rect(*rect)?, Size::new(radii[0], radii[1]));
                build_all(children)?.into_iter().for_each(|child| layer.add_child(child));
                layer.into()
            }
            Self::Transform {
                translate,
                rotate_degrees,
                scale,
                children,
            } => {
                let transform = Matrix::translation(translate[0], translate[1], 0.0)
                    * Matrix::rotation_z(rotate_degrees.to_radians())
                    * Matrix::scale(scale[0], scale[1], 1.0);
                let mut layer = TransformLayer::new(transform);
                build_all(children)?.into_iter().for_each(|child| layer.add_child(child));
                layer.into()
            }
            Self::Opacity { alpha, children } => {
                let mut layer = OpacityLayer::new(*alpha);
                build_all(children)?.into_iter().for_each(|child| layer.add_child(child));
                layer.into()
            }
            Self::Picture { offset, shapes } => {
                PictureLayer::new(to_point(*offset), Arc::new(record_shapes(shapes)?)).into()
            }
            Self::ChildScene {
                token,
                offset,
                size,
            } => ChildSceneLayer::new(*token, to_point(*offset), ISize::new(size[0], size[1])).into(),
        };
        Ok(layer)
    }
}

fn build_all(children: &[LayerDescription]) -> Result<Vec<Layer>> {
    children.iter().map(LayerDescription::build).collect()
}

/// Record shapes in order into a picture
pub fn record_shapes(shapes: &[ShapeDescription]) -> Result<Picture> {
    let mut canvas = Canvas::new();
    for shape in shapes {
        match shape {
            ShapeDescription::Rect { rect, paint } => canvas.draw_rect(to_rect(*rect)?, paint),
            ShapeDescription::RoundRect { rect, radii, paint } => {
                canvas.draw_round_rect(to_rect(*rect)?, Size::new(radii[0], radii[1]), paint)
            }
            ShapeDescription::Circle {
                center,
                radius,
                paint,
            } => canvas.draw_circle(to_point(*center), *radius, paint),
            ShapeDescription::Polygon {
                points,
                fill_type,
                paint,
            } => {
                let [first, rest @ ..] = points.as_slice() else {
                    return Err(CompositorError::InvalidScene("polygon has no points".into()));
                };
                let mut builder = PathBuilder::new();
                builder.move_to(to_point(*first));
                for point in rest {
                    builder.line_to(to_point(*point));
                }
                builder.close();
                canvas.draw_path(builder.take_path(*fill_type), paint);
            }
            ShapeDescription::Shadow {
                rect,
                radii,
                color,
                elevation,
            } => {
                let path = PathBuilder::new()
                    .add_round_rect(to_rect(*rect)?, Size::new(radii[0], radii[1]))
                    .build();
                canvas.draw_shadow(path, *color, *elevation);
            }
        }
    }
    Ok(canvas.end_recording())
}
