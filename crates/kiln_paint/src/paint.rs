//! Paint - how a recorded shape is colored

use std::sync::Arc;

use kiln_core::{Color, ColorMatrix, Path};
use kiln_entity::{Contents, Geometry, LineCap, LineJoin, StrokeStyle};
use kiln_renderer::BlendMode;
use serde::{Deserialize, Serialize};

/// Whether a shape's interior or its outline is drawn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintStyle {
    #[default]
    Fill,
    Stroke,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paint {
    pub color: Color,
    pub style: PaintStyle,
    pub(crate) stroke_width: f32,
    pub stroke_cap: LineCap,
    pub stroke_join: LineJoin,
    pub stroke_miter: f32,
    pub blend_mode: BlendMode,
    /// Applied when the paint composites a layer
    pub color_filter: Option<ColorMatrix>,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            style: PaintStyle::Fill,
            stroke_width: 0.0,
            stroke_cap: LineCap::Butt,
            stroke_join: LineJoin::Miter,
            stroke_miter: 4.0,
            blend_mode: BlendMode::SourceOver,
            color_filter: None,
        }
    }
}

impl Paint {
    pub fn fill(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn stroke(color: Color, width: f32) -> Self {
        let mut paint = Self {
            color,
            style: PaintStyle::Stroke,
            ..Default::default()
        };
        paint.set_stroke_width(width);
        paint
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width.max(0.0)
    }

    /// Negative widths clamp to zero
    pub fn set_stroke_width(&mut self, width: f32) {
        self.stroke_width = width.max(0.0);
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            width: self.stroke_width(),
            cap: self.stroke_cap,
            join: self.stroke_join,
            miter_limit: self.stroke_miter,
        }
    }

    /// Contents drawing `path` with this paint. `fill` replaces the default
    /// fill geometry when the caller knows a cheaper one.
    pub(crate) fn create_contents(&self, path: &Arc<Path>, fill: Option<Geometry>) -> Contents {
        match self.style {
            PaintStyle::Fill => Contents::solid_color(
                self.color,
                fill.unwrap_or_else(|| Geometry::fill_path(Arc::clone(path))),
            ),
            PaintStyle::Stroke => Contents::solid_stroke(self.color, self.stroke_style()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_width_clamps() {
        let mut paint = Paint::stroke(Color::BLACK, -2.0);
        assert_eq!(paint.stroke_width(), 0.0);
        paint.set_stroke_width(3.0);
        assert_eq!(paint.stroke_style().width, 3.0);
    }

    #[test]
    fn test_contents_follow_style() {
        let path = Arc::new(Path::new());
        assert!(matches!(
            Paint::fill(Color::RED).create_contents(&path, None),
            Contents::SolidColor(_)
        ));
        assert!(matches!(
            Paint::stroke(Color::RED, 1.0).create_contents(&path, None),
            Contents::SolidStroke(_)
        ));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let paint: Paint = toml::from_str("style = \"stroke\"\nstroke_width = -1.0").unwrap();
        assert_eq!(paint.style, PaintStyle::Stroke);
        assert_eq!(paint.stroke_width(), 0.0);
        assert_eq!(paint.blend_mode, BlendMode::SourceOver);
        assert_eq!(paint.color_filter, None);
    }
}
