//! Curve flattening
//!
//! Converts a [`Path`] into straight-line contours. The number of segments
//! used for each curve depends on the scale at which the path will be drawn:
//! a path drawn at 4x needs more segments than the same path drawn at 1x.

use std::ops::Range;

use crate::geometry::Point;
use crate::path::{eval_cubic, eval_quad, Path, PathCommand};

/// Maximum distance, in device pixels, between a curve and its flattened form
pub const DEFAULT_TOLERANCE: f32 = 0.1;

/// Upper bound on segments emitted for a single curve
const MAX_CURVE_SEGMENTS: u32 = 1000;

/// Parameters controlling curve subdivision
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingApproximation {
    /// Scale at which the path is drawn (see `Matrix::max_basis_length_xy`)
    pub scale: f32,
    /// Maximum turn per segment in radians. Zero disables the angle criterion.
    pub angle_tolerance: f32,
    /// Turns sharper than this (radians) are treated as cusps and ignored by
    /// the angle criterion. Zero disables cusp detection.
    pub cusp_limit: f32,
}

impl Default for SmoothingApproximation {
    fn default() -> Self {
        Self {
            scale: 1.0,
            angle_tolerance: 0.0,
            cusp_limit: 0.0,
        }
    }
}

impl SmoothingApproximation {
    pub fn new(scale: f32, angle_tolerance: f32, cusp_limit: f32) -> Self {
        Self {
            scale,
            angle_tolerance,
            cusp_limit,
        }
    }

    pub fn with_scale(scale: f32) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    fn effective_scale(&self) -> f32 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            0.0
        }
    }

    /// Segments for a quadratic curve (Wang's formula, degree 2)
    pub fn quad_segments(&self, p0: Point, c: Point, p1: Point) -> u32 {
        let dd = (p0 - c * 2.0 + p1).length();
        let wang = (0.25 * dd * self.effective_scale() / DEFAULT_TOLERANCE).sqrt();
        let angle = self.angle_segments(&[p0, c, p1]);
        clamp_segments(wang.max(angle))
    }

    /// Segments for a cubic curve (Wang's formula, degree 3)
    pub fn cubic_segments(&self, p0: Point, c1: Point, c2: Point, p1: Point) -> u32 {
        let dd0 = (p0 - c1 * 2.0 + c2).length();
        let dd1 = (c1 - c2 * 2.0 + p1).length();
        let wang = (0.75 * dd0.max(dd1) * self.effective_scale() / DEFAULT_TOLERANCE).sqrt();
        let angle = self.angle_segments(&[p0, c1, c2, p1]);
        clamp_segments(wang.max(angle))
    }

    fn angle_segments(&self, control: &[Point]) -> f32 {
        if self.angle_tolerance <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0f32;
        let mut previous: Option<Point> = None;
        for pair in control.windows(2) {
            let edge = pair[1] - pair[0];
            if edge.length() <= f32::EPSILON {
                continue;
            }
            if let Some(prev) = previous {
                let turn = prev.cross(edge).atan2(prev.dot(edge)).abs();
                let is_cusp = self.cusp_limit > 0.0 && turn > self.cusp_limit;
                if !is_cusp {
                    total += turn;
                }
            }
            previous = Some(edge);
        }
        total / self.angle_tolerance
    }
}

fn clamp_segments(n: f32) -> u32 {
    if !n.is_finite() {
        return MAX_CURVE_SEGMENTS;
    }
    (n.ceil() as u32).clamp(1, MAX_CURVE_SEGMENTS)
}

/// One contour of a polyline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolylineContour {
    pub start_index: usize,
    pub is_closed: bool,
}

/// Flattened path: points grouped into contours
#[derive(Clone, Debug, Default)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub contours: Vec<PolylineContour>,
}

impl Polyline {
    pub fn from_path(path: &Path, approximation: SmoothingApproximation) -> Self {
        let mut builder = PolylineBuilder::default();
        let mut start = Point::ZERO;
        let mut current = Point::ZERO;

        for cmd in path.commands() {
            match *cmd {
                PathCommand::MoveTo(p) => {
                    builder.finish_contour();
                    builder.begin_contour(p);
                    start = p;
                    current = p;
                }
                PathCommand::LineTo(p) => {
                    builder.ensure_contour(current);
                    builder.push(p);
                    current = p;
                }
                PathCommand::QuadTo { control, end } => {
                    builder.ensure_contour(current);
                    let n = approximation.quad_segments(current, control, end);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        builder.push(eval_quad(current, control, end, t));
                    }
                    current = end;
                }
                PathCommand::CubicTo {
                    control1,
                    control2,
                    end,
                } => {
                    builder.ensure_contour(current);
                    let n = approximation.cubic_segments(current, control1, control2, end);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        builder.push(eval_cubic(current, control1, control2, end, t));
                    }
                    current = end;
                }
                PathCommand::Close => {
                    if builder.is_open() {
                        if current != start {
                            builder.push(start);
                        }
                        builder.close_contour();
                    }
                    current = start;
                }
            }
        }
        builder.finish_contour();
        builder.polyline
    }

    pub fn contour_count(&self) -> usize {
        self.contours.len()
    }

    pub fn contour_range(&self, index: usize) -> Range<usize> {
        let start = self.contours[index].start_index;
        let end = self
            .contours
            .get(index + 1)
            .map_or(self.points.len(), |c| c.start_index);
        start..end
    }

    pub fn contour_points(&self, index: usize) -> &[Point] {
        &self.points[self.contour_range(index)]
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }
}

#[derive(Default)]
struct PolylineBuilder {
    polyline: Polyline,
    open: bool,
}

impl PolylineBuilder {
    fn begin_contour(&mut self, p: Point) {
        self.polyline.contours.push(PolylineContour {
            start_index: self.polyline.points.len(),
            is_closed: false,
        });
        self.polyline.points.push(p);
        self.open = true;
    }

    fn ensure_contour(&mut self, current: Point) {
        if !self.open {
            self.finish_contour();
            self.begin_contour(current);
        }
    }

    fn push(&mut self, p: Point) {
        self.polyline.points.push(p);
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close_contour(&mut self) {
        if let Some(contour) = self.polyline.contours.last_mut() {
            contour.is_closed = true;
        }
        self.open = false;
    }

    // Drops the last contour if it never got a second point.
    fn finish_contour(&mut self) {
        self.open = false;
        if let Some(last) = self.polyline.contours.last() {
            if self.polyline.points.len() - last.start_index < 2 {
                self.polyline.points.truncate(last.start_index);
                self.polyline.contours.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FillType, PathBuilder, Rect};

    fn curve() -> Path {
        PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .cubic_curve_to(Point::new(0.0, 100.0), Point::new(100.0, 100.0), Point::new(100.0, 0.0))
            .take_path(FillType::NonZero)
    }

    #[test]
    fn test_higher_scale_produces_more_points() {
        let path = curve();
        let low = path.create_polyline(SmoothingApproximation::with_scale(1.0));
        let high = path.create_polyline(SmoothingApproximation::with_scale(8.0));
        assert!(high.points.len() > low.points.len());
    }

    #[test]
    fn test_angle_tolerance_adds_segments() {
        let path = curve();
        let base = path.create_polyline(SmoothingApproximation::with_scale(0.01));
        let angled = path.create_polyline(SmoothingApproximation::new(0.01, 0.05, 0.0));
        assert!(angled.points.len() > base.points.len());
    }

    #[test]
    fn test_rect_contour_is_closed() {
        let path = Path::rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        let polyline = path.create_polyline(SmoothingApproximation::default());
        assert_eq!(polyline.contour_count(), 1);
        assert!(polyline.contours[0].is_closed);
        // Four corners plus the closing point
        assert_eq!(polyline.contour_points(0).len(), 5);
    }

    #[test]
    fn test_contours_split_on_move() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 1.0, 1.0))
            .add_rect(Rect::new(5.0, 5.0, 1.0, 1.0))
            .take_path(FillType::Odd);
        let polyline = path.create_polyline(SmoothingApproximation::default());
        assert_eq!(polyline.contour_count(), 2);
        assert_eq!(polyline.contour_range(1).start, 5);
    }

    #[test]
    fn test_lone_move_is_dropped() {
        let path = PathBuilder::new()
            .move_to(Point::new(1.0, 1.0))
            .move_to(Point::new(2.0, 2.0))
            .line_to(Point::new(3.0, 3.0))
            .take_path(FillType::NonZero);
        let polyline = path.create_polyline(SmoothingApproximation::default());
        assert_eq!(polyline.contour_count(), 1);
        assert_eq!(polyline.points, vec![Point::new(2.0, 2.0), Point::new(3.0, 3.0)]);
    }
}
