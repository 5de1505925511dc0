//! Path representation
//!
//! A `Path` is an immutable sequence of drawing commands plus a fill rule.
//! Paths are built with [`PathBuilder`](crate::PathBuilder) and usually shared
//! behind an `Arc` between the entities and geometries that draw them.
//! Bounding box and convexity are computed on first use and cached.

use std::f32::consts::TAU;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::geometry::{Point, Rect};
use crate::matrix::Matrix;
use crate::polyline::{Polyline, SmoothingApproximation};

/// Rule deciding which regions of a self-intersecting path are inside
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillType {
    /// Inside where the winding number is non-zero
    #[default]
    NonZero,
    /// Inside where the winding number is odd (even-odd rule)
    Odd,
}

/// Whether a path is known to be convex
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Convexity {
    /// Not declared; computed from the geometry on demand
    #[default]
    Unknown,
    /// Declared convex by the builder
    Convex,
}

/// Path command
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    QuadTo {
        control: Point,
        end: Point,
    },
    CubicTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
    Close,
}

/// A drawable segment with resolved start point
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    Line(Point, Point),
    Quad(Point, Point, Point),
    Cubic(Point, Point, Point, Point),
}

/// A 2D path composed of commands
#[derive(Clone, Debug, Default)]
pub struct Path {
    commands: SmallVec<[PathCommand; 16]>,
    fill_type: FillType,
    convexity: Convexity,
    bounds: OnceLock<Option<Rect>>,
    computed_convex: OnceLock<bool>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        commands: SmallVec<[PathCommand; 16]>,
        fill_type: FillType,
        convexity: Convexity,
    ) -> Self {
        Self {
            commands,
            fill_type,
            convexity,
            bounds: OnceLock::new(),
            computed_convex: OnceLock::new(),
        }
    }

    /// Closed rectangle path
    pub fn rect(rect: Rect) -> Self {
        crate::PathBuilder::new().add_rect(rect).take_path(FillType::NonZero)
    }

    /// Closed ellipse inscribed in `rect`
    pub fn oval(rect: Rect) -> Self {
        crate::PathBuilder::new().add_oval(rect).take_path(FillType::NonZero)
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn fill_type(&self) -> FillType {
        self.fill_type
    }

    pub fn convexity(&self) -> Convexity {
        self.convexity
    }

    /// Iterate the drawable segments. A `Close` contributes the closing line
    /// when the contour does not already end at its start point. Drawing
    /// commands before any `MoveTo` start at the origin.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        let mut start = Point::ZERO;
        let mut current = Point::ZERO;
        self.commands.iter().filter_map(move |cmd| match *cmd {
            PathCommand::MoveTo(p) => {
                start = p;
                current = p;
                None
            }
            PathCommand::LineTo(p) => {
                let seg = Segment::Line(current, p);
                current = p;
                Some(seg)
            }
            PathCommand::QuadTo { control, end } => {
                let seg = Segment::Quad(current, control, end);
                current = end;
                Some(seg)
            }
            PathCommand::CubicTo {
                control1,
                control2,
                end,
            } => {
                let seg = Segment::Cubic(current, control1, control2, end);
                current = end;
                Some(seg)
            }
            PathCommand::Close => {
                let seg = (current != start).then_some(Segment::Line(current, start));
                current = start;
                seg
            }
        })
    }

    /// Tight bounding box of the path, `None` when the path draws nothing.
    ///
    /// Curves contribute their true extrema, not their control points.
    pub fn bounding_box(&self) -> Option<Rect> {
        *self.bounds.get_or_init(|| self.compute_bounding_box())
    }

    /// Bounding box after transformation (a superset of the exact bounds for
    /// rotating transforms)
    pub fn transformed_bounding_box(&self, transform: &Matrix) -> Option<Rect> {
        self.bounding_box().map(|b| b.transform_bounds(transform))
    }

    /// Whether the path is convex, either by declaration or by inspecting its
    /// flattened outline.
    pub fn is_convex(&self) -> bool {
        if self.convexity == Convexity::Convex {
            return true;
        }
        *self.computed_convex.get_or_init(|| {
            let polyline = self.create_polyline(SmoothingApproximation::default());
            polyline_is_convex(&polyline)
        })
    }

    pub fn create_polyline(&self, approximation: SmoothingApproximation) -> Polyline {
        Polyline::from_path(self, approximation)
    }

    fn compute_bounding_box(&self) -> Option<Rect> {
        let mut points: SmallVec<[Point; 32]> = SmallVec::new();
        for segment in self.segments() {
            match segment {
                Segment::Line(p0, p1) => {
                    points.push(p0);
                    points.push(p1);
                }
                Segment::Quad(p0, c, p1) => {
                    points.push(p0);
                    points.push(p1);
                    for t in quad_extrema(p0, c, p1).into_iter().flatten() {
                        points.push(eval_quad(p0, c, p1, t));
                    }
                }
                Segment::Cubic(p0, c1, c2, p1) => {
                    points.push(p0);
                    points.push(p1);
                    for t in cubic_extrema(p0, c1, c2, p1) {
                        points.push(eval_cubic(p0, c1, c2, p1, t));
                    }
                }
            }
        }
        Rect::from_points(points)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Curve helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn eval_quad(p0: Point, c: Point, p1: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    p0 * (mt * mt) + c * (2.0 * mt * t) + p1 * (t * t)
}

pub(crate) fn eval_cubic(p0: Point, c1: Point, c2: Point, p1: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    p0 * (mt * mt * mt) + c1 * (3.0 * mt * mt * t) + c2 * (3.0 * mt * t * t) + p1 * (t * t * t)
}

fn quad_extrema(p0: Point, c: Point, p1: Point) -> [Option<f32>; 2] {
    let axis = |a: f32, b: f32, c: f32| {
        let denom = a - 2.0 * b + c;
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = (a - b) / denom;
        (t > 0.0 && t < 1.0).then_some(t)
    };
    [axis(p0.x, c.x, p1.x), axis(p0.y, c.y, p1.y)]
}

fn cubic_extrema(p0: Point, c1: Point, c2: Point, p1: Point) -> SmallVec<[f32; 4]> {
    let mut out = SmallVec::new();
    let mut axis = |p0: f32, c1: f32, c2: f32, p1: f32| {
        // Roots of the derivative a*t^2 + b*t + c
        let a = p1 - 3.0 * c2 + 3.0 * c1 - p0;
        let b = 2.0 * (c2 - 2.0 * c1 + p0);
        let c = c1 - p0;
        if a.abs() < 1e-7 {
            if b.abs() > 1e-7 {
                out.push(-c / b);
            }
            return;
        }
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return;
        }
        let sq = disc.sqrt();
        out.push((-b + sq) / (2.0 * a));
        out.push((-b - sq) / (2.0 * a));
    };
    axis(p0.x, c1.x, c2.x, p1.x);
    axis(p0.y, c1.y, c2.y, p1.y);
    out.retain(|t| *t > 0.0 && *t < 1.0);
    out
}

/// A single closed contour whose turns all go the same way and add up to one
/// full revolution.
fn polyline_is_convex(polyline: &Polyline) -> bool {
    if polyline.contour_count() != 1 {
        return false;
    }
    let points = polyline.contour_points(0);
    let mut edges: SmallVec<[Point; 64]> = SmallVec::new();
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let edge = b - a;
        if edge.length() > f32::EPSILON {
            edges.push(edge);
        }
    }
    if edges.len() < 3 {
        return false;
    }

    let mut sign = 0.0f32;
    let mut total_turn = 0.0f32;
    for i in 0..edges.len() {
        let e0 = edges[i];
        let e1 = edges[(i + 1) % edges.len()];
        let cross = e0.cross(e1);
        let angle = cross.atan2(e0.dot(e1));
        if cross.abs() > 1e-6 {
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        } else if e0.dot(e1) < 0.0 {
            // Doubling back on itself
            return false;
        }
        total_turn += angle;
    }
    sign != 0.0 && (total_turn.abs() - TAU).abs() < 1e-2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathBuilder;

    #[test]
    fn test_empty_path_has_no_bounds() {
        let path = Path::new();
        assert!(path.bounding_box().is_none());
        let lone_move = PathBuilder::new().move_to(Point::new(3.0, 3.0)).take_path(FillType::NonZero);
        assert!(lone_move.bounding_box().is_none());
    }

    #[test]
    fn test_rect_bounds() {
        let path = Path::rect(Rect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(path.bounding_box(), Some(Rect::new(10.0, 20.0, 30.0, 40.0)));
    }

    #[test]
    fn test_cubic_bounds_use_extrema_not_control_points() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .cubic_curve_to(Point::new(0.0, 100.0), Point::new(100.0, 100.0), Point::new(100.0, 0.0))
            .take_path(FillType::NonZero);
        let bounds = path.bounding_box().unwrap();
        // Peak of this symmetric cubic is at t = 0.5, y = 75
        assert!((bounds.bottom() - 75.0).abs() < 1e-3);
        assert_eq!(bounds.left(), 0.0);
        assert_eq!(bounds.right(), 100.0);
    }

    #[test]
    fn test_quad_bounds() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .quadratic_curve_to(Point::new(50.0, 100.0), Point::new(100.0, 0.0))
            .take_path(FillType::NonZero);
        let bounds = path.bounding_box().unwrap();
        assert!((bounds.bottom() - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_horizontal_line_bounds_are_empty() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 5.0))
            .line_to(Point::new(10.0, 5.0))
            .take_path(FillType::NonZero);
        assert!(path.bounding_box().unwrap().is_empty());
    }

    #[test]
    fn test_convexity_detection() {
        let triangle = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 0.0))
            .line_to(Point::new(5.0, 10.0))
            .close()
            .take_path(FillType::NonZero);
        assert_eq!(triangle.convexity(), Convexity::Unknown);
        assert!(triangle.is_convex());

        let arrow = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(10.0, 5.0))
            .line_to(Point::new(0.0, 10.0))
            .line_to(Point::new(3.0, 5.0))
            .close()
            .take_path(FillType::NonZero);
        assert!(!arrow.is_convex());
    }

    #[test]
    fn test_self_intersecting_star_is_not_convex() {
        // Pentagram: every turn has the same sign but the total is two turns
        let mut builder = PathBuilder::new();
        for i in 0..5 {
            let angle = i as f32 * 4.0 * std::f32::consts::PI / 5.0;
            let p = Point::new(angle.cos() * 10.0, angle.sin() * 10.0);
            if i == 0 {
                builder.move_to(p);
            } else {
                builder.line_to(p);
            }
        }
        let star = builder.close().take_path(FillType::Odd);
        assert!(!star.is_convex());
    }

    #[test]
    fn test_two_contours_are_not_convex() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 10.0, 10.0))
            .add_rect(Rect::new(20.0, 0.0, 10.0, 10.0))
            .take_path(FillType::NonZero);
        assert!(!path.is_convex());
    }

    #[test]
    fn test_segments_close_adds_line() {
        let path = PathBuilder::new()
            .move_to(Point::new(0.0, 0.0))
            .line_to(Point::new(1.0, 0.0))
            .line_to(Point::new(1.0, 1.0))
            .close()
            .take_path(FillType::NonZero);
        let segments: Vec<_> = path.segments().collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2], Segment::Line(Point::new(1.0, 1.0), Point::new(0.0, 0.0)));
    }
}
