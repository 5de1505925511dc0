//! Builder for constructing paths

use smallvec::SmallVec;

use crate::geometry::{Point, Rect, Size};
use crate::path::{Convexity, FillType, Path, PathCommand};

/// Magic constant for approximating a quarter ellipse with a cubic
const ARC_APPROXIMATION_MAGIC: f32 = 0.551_915_02;

/// Builder for constructing paths
///
/// Methods take `&mut self` and return `&mut Self`, so a builder can be
/// chained in one expression or kept alive behind a handle and fed one
/// command at a time.
#[derive(Debug, Default)]
pub struct PathBuilder {
    commands: SmallVec<[PathCommand; 16]>,
    current: Point,
    contour_start: Point,
    convexity: Convexity,
    fill_type: FillType,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_point(&self) -> Point {
        self.current
    }

    pub fn move_to(&mut self, point: Point) -> &mut Self {
        self.convexity = Convexity::Unknown;
        self.push_move(point);
        self
    }

    pub fn line_to(&mut self, point: Point) -> &mut Self {
        self.convexity = Convexity::Unknown;
        self.push_line(point);
        self
    }

    pub fn quadratic_curve_to(&mut self, control: Point, end: Point) -> &mut Self {
        self.convexity = Convexity::Unknown;
        self.commands.push(PathCommand::QuadTo { control, end });
        self.current = end;
        self
    }

    pub fn cubic_curve_to(&mut self, control1: Point, control2: Point, end: Point) -> &mut Self {
        self.convexity = Convexity::Unknown;
        self.push_cubic(control1, control2, end);
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.commands.push(PathCommand::Close);
        self.current = self.contour_start;
        self
    }

    pub fn set_fill_type(&mut self, fill_type: FillType) -> &mut Self {
        self.fill_type = fill_type;
        self
    }

    /// Declare the convexity of the path. Declaring `Convex` for a path that
    /// is not convex produces incorrect fills.
    pub fn set_convexity(&mut self, convexity: Convexity) -> &mut Self {
        self.convexity = convexity;
        self
    }

    pub fn add_rect(&mut self, rect: Rect) -> &mut Self {
        let was_empty = self.commands.is_empty();
        let [tl, tr, br, bl] = rect.points();
        self.push_move(tl);
        self.push_line(tr);
        self.push_line(br);
        self.push_line(bl);
        self.close();
        self.convexity = convex_if(was_empty);
        self
    }

    pub fn add_oval(&mut self, rect: Rect) -> &mut Self {
        let was_empty = self.commands.is_empty();
        let r = Size::new(rect.width() / 2.0, rect.height() / 2.0);
        let c = rect.center();
        let m = Size::new(r.width * ARC_APPROXIMATION_MAGIC, r.height * ARC_APPROXIMATION_MAGIC);

        self.push_move(Point::new(c.x, c.y - r.height));
        self.push_cubic(
            Point::new(c.x + m.width, c.y - r.height),
            Point::new(c.x + r.width, c.y - m.height),
            Point::new(c.x + r.width, c.y),
        );
        self.push_cubic(
            Point::new(c.x + r.width, c.y + m.height),
            Point::new(c.x + m.width, c.y + r.height),
            Point::new(c.x, c.y + r.height),
        );
        self.push_cubic(
            Point::new(c.x - m.width, c.y + r.height),
            Point::new(c.x - r.width, c.y + m.height),
            Point::new(c.x - r.width, c.y),
        );
        self.push_cubic(
            Point::new(c.x - r.width, c.y - m.height),
            Point::new(c.x - m.width, c.y - r.height),
            Point::new(c.x, c.y - r.height),
        );
        self.close();
        self.convexity = convex_if(was_empty);
        self
    }

    /// Rounded rectangle with elliptical corners of `radii`, clamped to half
    /// the rect's extent.
    pub fn add_round_rect(&mut self, rect: Rect, radii: Size) -> &mut Self {
        let rx = radii.width.clamp(0.0, rect.width() / 2.0);
        let ry = radii.height.clamp(0.0, rect.height() / 2.0);
        if rx <= 0.0 || ry <= 0.0 {
            return self.add_rect(rect);
        }
        let was_empty = self.commands.is_empty();
        let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
        let mx = rx * ARC_APPROXIMATION_MAGIC;
        let my = ry * ARC_APPROXIMATION_MAGIC;

        self.push_move(Point::new(l + rx, t));
        self.push_line(Point::new(r - rx, t));
        self.push_cubic(
            Point::new(r - rx + mx, t),
            Point::new(r, t + ry - my),
            Point::new(r, t + ry),
        );
        self.push_line(Point::new(r, b - ry));
        self.push_cubic(
            Point::new(r, b - ry + my),
            Point::new(r - rx + mx, b),
            Point::new(r - rx, b),
        );
        self.push_line(Point::new(l + rx, b));
        self.push_cubic(
            Point::new(l + rx - mx, b),
            Point::new(l, b - ry + my),
            Point::new(l, b - ry),
        );
        self.push_line(Point::new(l, t + ry));
        self.push_cubic(
            Point::new(l, t + ry - my),
            Point::new(l + rx - mx, t),
            Point::new(l + rx, t),
        );
        self.close();
        self.convexity = convex_if(was_empty);
        self
    }

    /// Snapshot the path built so far, leaving the builder untouched
    pub fn copy_path(&self, fill_type: FillType) -> Path {
        Path::from_parts(self.commands.clone(), fill_type, self.convexity)
    }

    /// Take the built path and reset the builder
    pub fn take_path(&mut self, fill_type: FillType) -> Path {
        let commands = std::mem::take(&mut self.commands);
        let convexity = std::mem::take(&mut self.convexity);
        self.current = Point::ZERO;
        self.contour_start = Point::ZERO;
        Path::from_parts(commands, fill_type, convexity)
    }

    /// Take the built path using the fill type from `set_fill_type`
    pub fn build(&mut self) -> Path {
        let fill_type = std::mem::take(&mut self.fill_type);
        self.take_path(fill_type)
    }

    fn push_move(&mut self, point: Point) {
        self.commands.push(PathCommand::MoveTo(point));
        self.current = point;
        self.contour_start = point;
    }

    fn push_line(&mut self, point: Point) {
        self.commands.push(PathCommand::LineTo(point));
        self.current = point;
    }

    fn push_cubic(&mut self, control1: Point, control2: Point, end: Point) {
        self.commands.push(PathCommand::CubicTo {
            control1,
            control2,
            end,
        });
        self.current = end;
    }
}

fn convex_if(single_shape: bool) -> Convexity {
    if single_shape {
        Convexity::Convex
    } else {
        Convexity::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rect_declares_convexity() {
        let path = PathBuilder::new()
            .add_rect(Rect::new(0.0, 0.0, 5.0, 5.0))
            .take_path(FillType::NonZero);
        assert_eq!(path.convexity(), Convexity::Convex);
        assert_eq!(path.commands().len(), 5);
    }

    #[test]
    fn test_oval_bounds_match_rect() {
        let rect = Rect::new(10.0, 10.0, 40.0, 20.0);
        let path = PathBuilder::new().add_oval(rect).take_path(FillType::NonZero);
        let bounds = path.bounding_box().unwrap();
        assert!((bounds.left() - 10.0).abs() < 1e-3);
        assert!((bounds.right() - 50.0).abs() < 1e-3);
        assert!((bounds.top() - 10.0).abs() < 1e-3);
        assert!((bounds.bottom() - 30.0).abs() < 1e-3);
        assert!(path.is_convex());
    }

    #[test]
    fn test_round_rect_clamps_radii() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let path = PathBuilder::new()
            .add_round_rect(rect, Size::new(50.0, 50.0))
            .take_path(FillType::NonZero);
        let bounds = path.bounding_box().unwrap();
        assert!((bounds.width() - 10.0).abs() < 1e-3);
        assert!(path.is_convex());
    }

    #[test]
    fn test_copy_keeps_builder_contents() {
        let mut builder = PathBuilder::new();
        builder.move_to(Point::new(0.0, 0.0)).line_to(Point::new(1.0, 1.0));
        let copy = builder.copy_path(FillType::Odd);
        assert_eq!(copy.fill_type(), FillType::Odd);
        assert_eq!(copy.commands().len(), 2);

        let taken = builder.take_path(FillType::NonZero);
        assert_eq!(taken.commands().len(), 2);
        assert!(builder.take_path(FillType::NonZero).is_empty());
    }

    #[test]
    fn test_build_uses_stored_fill_type() {
        let mut builder = PathBuilder::new();
        builder.set_fill_type(FillType::Odd).add_rect(Rect::new(0.0, 0.0, 1.0, 1.0));
        let path = builder.build();
        assert_eq!(path.fill_type(), FillType::Odd);
        assert_eq!(builder.build().fill_type(), FillType::NonZero);
    }

    #[test]
    fn test_close_returns_to_contour_start() {
        let mut builder = PathBuilder::new();
        builder
            .move_to(Point::new(2.0, 2.0))
            .line_to(Point::new(5.0, 2.0))
            .close();
        assert_eq!(builder.current_point(), Point::new(2.0, 2.0));
    }
}
