//! Points, sizes and rectangles
//!
//! `Rect` carries an explicit empty state (`Rect::EMPTY`, or any rect with a
//! non-positive width or height) so bounds math stays total: intersecting two
//! disjoint rects yields an empty rect, never a missing value.

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;

/// 2D point
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize,
)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(&self, other: Point) -> f32 {
        (*self - other).length()
    }

    /// Z component of the 3D cross product of two vectors
    pub fn cross(&self, other: Point) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn dot(&self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn to_array(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }
}

/// Integer size of a texture or render target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ISize {
    pub width: u32,
    pub height: u32,
}

impl ISize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn to_size(self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}

/// Axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    /// The empty rect. Any rect with a non-positive extent is also empty.
    pub const EMPTY: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Bounding box of a set of points, `None` when there are no points
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut l, mut t, mut r, mut b) = (first.x, first.y, first.x, first.y);
        for p in iter {
            l = l.min(p.x);
            t = t.min(p.y);
            r = r.max(p.x);
            b = b.max(p.y);
        }
        Some(Self::from_ltrb(l, t, r, b))
    }

    pub fn left(&self) -> f32 {
        self.origin.x
    }

    pub fn top(&self) -> f32 {
        self.origin.y
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Corners in clockwise order starting at the top-left
    pub fn points(&self) -> [Point; 4] {
        [
            Point::new(self.left(), self.top()),
            Point::new(self.right(), self.top()),
            Point::new(self.right(), self.bottom()),
            Point::new(self.left(), self.bottom()),
        ]
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Whether `other` lies entirely inside this rect. An empty `other` is
    /// contained by any non-empty rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        if self.is_empty() {
            return false;
        }
        if other.is_empty() {
            return true;
        }
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlap of two rects, `None` when they do not overlap
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let l = self.left().max(other.left());
        let t = self.top().max(other.top());
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        let result = Rect::from_ltrb(l, t, r, b);
        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Overlap of two rects, `Rect::EMPTY` when they do not overlap
    pub fn intersect_or_empty(&self, other: &Rect) -> Rect {
        self.intersection(other).unwrap_or(Rect::EMPTY)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Smallest rect containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_ltrb(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::from_origin_size(Point::new(self.origin.x + dx, self.origin.y + dy), self.size)
    }

    /// Grow the rect by `amount` on every side
    pub fn expand(&self, amount: f32) -> Rect {
        Rect::from_ltrb(
            self.left() - amount,
            self.top() - amount,
            self.right() + amount,
            self.bottom() + amount,
        )
    }

    /// Bounding box of this rect after transformation
    pub fn transform_bounds(&self, transform: &Matrix) -> Rect {
        let corners = self.points().map(|p| transform.transform_point(p));
        Rect::from_points(corners).unwrap_or(Rect::EMPTY)
    }

    /// Matrix mapping this rect onto the unit square, used for UV generation
    pub fn normalizing_transform(&self) -> Matrix {
        if self.is_empty() {
            return Matrix::scale(0.0, 0.0, 1.0);
        }
        Matrix::scale(1.0 / self.width(), 1.0 / self.height(), 1.0)
            * Matrix::translation(-self.left(), -self.top(), 0.0)
    }

    /// Round outwards to whole pixels
    pub fn round_out(&self) -> Rect {
        Rect::from_ltrb(
            self.left().floor(),
            self.top().floor(),
            self.right().ceil(),
            self.bottom().ceil(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_disjoint_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 5.0, 5.0);
        assert!(a.intersection(&b).is_none());
        assert_eq!(a.intersect_or_empty(&b), Rect::EMPTY);
    }

    #[test]
    fn test_intersection_edge_touching_is_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(Rect::EMPTY.union(&a), a);
        assert_eq!(a.union(&Rect::EMPTY), a);

        let b = Rect::new(-5.0, 0.0, 2.0, 2.0);
        assert_eq!(a.union(&b), Rect::from_ltrb(-5.0, 0.0, 15.0, 15.0));
    }

    #[test]
    fn test_contains_rect() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains_rect(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(outer.contains_rect(&outer));
        assert!(!outer.contains_rect(&Rect::new(90.0, 90.0, 20.0, 20.0)));
        assert!(!Rect::EMPTY.contains_rect(&Rect::EMPTY));
    }

    #[test]
    fn test_from_points() {
        assert!(Rect::from_points(Vec::<Point>::new()).is_none());
        let r = Rect::from_points([Point::new(3.0, -1.0), Point::new(-2.0, 4.0)]).unwrap();
        assert_eq!(r, Rect::from_ltrb(-2.0, -1.0, 3.0, 4.0));
    }

    #[test]
    fn test_transform_bounds_translate_scale() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let m = Matrix::translation(5.0, 5.0, 0.0) * Matrix::scale(2.0, 3.0, 1.0);
        assert_eq!(r.transform_bounds(&m), Rect::new(5.0, 5.0, 20.0, 30.0));
    }

    #[test]
    fn test_normalizing_transform() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        let m = r.normalizing_transform();
        let p = m.transform_point(Point::new(110.0, 70.0));
        assert!((p.x - 1.0).abs() < 1e-6);
        assert!((p.y - 1.0).abs() < 1e-6);
    }
}
