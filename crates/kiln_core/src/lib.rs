//! Kiln core types
//!
//! The value types shared by every Kiln crate:
//!
//! - **Geometry**: points, sizes and rects with an explicit empty state
//! - **Matrix**: 4x4 column-major transforms with right-multiplying `concat`
//! - **Color**: straight-alpha RGBA
//! - **Path**: immutable drawing commands with fill rule, cached bounds and
//!   convexity, and scale-aware curve flattening
//!
//! # Example
//!
//! ```rust
//! use kiln_core::{FillType, PathBuilder, Point};
//!
//! let path = PathBuilder::new()
//!     .move_to(Point::new(0.0, 0.0))
//!     .line_to(Point::new(1.0, 0.0))
//!     .line_to(Point::new(1.0, 1.0))
//!     .close()
//!     .take_path(FillType::NonZero);
//!
//! assert!(path.is_convex());
//! assert_eq!(path.bounding_box().unwrap().width(), 1.0);
//! ```

pub mod color;
pub mod geometry;
pub mod matrix;
pub mod path;
pub mod path_builder;
pub mod polyline;

pub use color::{Color, ColorMatrix};
pub use geometry::{ISize, Point, Rect, Size};
pub use matrix::Matrix;
pub use path::{Convexity, FillType, Path, PathCommand, Segment};
pub use path_builder::PathBuilder;
pub use polyline::{Polyline, PolylineContour, SmoothingApproximation, DEFAULT_TOLERANCE};
