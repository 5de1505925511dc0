//! Kiln entities
//!
//! Turns paths and paint into recorded GPU commands:
//!
//! - [`Tessellator`] flattens paths into convex strips or lyon meshes
//! - [`Geometry`] produces vertex buffers for fills, strokes, rects and covers
//! - [`Contents`] encodes solid, stroked, textured, filtered and clip draws
//! - [`Entity`] pairs a path and transform with its contents
//! - [`EntityPass`] renders a tree of entities, with subpasses drawn
//!   offscreen and composited into their parent

pub mod content_context;
pub mod contents;
pub mod entity;
pub mod entity_pass;
pub mod error;
pub mod geometry;
pub mod primitives;
pub mod shaders;
pub mod tessellator;

pub use content_context::{ContentContext, ContentContextOptions, PipelineKind};
pub use contents::{
    ClipContents, ClipRestoreContents, Contents, FilterContents, FilterInput, FilterKind,
    SolidColorContents, SolidStrokeContents, TextureContents,
};
pub use entity::Entity;
pub use entity_pass::{Element, EntityPass};
pub use error::{Result, TessellationError};
pub use geometry::{Geometry, GeometryResult, ResultMode, MAXIMUM_COVERAGE};
pub use primitives::{ColorMatrixFragInfo, FrameInfo, SolidFragInfo, SolidVertex, TextureFragInfo, TextureVertex};
pub use tessellator::{LineCap, LineJoin, StrokeStyle, TessellatedMesh, Tessellator, LYON_TOLERANCE};
