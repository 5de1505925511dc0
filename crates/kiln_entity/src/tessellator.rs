//! Path tessellation
//!
//! Two strategies:
//! - [`Tessellator::tessellate_convex`] flattens a path and emits a single
//!   triangle strip. It is exact for convex paths and gives correct winding
//!   counts for any path, which is what stencil-then-cover needs.
//! - [`Tessellator::tessellate`] and [`Tessellator::tessellate_stroke`] run
//!   lyon's fill and stroke tessellators and produce indexed triangle lists.

use kiln_core::{FillType, Matrix, Path, PathCommand, Point, Polyline, SmoothingApproximation};
use kiln_renderer::{HostBuffer, VertexBuffer, VertexBufferBuilder};
use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, StrokeOptions,
    StrokeTessellator, StrokeVertex, VertexBuffers,
};
use lyon::math::point;
use lyon::path::PathEvent;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TessellationError};
use crate::primitives::{SolidVertex, TextureVertex};

/// Default lyon tolerance in device pixels
pub const LYON_TOLERANCE: f32 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Stroke parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 4.0,
        }
    }
}

impl StrokeStyle {
    pub fn new(width: f32) -> Self {
        Self {
            width: width.max(0.0),
            ..Default::default()
        }
    }

    /// How far the stroke can reach outside the path's bounds
    pub fn outset(&self) -> f32 {
        let half = self.width * 0.5;
        match self.join {
            LineJoin::Miter => half * self.miter_limit.max(1.0),
            _ if self.cap == LineCap::Square => half * std::f32::consts::SQRT_2,
            _ => half,
        }
    }
}

/// Indexed triangle list produced by lyon
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TessellatedMesh {
    pub vertices: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

impl TessellatedMesh {
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }

    /// Write the mesh into `host_buffer` as [`SolidVertex`] data
    pub fn create_vertex_buffer(&self, host_buffer: &mut HostBuffer) -> Option<VertexBuffer> {
        let mut builder = VertexBufferBuilder::<SolidVertex>::new();
        builder.set_label("tessellated mesh");
        builder.add_vertices(self.vertices.iter().map(|&position| SolidVertex { position }));
        for &index in &self.indices {
            builder.append_index(index);
        }
        builder.create_vertex_buffer(host_buffer)
    }

    /// Triangle vertices with the index list expanded, as x,y pairs
    pub fn deindexed(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.indices.len() * 2);
        for &index in &self.indices {
            if let Some(v) = self.vertices.get(index as usize) {
                out.extend_from_slice(v);
            }
        }
        out
    }
}

/// Converts paths into vertex data
#[derive(Clone, Debug)]
pub struct Tessellator {
    tolerance: f32,
}

impl Default for Tessellator {
    fn default() -> Self {
        Self {
            tolerance: LYON_TOLERANCE,
        }
    }
}

impl Tessellator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            tolerance: tolerance.max(f32::EPSILON),
        }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Flatten `path` and write one triangle strip covering every contour.
    ///
    /// Returns the empty vertex buffer when the path encloses nothing or the
    /// host buffer is full.
    pub fn tessellate_convex(
        &self,
        path: &Path,
        host_buffer: &mut HostBuffer,
        approximation: SmoothingApproximation,
    ) -> VertexBuffer {
        let strip = convex_strip(&path.create_polyline(approximation));
        let mut builder = VertexBufferBuilder::<SolidVertex>::new();
        builder.set_label("convex strip");
        builder.add_vertices(strip.into_iter().map(SolidVertex::new));
        builder.create_vertex_buffer(host_buffer).unwrap_or_else(|| {
            tracing::warn!("host buffer full, dropping {} strip vertices", builder.vertex_count());
            VertexBuffer::empty()
        })
    }

    /// Like [`Self::tessellate_convex`] with texture coordinates computed
    /// by applying `uv_transform` to each position
    pub fn tessellate_convex_uv(
        &self,
        path: &Path,
        host_buffer: &mut HostBuffer,
        approximation: SmoothingApproximation,
        uv_transform: &Matrix,
    ) -> VertexBuffer {
        let strip = convex_strip(&path.create_polyline(approximation));
        let mut builder = VertexBufferBuilder::<TextureVertex>::new();
        builder.set_label("convex uv strip");
        builder.add_vertices(strip.into_iter().map(|p| TextureVertex {
            position: p.to_array(),
            texture_coords: uv_transform.transform_point(p).to_array(),
        }));
        builder.create_vertex_buffer(host_buffer).unwrap_or_else(|| {
            tracing::warn!("host buffer full, dropping {} uv strip vertices", builder.vertex_count());
            VertexBuffer::empty()
        })
    }

    /// Triangulate a flattened outline honoring `fill_type`. On success the
    /// callback receives the vertices as x,y pairs and a 16-bit index list;
    /// returning false from it fails the call.
    pub fn tessellate<F>(&self, fill_type: FillType, polyline: &Polyline, callback: F) -> Result<()>
    where
        F: FnOnce(&[f32], &[u16]) -> bool,
    {
        if polyline.points.is_empty() {
            return Err(TessellationError::EmptyInput);
        }
        let events = polyline_to_lyon_events(polyline);

        let mut geometry: VertexBuffers<[f32; 2], u16> = VertexBuffers::new();
        let mut tessellator = FillTessellator::new();
        let options = FillOptions::default()
            .with_tolerance(self.tolerance)
            .with_fill_rule(match fill_type {
                FillType::NonZero => FillRule::NonZero,
                FillType::Odd => FillRule::EvenOdd,
            });

        tessellator.tessellate(
            events.iter().cloned(),
            &options,
            &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        )?;

        let vertices: &[f32] = bytemuck::cast_slice(&geometry.vertices);
        if callback(vertices, &geometry.indices) {
            Ok(())
        } else {
            Err(TessellationError::CallbackRejected)
        }
    }

    /// Exact fill triangulation of `path` at the given approximation
    pub fn tessellate_fill(
        &self,
        path: &Path,
        approximation: SmoothingApproximation,
    ) -> Result<TessellatedMesh> {
        let polyline = path.create_polyline(approximation);
        let mut mesh = TessellatedMesh::default();
        self.tessellate(path.fill_type(), &polyline, |vertices, indices| {
            mesh.vertices = vertices
                .chunks_exact(2)
                .map(|pair| [pair[0], pair[1]])
                .collect();
            mesh.indices = indices.to_vec();
            true
        })?;
        Ok(mesh)
    }

    /// Triangulate the outline of `path` stroked with `style`. `scale` is the
    /// device scale of the path so curves stay smooth under magnification.
    pub fn tessellate_stroke(
        &self,
        path: &Path,
        style: &StrokeStyle,
        scale: f32,
    ) -> Result<TessellatedMesh> {
        let events = path_to_lyon_events(path);
        if events.is_empty() || style.width <= 0.0 {
            return Ok(TessellatedMesh::default());
        }

        let tolerance = if scale > 0.0 {
            self.tolerance / scale
        } else {
            self.tolerance
        };
        let options = StrokeOptions::default()
            .with_line_width(style.width)
            .with_tolerance(tolerance)
            .with_line_cap(match style.cap {
                LineCap::Butt => lyon::lyon_tessellation::LineCap::Butt,
                LineCap::Round => lyon::lyon_tessellation::LineCap::Round,
                LineCap::Square => lyon::lyon_tessellation::LineCap::Square,
            })
            .with_line_join(match style.join {
                LineJoin::Miter => lyon::lyon_tessellation::LineJoin::Miter,
                LineJoin::Round => lyon::lyon_tessellation::LineJoin::Round,
                LineJoin::Bevel => lyon::lyon_tessellation::LineJoin::Bevel,
            })
            .with_miter_limit(style.miter_limit.max(1.0));

        let mut geometry: VertexBuffers<[f32; 2], u16> = VertexBuffers::new();
        let mut tessellator = StrokeTessellator::new();
        let result = tessellator.tessellate(
            events.iter().cloned(),
            &options,
            &mut BuffersBuilder::new(&mut geometry, |vertex: StrokeVertex| {
                vertex.position().to_array()
            }),
        );

        if let Err(err) = result {
            tracing::warn!("Path stroke tessellation failed: {:?}", err);
            return Err(err.into());
        }

        Ok(TessellatedMesh {
            vertices: geometry.vertices,
            indices: geometry.indices,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strip generation
// ─────────────────────────────────────────────────────────────────────────────

/// Zig-zag strip through each contour (first, second, last, third, second to
/// last, ...), contours joined by degenerate triangles.
fn convex_strip(polyline: &Polyline) -> Vec<Point> {
    let mut out: Vec<Point> =
        Vec::with_capacity(polyline.points.len() + polyline.contour_count() * 2);

    for index in 0..polyline.contour_count() {
        let mut points = polyline.contour_points(index);
        if points.len() > 1 && points.first() == points.last() {
            points = &points[..points.len() - 1];
        }
        if points.len() < 3 {
            continue;
        }

        if let Some(&last) = out.last() {
            out.push(last);
            out.push(points[0]);
        }

        out.push(points[0]);
        let mut a = 1;
        let mut b = points.len() - 1;
        while a < b {
            out.push(points[a]);
            out.push(points[b]);
            a += 1;
            b -= 1;
        }
        if a == b {
            out.push(points[a]);
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// lyon conversion
// ─────────────────────────────────────────────────────────────────────────────

/// Every contour closed, as fills require
fn polyline_to_lyon_events(polyline: &Polyline) -> Vec<PathEvent> {
    let mut events = Vec::with_capacity(polyline.points.len() + polyline.contour_count() * 2);
    for index in 0..polyline.contour_count() {
        let points = polyline.contour_points(index);
        let Some((first, rest)) = points.split_first() else {
            continue;
        };
        let first = point(first.x, first.y);
        let mut last = first;
        events.push(PathEvent::Begin { at: first });
        for p in rest {
            let to = point(p.x, p.y);
            if to == last {
                continue;
            }
            events.push(PathEvent::Line { from: last, to });
            last = to;
        }
        // The closing edge comes from `close`
        if last == first && events.len() > 1 {
            if let Some(PathEvent::Line { from, .. }) = events.last().copied() {
                events.pop();
                last = from;
            }
        }
        events.push(PathEvent::End {
            last,
            first,
            close: true,
        });
    }
    events
}

/// Path commands as lyon events, curves kept. Drawing before any `MoveTo`
/// starts at the origin; a `Close` ends the contour and the next drawing
/// command reopens one at the contour start.
fn path_to_lyon_events(path: &Path) -> Vec<PathEvent> {
    let mut events = Vec::with_capacity(path.commands().len() + 2);
    let mut first: Option<Point> = None;
    let mut start = Point::ZERO;
    let mut current = Point::ZERO;

    let lp = |p: Point| point(p.x, p.y);

    for cmd in path.commands() {
        if !matches!(cmd, PathCommand::MoveTo(_) | PathCommand::Close) && first.is_none() {
            events.push(PathEvent::Begin { at: lp(current) });
            first = Some(current);
            start = current;
        }
        match *cmd {
            PathCommand::MoveTo(p) => {
                if let Some(f) = first.take() {
                    events.push(PathEvent::End {
                        last: lp(current),
                        first: lp(f),
                        close: false,
                    });
                }
                events.push(PathEvent::Begin { at: lp(p) });
                first = Some(p);
                start = p;
                current = p;
            }
            PathCommand::LineTo(p) => {
                events.push(PathEvent::Line {
                    from: lp(current),
                    to: lp(p),
                });
                current = p;
            }
            PathCommand::QuadTo { control, end } => {
                events.push(PathEvent::Quadratic {
                    from: lp(current),
                    ctrl: lp(control),
                    to: lp(end),
                });
                current = end;
            }
            PathCommand::CubicTo {
                control1,
                control2,
                end,
            } => {
                events.push(PathEvent::Cubic {
                    from: lp(current),
                    ctrl1: lp(control1),
                    ctrl2: lp(control2),
                    to: lp(end),
                });
                current = end;
            }
            PathCommand::Close => {
                if let Some(f) = first.take() {
                    events.push(PathEvent::End {
                        last: lp(current),
                        first: lp(f),
                        close: true,
                    });
                }
                current = start;
            }
        }
    }

    if let Some(f) = first {
        events.push(PathEvent::End {
            last: lp(current),
            first: lp(f),
            close: false,
        });
    }
    events
}
