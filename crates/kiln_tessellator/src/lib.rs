//! Kiln tessellator C ABI
//!
//! A procedural interface for triangulating paths from other languages.
//! Build a path with [`CreatePathBuilder`], [`MoveTo`], [`LineTo`],
//! [`CubicTo`] and [`Close`], triangulate it with [`Tessellate`], and free
//! the results with [`DestroyVertices`] and [`DestroyPathBuilder`].
//! `include/kiln_tessellator.h` declares the same functions for C callers.

#![allow(non_snake_case)]

use kiln_core::{FillType, Path, PathBuilder, Point, SmoothingApproximation};
use kiln_entity::{Result, Tessellator};

/// Triangle vertices as x,y pairs, three pairs per triangle
#[repr(C)]
#[derive(Debug)]
pub struct Vertices {
    pub points: *mut f32,
    /// Number of floats in `points`
    pub length: u32,
}

/// Map a C fill type to [`FillType`]: 0 is non-zero, 1 is even-odd
pub fn fill_type_from_raw(fill_type: i32) -> Option<FillType> {
    match fill_type {
        0 => Some(FillType::NonZero),
        1 => Some(FillType::Odd),
        _ => None,
    }
}

/// Triangulate `path`, repeating shared vertices so every three x,y pairs
/// form one triangle
pub fn tessellate_path(path: &Path, approximation: SmoothingApproximation) -> Result<Vec<f32>> {
    let polyline = path.create_polyline(approximation);
    let mut points = Vec::new();
    Tessellator::new().tessellate(path.fill_type(), &polyline, |vertices, indices| {
        points.reserve(indices.len() * 2);
        for &index in indices {
            let i = usize::from(index) * 2;
            match vertices.get(i..i + 2) {
                Some(pair) => points.extend_from_slice(pair),
                None => return false,
            }
        }
        true
    })?;
    Ok(points)
}

// ─────────────────────────────────────────────────────────────────────────────
// Path building
// ─────────────────────────────────────────────────────────────────────────────

#[no_mangle]
pub extern "C" fn CreatePathBuilder() -> *mut PathBuilder {
    Box::into_raw(Box::new(PathBuilder::new()))
}

/// # Safety
///
/// `builder` must be null or a pointer returned by [`CreatePathBuilder`]
/// that has not been destroyed.
#[no_mangle]
pub unsafe extern "C" fn DestroyPathBuilder(builder: *mut PathBuilder) {
    if !builder.is_null() {
        drop(Box::from_raw(builder));
    }
}

/// # Safety
///
/// `builder` must be null or a live pointer from [`CreatePathBuilder`].
#[no_mangle]
pub unsafe extern "C" fn MoveTo(builder: *mut PathBuilder, x: f32, y: f32) {
    if let Some(builder) = builder.as_mut() {
        builder.move_to(Point::new(x, y));
    }
}

/// # Safety
///
/// `builder` must be null or a live pointer from [`CreatePathBuilder`].
#[no_mangle]
pub unsafe extern "C" fn LineTo(builder: *mut PathBuilder, x: f32, y: f32) {
    if let Some(builder) = builder.as_mut() {
        builder.line_to(Point::new(x, y));
    }
}

/// # Safety
///
/// `builder` must be null or a live pointer from [`CreatePathBuilder`].
#[no_mangle]
pub unsafe extern "C" fn CubicTo(
    builder: *mut PathBuilder,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    x3: f32,
    y3: f32,
) {
    if let Some(builder) = builder.as_mut() {
        builder.cubic_curve_to(Point::new(x1, y1), Point::new(x2, y2), Point::new(x3, y3));
    }
}

/// # Safety
///
/// `builder` must be null or a live pointer from [`CreatePathBuilder`].
#[no_mangle]
pub unsafe extern "C" fn Close(builder: *mut PathBuilder) {
    if let Some(builder) = builder.as_mut() {
        builder.close();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tessellation
// ─────────────────────────────────────────────────────────────────────────────

/// Triangulate the builder's current path. Returns null when the builder is
/// null, the fill type is unknown, or tessellation fails. The builder keeps
/// its path and can be tessellated again.
///
/// # Safety
///
/// `builder` must be null or a live pointer from [`CreatePathBuilder`]. A
/// non-null result must be released with [`DestroyVertices`] exactly once.
#[no_mangle]
pub unsafe extern "C" fn Tessellate(
    builder: *mut PathBuilder,
    fill_type: i32,
    scale: f32,
    angle_tolerance: f32,
    cusp_limit: f32,
) -> *mut Vertices {
    let Some(builder) = builder.as_ref() else {
        return std::ptr::null_mut();
    };
    let Some(fill_type) = fill_type_from_raw(fill_type) else {
        tracing::warn!("Tessellate called with unknown fill type {}", fill_type);
        return std::ptr::null_mut();
    };

    let path = builder.copy_path(fill_type);
    let approximation = SmoothingApproximation::new(scale, angle_tolerance, cusp_limit);
    let points = match tessellate_path(&path, approximation) {
        Ok(points) => points,
        Err(err) => {
            tracing::warn!("Tessellate failed: {}", err);
            return std::ptr::null_mut();
        }
    };
    let Ok(length) = u32::try_from(points.len()) else {
        return std::ptr::null_mut();
    };

    let points = Box::into_raw(points.into_boxed_slice()) as *mut f32;
    Box::into_raw(Box::new(Vertices { points, length }))
}

/// # Safety
///
/// `vertices` must be null or a pointer returned by [`Tessellate`] that has
/// not been destroyed.
#[no_mangle]
pub unsafe extern "C" fn DestroyVertices(vertices: *mut Vertices) {
    if vertices.is_null() {
        return;
    }
    let vertices = Box::from_raw(vertices);
    if !vertices.points.is_null() {
        let points = std::ptr::slice_from_raw_parts_mut(vertices.points, vertices.length as usize);
        drop(Box::from_raw(points));
    }
}
