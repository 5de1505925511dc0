//! 4x4 transformation matrix
//!
//! Matrices are column-major value types. Composition is associative but not
//! commutative: `a * b` applies `b` first, then `a`. `concat` right-multiplies,
//! which is how canvas transforms accumulate.

use crate::geometry::{Point, Size};

/// 4x4 transformation matrix (column-major)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    pub cols: [[f32; 4]; 4],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const fn translation(x: f32, y: f32, z: f32) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    pub const fn scale(x: f32, y: f32, z: f32) -> Self {
        Self {
            cols: [
                [x, 0.0, 0.0, 0.0],
                [0.0, y, 0.0, 0.0],
                [0.0, 0.0, z, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Rotation about the Z axis (the 2D rotation), in radians
    pub fn rotation_z(radians: f32) -> Self {
        let c = radians.cos();
        let s = radians.sin();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    pub const fn skew(sx: f32, sy: f32) -> Self {
        Self {
            cols: [
                [1.0, sy, 0.0, 0.0],
                [sx, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Maps a render target of `size` pixels (origin top-left) to clip space
    pub fn orthographic(size: Size) -> Self {
        if size.is_empty() {
            return Self::scale(0.0, 0.0, 1.0);
        }
        Self::translation(-1.0, 1.0, 0.0) * Self::scale(2.0 / size.width, -2.0 / size.height, 1.0)
    }

    /// `self * other`: the result applies `other` first, then `self`
    pub fn concat(&self, other: &Matrix) -> Matrix {
        let mut result = [[0.0f32; 4]; 4];
        for (i, col) in result.iter_mut().enumerate() {
            for (j, value) in col.iter_mut().enumerate() {
                for k in 0..4 {
                    *value += self.cols[k][j] * other.cols[i][k];
                }
            }
        }
        Matrix { cols: result }
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let c = &self.cols;
        let x = c[0][0] * point.x + c[1][0] * point.y + c[3][0];
        let y = c[0][1] * point.x + c[1][1] * point.y + c[3][1];
        let w = c[0][3] * point.x + c[1][3] * point.y + c[3][3];
        if w != 0.0 && w != 1.0 {
            Point::new(x / w, y / w)
        } else {
            Point::new(x, y)
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// True when the matrix only translates and scales along the axes (no
    /// rotation, skew or perspective). Such a matrix maps rects to rects.
    pub fn is_translation_scale_only(&self) -> bool {
        let c = &self.cols;
        c[0][1] == 0.0
            && c[0][2] == 0.0
            && c[0][3] == 0.0
            && c[1][0] == 0.0
            && c[1][2] == 0.0
            && c[1][3] == 0.0
            && c[2][0] == 0.0
            && c[2][1] == 0.0
            && c[2][3] == 0.0
            && c[3][3] == 1.0
    }

    /// Length of the longest basis vector in the XY plane. Used as the scale
    /// factor when choosing a curve subdivision tolerance.
    pub fn max_basis_length_xy(&self) -> f32 {
        let c = &self.cols;
        let x = (c[0][0] * c[0][0] + c[0][1] * c[0][1]).sqrt();
        let y = (c[1][0] * c[1][0] + c[1][1] * c[1][1]).sqrt();
        x.max(y)
    }

    pub fn translation_xy(&self) -> Point {
        Point::new(self.cols[3][0], self.cols[3][1])
    }

    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (i, col) in self.cols.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(col);
        }
        out
    }

    pub fn determinant(&self) -> f32 {
        let m = self.to_cols_array();
        let inv = Self::cofactors(&m);
        m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12]
    }

    /// Inverse matrix, `None` for singular matrices
    pub fn invert(&self) -> Option<Matrix> {
        let m = self.to_cols_array();
        let inv = Self::cofactors(&m);
        let det = m[0] * inv[0] + m[1] * inv[4] + m[2] * inv[8] + m[3] * inv[12];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let mut cols = [[0.0f32; 4]; 4];
        for (i, col) in cols.iter_mut().enumerate() {
            for (j, value) in col.iter_mut().enumerate() {
                *value = inv[i * 4 + j] * inv_det;
            }
        }
        Some(Matrix { cols })
    }

    // Adjugate of a flat column-major matrix.
    fn cofactors(m: &[f32; 16]) -> [f32; 16] {
        let mut inv = [0.0f32; 16];
        inv[0] = m[5] * m[10] * m[15] - m[5] * m[11] * m[14] - m[9] * m[6] * m[15]
            + m[9] * m[7] * m[14]
            + m[13] * m[6] * m[11]
            - m[13] * m[7] * m[10];
        inv[4] = -m[4] * m[10] * m[15] + m[4] * m[11] * m[14] + m[8] * m[6] * m[15]
            - m[8] * m[7] * m[14]
            - m[12] * m[6] * m[11]
            + m[12] * m[7] * m[10];
        inv[8] = m[4] * m[9] * m[15] - m[4] * m[11] * m[13] - m[8] * m[5] * m[15]
            + m[8] * m[7] * m[13]
            + m[12] * m[5] * m[11]
            - m[12] * m[7] * m[9];
        inv[12] = -m[4] * m[9] * m[14] + m[4] * m[10] * m[13] + m[8] * m[5] * m[14]
            - m[8] * m[6] * m[13]
            - m[12] * m[5] * m[10]
            + m[12] * m[6] * m[9];
        inv[1] = -m[1] * m[10] * m[15] + m[1] * m[11] * m[14] + m[9] * m[2] * m[15]
            - m[9] * m[3] * m[14]
            - m[13] * m[2] * m[11]
            + m[13] * m[3] * m[10];
        inv[5] = m[0] * m[10] * m[15] - m[0] * m[11] * m[14] - m[8] * m[2] * m[15]
            + m[8] * m[3] * m[14]
            + m[12] * m[2] * m[11]
            - m[12] * m[3] * m[10];
        inv[9] = -m[0] * m[9] * m[15] + m[0] * m[11] * m[13] + m[8] * m[1] * m[15]
            - m[8] * m[3] * m[13]
            - m[12] * m[1] * m[11]
            + m[12] * m[3] * m[9];
        inv[13] = m[0] * m[9] * m[14] - m[0] * m[10] * m[13] - m[8] * m[1] * m[14]
            + m[8] * m[2] * m[13]
            + m[12] * m[1] * m[10]
            - m[12] * m[2] * m[9];
        inv[2] = m[1] * m[6] * m[15] - m[1] * m[7] * m[14] - m[5] * m[2] * m[15]
            + m[5] * m[3] * m[14]
            + m[13] * m[2] * m[7]
            - m[13] * m[3] * m[6];
        inv[6] = -m[0] * m[6] * m[15] + m[0] * m[7] * m[14] + m[4] * m[2] * m[15]
            - m[4] * m[3] * m[14]
            - m[12] * m[2] * m[7]
            + m[12] * m[3] * m[6];
        inv[10] = m[0] * m[5] * m[15] - m[0] * m[7] * m[13] - m[4] * m[1] * m[15]
            + m[4] * m[3] * m[13]
            + m[12] * m[1] * m[7]
            - m[12] * m[3] * m[5];
        inv[14] = -m[0] * m[5] * m[14] + m[0] * m[6] * m[13] + m[4] * m[1] * m[14]
            - m[4] * m[2] * m[13]
            - m[12] * m[1] * m[6]
            + m[12] * m[2] * m[5];
        inv[3] = -m[1] * m[6] * m[11] + m[1] * m[7] * m[10] + m[5] * m[2] * m[11]
            - m[5] * m[3] * m[10]
            - m[9] * m[2] * m[7]
            + m[9] * m[3] * m[6];
        inv[7] = m[0] * m[6] * m[11] - m[0] * m[7] * m[10] - m[4] * m[2] * m[11]
            + m[4] * m[3] * m[10]
            + m[8] * m[2] * m[7]
            - m[8] * m[3] * m[6];
        inv[11] = -m[0] * m[5] * m[11] + m[0] * m[7] * m[9] + m[4] * m[1] * m[11]
            - m[4] * m[3] * m[9]
            - m[8] * m[1] * m[7]
            + m[8] * m[3] * m[5];
        inv[15] = m[0] * m[5] * m[10] - m[0] * m[6] * m[9] - m[4] * m[1] * m[10]
            + m[4] * m[2] * m[9]
            + m[8] * m[1] * m[6]
            - m[8] * m[2] * m[5];
        inv
    }
}

impl std::ops::Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Matrix) -> Matrix {
        self.concat(&rhs)
    }
}
