//! Color types and utilities

use serde::{Deserialize, Serialize};

/// RGBA color with f32 components (0.0 to 1.0), straight alpha
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Serialize, Deserialize,
)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::rgba(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Color = Color::rgba(0.0, 0.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    pub fn premultiply(&self) -> Self {
        Self::rgba(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// 4x5 row-major color transform applied to straight-alpha RGBA.
///
/// Row `i` produces channel `i` as `m[i*5..i*5+4] . rgba + m[i*5+4]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorMatrix {
    pub array: [f32; 20],
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorMatrix {
    #[rustfmt::skip]
    pub const IDENTITY: ColorMatrix = ColorMatrix {
        array: [
            1.0, 0.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0, 0.0,
        ],
    };

    pub const fn new(array: [f32; 20]) -> Self {
        Self { array }
    }

    /// Saturation adjustment with Rec. 709 luma weights; 0 is grayscale
    #[rustfmt::skip]
    pub fn saturation(s: f32) -> Self {
        let (r, g, b) = (0.2126 * (1.0 - s), 0.7152 * (1.0 - s), 0.0722 * (1.0 - s));
        Self::new([
            r + s, g,     b,     0.0, 0.0,
            r,     g + s, b,     0.0, 0.0,
            r,     g,     b + s, 0.0, 0.0,
            0.0,   0.0,   0.0,   1.0, 0.0,
        ])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Transform `color`, clamping every channel to [0, 1]
    pub fn apply(&self, color: Color) -> Color {
        let input = color.to_array();
        let row = |i: usize| {
            let m = &self.array[i * 5..i * 5 + 5];
            let sum = m[0] * input[0] + m[1] * input[1] + m[2] * input[2] + m[3] * input[3] + m[4];
            sum.clamp(0.0, 1.0)
        };
        Color::rgba(row(0), row(1), row(2), row(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        let c = Color::from_hex(0xFF5500);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 85.0 / 255.0).abs() < 0.001);
        assert_eq!(c.b, 0.0);
        assert!(c.is_opaque());
    }

    #[test]
    fn test_premultiply() {
        let c = Color::rgba(1.0, 0.5, 0.0, 0.5).premultiply();
        assert_eq!(c, Color::rgba(0.5, 0.25, 0.0, 0.5));
        assert!(Color::TRANSPARENT.is_transparent());
    }

    #[test]
    fn test_color_matrix_apply() {
        let c = Color::rgba(0.2, 0.4, 0.6, 0.8);
        assert_eq!(ColorMatrix::IDENTITY.apply(c), c);
        assert!(ColorMatrix::default().is_identity());

        let gray = ColorMatrix::saturation(0.0).apply(Color::RED);
        assert!((gray.r - 0.2126).abs() < 1e-6);
        assert_eq!(gray.r, gray.g);
        assert_eq!(gray.g, gray.b);
        assert_eq!(gray.a, 1.0);

        let mut boost = ColorMatrix::IDENTITY;
        boost.array[4] = 0.5;
        assert_eq!(boost.apply(Color::RED).r, 1.0);
        assert_eq!(boost.apply(Color::BLUE).r, 0.5);
    }
}
