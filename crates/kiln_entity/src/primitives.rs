//! GPU-ready vertex and uniform layouts
//!
//! Every structure is `#[repr(C)]` and `bytemuck::Pod` so it can be written
//! straight into a pass's transient host buffer. Uniform layouts match the
//! WGSL structs in [`crate::shaders`] and are padded to 16 bytes.

use kiln_core::{Color, ColorMatrix, Matrix, Point};
use kiln_renderer::{VertexDescriptor, VertexFormat};

/// Vertex of the solid fill shader
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SolidVertex {
    pub position: [f32; 2],
}

impl SolidVertex {
    pub fn new(point: Point) -> Self {
        Self {
            position: point.to_array(),
        }
    }

    pub fn descriptor() -> VertexDescriptor {
        let mut desc = VertexDescriptor::new();
        desc.add_input("position", VertexFormat::Float32x2);
        desc
    }
}

/// Vertex of the texture fill shader
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TextureVertex {
    pub position: [f32; 2],
    pub texture_coords: [f32; 2],
}

impl TextureVertex {
    pub fn descriptor() -> VertexDescriptor {
        let mut desc = VertexDescriptor::new();
        desc.add_input("position", VertexFormat::Float32x2)
            .add_input("texture_coords", VertexFormat::Float32x2);
        desc
    }
}

/// Vertex stage uniforms shared by every shader (slot 0)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameInfo {
    /// Column-major model-view-projection matrix
    pub mvp: [f32; 16],
}

impl FrameInfo {
    pub fn new(mvp: &Matrix) -> Self {
        Self {
            mvp: mvp.to_cols_array(),
        }
    }
}

/// Fragment uniforms of the solid fill shader (slot 1)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SolidFragInfo {
    /// Premultiplied RGBA
    pub color: [f32; 4],
}

impl SolidFragInfo {
    pub fn new(color: Color) -> Self {
        Self {
            color: color.premultiply().to_array(),
        }
    }
}

/// Fragment uniforms of the texture fill shader (slot 1)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TextureFragInfo {
    pub alpha: f32,
    pub _padding: [f32; 3],
}

impl TextureFragInfo {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            _padding: [0.0; 3],
        }
    }
}

/// Fragment uniforms of the color matrix filter shader (slot 1)
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorMatrixFragInfo {
    /// Column-major 4x4 multiplier part of the matrix
    pub color_m: [f32; 16],
    /// Offset column
    pub color_v: [f32; 4],
    pub alpha: f32,
    pub _padding: [f32; 3],
}

impl ColorMatrixFragInfo {
    pub fn new(matrix: &ColorMatrix, alpha: f32) -> Self {
        let m = &matrix.array;
        let mut color_m = [0.0; 16];
        for column in 0..4 {
            for row in 0..4 {
                color_m[column * 4 + row] = m[row * 5 + column];
            }
        }
        Self {
            color_m,
            color_v: [m[4], m[9], m[14], m[19]],
            alpha: alpha.clamp(0.0, 1.0),
            _padding: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<FrameInfo>(), 64);
        assert_eq!(std::mem::size_of::<SolidFragInfo>() % 16, 0);
        assert_eq!(std::mem::size_of::<TextureFragInfo>() % 16, 0);
        assert_eq!(std::mem::size_of::<ColorMatrixFragInfo>() % 16, 0);
    }

    #[test]
    fn test_vertex_descriptors_match_layouts() {
        assert_eq!(
            SolidVertex::descriptor().stride as usize,
            std::mem::size_of::<SolidVertex>()
        );
        let texture = TextureVertex::descriptor();
        assert_eq!(texture.stride as usize, std::mem::size_of::<TextureVertex>());
        assert_eq!(texture.inputs[1].offset, 8);
        assert_eq!(texture.inputs[1].location, 1);
    }

    #[test]
    fn test_solid_color_is_premultiplied() {
        let info = SolidFragInfo::new(Color::rgba(1.0, 0.5, 0.0, 0.5));
        assert_eq!(info.color, [0.5, 0.25, 0.0, 0.5]);
    }

    #[test]
    fn test_color_matrix_is_column_major() {
        let mut matrix = ColorMatrix::IDENTITY;
        // Red row reads from green, offset on alpha
        matrix.array[0] = 0.0;
        matrix.array[1] = 1.0;
        matrix.array[19] = 0.25;
        let info = ColorMatrixFragInfo::new(&matrix, 2.0);
        assert_eq!(info.color_m[0], 0.0);
        assert_eq!(info.color_m[4], 1.0);
        assert_eq!(info.color_m[5], 1.0);
        assert_eq!(info.color_v, [0.0, 0.0, 0.0, 0.25]);
        assert_eq!(info.alpha, 1.0);
    }
}
