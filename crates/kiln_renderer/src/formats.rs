//! Formats, blend state and other enums shared by every backend

use serde::{Deserialize, Serialize};

use kiln_core::Color;

/// Texel formats for attachments and textures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "rgba8_unorm")]
    R8G8B8A8UNormInt,
    #[serde(rename = "bgra8_unorm")]
    B8G8R8A8UNormInt,
    #[serde(rename = "rgba8_unorm_srgb")]
    R8G8B8A8UNormIntSrgb,
    #[serde(rename = "stencil8")]
    S8UInt,
    #[serde(rename = "depth24_stencil8")]
    D24UnormS8Uint,
    #[serde(rename = "depth32float_stencil8")]
    D32FloatS8UInt,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Unknown => 0,
            PixelFormat::S8UInt => 1,
            PixelFormat::R8G8B8A8UNormInt
            | PixelFormat::B8G8R8A8UNormInt
            | PixelFormat::R8G8B8A8UNormIntSrgb
            | PixelFormat::D24UnormS8Uint => 4,
            PixelFormat::D32FloatS8UInt => 5,
        }
    }

    pub fn is_color(&self) -> bool {
        matches!(
            self,
            PixelFormat::R8G8B8A8UNormInt
                | PixelFormat::B8G8R8A8UNormInt
                | PixelFormat::R8G8B8A8UNormIntSrgb
        )
    }

    pub fn is_stencil(&self) -> bool {
        matches!(
            self,
            PixelFormat::S8UInt | PixelFormat::D24UnormS8Uint | PixelFormat::D32FloatS8UInt
        )
    }

    pub fn has_depth(&self) -> bool {
        matches!(self, PixelFormat::D24UnormS8Uint | PixelFormat::D32FloatS8UInt)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    OneMinusDestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    SourceAlphaSaturated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
}

/// Bit set of color channels a pipeline writes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorWriteMask(u8);

impl ColorWriteMask {
    pub const NONE: ColorWriteMask = ColorWriteMask(0);
    pub const RED: ColorWriteMask = ColorWriteMask(1 << 0);
    pub const GREEN: ColorWriteMask = ColorWriteMask(1 << 1);
    pub const BLUE: ColorWriteMask = ColorWriteMask(1 << 2);
    pub const ALPHA: ColorWriteMask = ColorWriteMask(1 << 3);
    pub const ALL: ColorWriteMask = ColorWriteMask(0b1111);

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: ColorWriteMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for ColorWriteMask {
    type Output = ColorWriteMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        ColorWriteMask(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    #[default]
    Always,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    #[default]
    Keep,
    Zero,
    SetToReferenceValue,
    IncrementClamp,
    DecrementClamp,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadAction {
    DontCare,
    Load,
    #[default]
    Clear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StoreAction {
    DontCare,
    #[default]
    Store,
    MultisampleResolve,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    #[default]
    Triangle,
    TriangleStrip,
    Line,
    Point,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexType {
    #[default]
    None,
    U16,
    U32,
}

impl IndexType {
    pub fn byte_size(&self) -> usize {
        match self {
            IndexType::None => 0,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Porter-Duff compositing modes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Clear,
    Source,
    Destination,
    #[default]
    SourceOver,
    DestinationOver,
    SourceIn,
    DestinationIn,
    SourceOut,
    DestinationOut,
    SourceATop,
    DestinationATop,
    Xor,
    Plus,
    Modulate,
}

/// Usage flags for textures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextureUsage(u8);

impl TextureUsage {
    pub const SHADER_READ: TextureUsage = TextureUsage(1 << 0);
    pub const SHADER_WRITE: TextureUsage = TextureUsage(1 << 1);
    pub const RENDER_TARGET: TextureUsage = TextureUsage(1 << 2);

    pub const fn contains(&self, other: TextureUsage) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TextureUsage {
    type Output = TextureUsage;

    fn bitor(self, rhs: Self) -> Self::Output {
        TextureUsage(self.0 | rhs.0)
    }
}

/// Converts a straight-alpha color to the premultiplied form attachments are
/// cleared with.
pub fn clear_color(color: Color) -> [f64; 4] {
    let c = color.premultiply();
    [c.r as f64, c.g as f64, c.b as f64, c.a as f64]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_classes() {
        assert!(PixelFormat::B8G8R8A8UNormInt.is_color());
        assert!(!PixelFormat::S8UInt.is_color());
        assert!(PixelFormat::D24UnormS8Uint.is_stencil());
        assert!(!PixelFormat::S8UInt.has_depth());
        assert_eq!(PixelFormat::Unknown.bytes_per_pixel(), 0);
    }

    #[test]
    fn test_write_mask_bits() {
        let rgb = ColorWriteMask::RED | ColorWriteMask::GREEN | ColorWriteMask::BLUE;
        assert!(ColorWriteMask::ALL.contains(rgb));
        assert!(!rgb.contains(ColorWriteMask::ALPHA));
        assert!(ColorWriteMask::NONE.is_empty());
    }
}
