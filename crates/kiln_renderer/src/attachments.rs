//! Per-attachment pipeline state

use crate::formats::{
    BlendFactor, BlendMode, BlendOperation, ColorWriteMask, CompareFunction, PixelFormat,
    StencilOperation,
};

/// Blend and write state of one color attachment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorAttachmentDescriptor {
    pub format: PixelFormat,
    pub blending_enabled: bool,

    pub src_color_blend_factor: BlendFactor,
    pub color_blend_op: BlendOperation,
    pub dst_color_blend_factor: BlendFactor,

    pub src_alpha_blend_factor: BlendFactor,
    pub alpha_blend_op: BlendOperation,
    pub dst_alpha_blend_factor: BlendFactor,

    pub write_mask: ColorWriteMask,
}

impl Default for ColorAttachmentDescriptor {
    fn default() -> Self {
        Self {
            format: PixelFormat::Unknown,
            blending_enabled: false,
            src_color_blend_factor: BlendFactor::SourceAlpha,
            color_blend_op: BlendOperation::Add,
            dst_color_blend_factor: BlendFactor::OneMinusSourceAlpha,
            src_alpha_blend_factor: BlendFactor::SourceAlpha,
            alpha_blend_op: BlendOperation::Add,
            dst_alpha_blend_factor: BlendFactor::OneMinusSourceAlpha,
            write_mask: ColorWriteMask::ALL,
        }
    }
}

impl ColorAttachmentDescriptor {
    /// Blend state for `mode`, assuming premultiplied source colors
    pub fn from_blend_mode(mode: BlendMode, format: PixelFormat) -> Self {
        use BlendFactor::*;

        let (src, dst) = match mode {
            BlendMode::Clear => (Zero, Zero),
            BlendMode::Source => (One, Zero),
            BlendMode::Destination => (Zero, One),
            BlendMode::SourceOver => (One, OneMinusSourceAlpha),
            BlendMode::DestinationOver => (OneMinusDestinationAlpha, One),
            BlendMode::SourceIn => (DestinationAlpha, Zero),
            BlendMode::DestinationIn => (Zero, SourceAlpha),
            BlendMode::SourceOut => (OneMinusDestinationAlpha, Zero),
            BlendMode::DestinationOut => (Zero, OneMinusSourceAlpha),
            BlendMode::SourceATop => (DestinationAlpha, OneMinusSourceAlpha),
            BlendMode::DestinationATop => (OneMinusDestinationAlpha, SourceAlpha),
            BlendMode::Xor => (OneMinusDestinationAlpha, OneMinusSourceAlpha),
            BlendMode::Plus => (One, One),
            BlendMode::Modulate => {
                return Self {
                    format,
                    blending_enabled: true,
                    src_color_blend_factor: Zero,
                    dst_color_blend_factor: SourceColor,
                    src_alpha_blend_factor: Zero,
                    dst_alpha_blend_factor: SourceAlpha,
                    ..Default::default()
                };
            }
        };

        Self {
            format,
            blending_enabled: true,
            src_color_blend_factor: src,
            color_blend_op: BlendOperation::Add,
            dst_color_blend_factor: dst,
            src_alpha_blend_factor: src,
            alpha_blend_op: BlendOperation::Add,
            dst_alpha_blend_factor: dst,
            write_mask: ColorWriteMask::ALL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthAttachmentDescriptor {
    pub depth_compare: CompareFunction,
    pub depth_write_enabled: bool,
}

impl Default for DepthAttachmentDescriptor {
    fn default() -> Self {
        Self {
            depth_compare: CompareFunction::Always,
            depth_write_enabled: false,
        }
    }
}

/// Stencil test and update for one face
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StencilAttachmentDescriptor {
    pub stencil_compare: CompareFunction,
    /// Applied when the stencil test fails
    pub stencil_failure: StencilOperation,
    /// Applied when the stencil test passes and the depth test fails
    pub depth_failure: StencilOperation,
    /// Applied when both tests pass
    pub depth_stencil_pass: StencilOperation,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl Default for StencilAttachmentDescriptor {
    fn default() -> Self {
        Self {
            stencil_compare: CompareFunction::Always,
            stencil_failure: StencilOperation::Keep,
            depth_failure: StencilOperation::Keep,
            depth_stencil_pass: StencilOperation::Keep,
            read_mask: !0,
            write_mask: !0,
        }
    }
}

impl StencilAttachmentDescriptor {
    pub fn new(compare: CompareFunction, pass: StencilOperation) -> Self {
        Self {
            stencil_compare: compare,
            depth_stencil_pass: pass,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_over_blend() {
        let desc =
            ColorAttachmentDescriptor::from_blend_mode(BlendMode::SourceOver, PixelFormat::R8G8B8A8UNormInt);
        assert!(desc.blending_enabled);
        assert_eq!(desc.src_color_blend_factor, BlendFactor::One);
        assert_eq!(desc.dst_alpha_blend_factor, BlendFactor::OneMinusSourceAlpha);
    }

    #[test]
    fn test_modulate_uses_source_color() {
        let desc =
            ColorAttachmentDescriptor::from_blend_mode(BlendMode::Modulate, PixelFormat::R8G8B8A8UNormInt);
        assert_eq!(desc.dst_color_blend_factor, BlendFactor::SourceColor);
        assert_eq!(desc.dst_alpha_blend_factor, BlendFactor::SourceAlpha);
    }
}
