//! Render targets: the attachments a render pass draws into

use std::collections::BTreeMap;
use std::sync::Arc;

use kiln_core::{Color, ISize};

use crate::context::Context;
use crate::formats::{LoadAction, PixelFormat, StoreAction};
use crate::texture::{Texture, TextureDescriptor};

#[derive(Clone, Debug)]
pub struct Attachment {
    pub texture: Arc<dyn Texture>,
    pub resolve_texture: Option<Arc<dyn Texture>>,
    pub load_action: LoadAction,
    pub store_action: StoreAction,
}

impl Attachment {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self {
            texture,
            resolve_texture: None,
            load_action: LoadAction::Clear,
            store_action: StoreAction::Store,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColorAttachment {
    pub attachment: Attachment,
    pub clear_color: Color,
}

#[derive(Clone, Debug)]
pub struct DepthAttachment {
    pub attachment: Attachment,
    pub clear_depth: f32,
}

#[derive(Clone, Debug)]
pub struct StencilAttachment {
    pub attachment: Attachment,
    pub clear_stencil: u32,
}

/// The attachments of one render pass
#[derive(Clone, Debug, Default)]
pub struct RenderTarget {
    label: String,
    colors: BTreeMap<usize, ColorAttachment>,
    depth: Option<DepthAttachment>,
    stencil: Option<StencilAttachment>,
}

/// The descriptor a render pass is created from
pub type RenderPassDescriptor = RenderTarget;

impl RenderTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a color target with an optional stencil attachment
    pub fn create_offscreen(
        context: &dyn Context,
        size: ISize,
        label: &str,
        with_stencil: bool,
    ) -> Option<RenderTarget> {
        let config = context.config();
        let color = context.create_texture(&TextureDescriptor::render_target(
            config.color_format,
            size,
            config.sample_count,
        ))?;
        let mut target = RenderTarget::new();
        target.set_label(label).set_color_attachment(
            0,
            ColorAttachment {
                attachment: Attachment::new(color),
                clear_color: Color::TRANSPARENT,
            },
        );
        if with_stencil {
            let stencil = context.create_texture(&TextureDescriptor::render_target(
                config.stencil_format,
                size,
                config.sample_count,
            ))?;
            let mut attachment = Attachment::new(stencil);
            attachment.store_action = StoreAction::DontCare;
            target.set_stencil_attachment(StencilAttachment {
                attachment,
                clear_stencil: 0,
            });
        }
        Some(target)
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_color_attachment(&mut self, index: usize, attachment: ColorAttachment) -> &mut Self {
        self.colors.insert(index, attachment);
        self
    }

    pub fn set_depth_attachment(&mut self, attachment: DepthAttachment) -> &mut Self {
        self.depth = Some(attachment);
        self
    }

    pub fn set_stencil_attachment(&mut self, attachment: StencilAttachment) -> &mut Self {
        self.stencil = Some(attachment);
        self
    }

    pub fn has_color_attachment(&self, index: usize) -> bool {
        self.colors.contains_key(&index)
    }

    pub fn color_attachment(&self, index: usize) -> Option<&ColorAttachment> {
        self.colors.get(&index)
    }

    pub fn color_attachments(&self) -> impl Iterator<Item = (&usize, &ColorAttachment)> {
        self.colors.iter()
    }

    pub fn depth_attachment(&self) -> Option<&DepthAttachment> {
        self.depth.as_ref()
    }

    pub fn stencil_attachment(&self) -> Option<&StencilAttachment> {
        self.stencil.as_ref()
    }

    /// Size of the first color attachment
    pub fn color_attachment_size(&self) -> Option<ISize> {
        self.colors.values().next().map(|c| c.attachment.texture.size())
    }

    pub fn render_target_size(&self) -> ISize {
        self.color_attachment_size().unwrap_or_default()
    }

    pub fn color_format(&self) -> PixelFormat {
        self.color_attachment(0)
            .map_or(PixelFormat::Unknown, |c| c.attachment.texture.format())
    }

    pub fn stencil_format(&self) -> PixelFormat {
        self.stencil
            .as_ref()
            .map_or(PixelFormat::Unknown, |s| s.attachment.texture.format())
    }

    pub fn sample_count(&self) -> u32 {
        self.color_attachment(0)
            .map_or(1, |c| c.attachment.texture.descriptor().sample_count)
    }

    /// Every attached texture, color first
    pub fn textures(&self) -> impl Iterator<Item = &Arc<dyn Texture>> {
        self.colors
            .values()
            .map(|c| &c.attachment.texture)
            .chain(self.depth.iter().map(|d| &d.attachment.texture))
            .chain(self.stencil.iter().map(|s| &s.attachment.texture))
    }

    /// True when all attachments have the same size
    pub fn is_consistent(&self) -> bool {
        let mut sizes = self.textures().map(|t| t.size());
        match sizes.next() {
            Some(first) => sizes.all(|s| s == first),
            None => false,
        }
    }
}
