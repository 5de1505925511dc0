//! Renders pictures into render targets

use std::sync::Arc;

use kiln_entity::ContentContext;
use kiln_renderer::{CommandBuffer, Context, RenderTarget};

use crate::picture::Picture;

#[derive(Debug)]
pub struct AiksContext {
    renderer: ContentContext,
}

impl AiksContext {
    pub fn new(context: Arc<dyn Context>) -> Self {
        Self {
            renderer: ContentContext::new(context),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.renderer.is_valid()
    }

    pub fn content_context(&self) -> &ContentContext {
        &self.renderer
    }

    /// Record `picture` into passes of `command_buffer`, the last of which
    /// targets `render_target`
    pub fn render(
        &self,
        picture: &Picture,
        render_target: RenderTarget,
        command_buffer: &mut dyn CommandBuffer,
    ) -> bool {
        if !self.is_valid() {
            tracing::warn!("cannot render picture: context is not valid");
            return false;
        }
        picture.pass().render(&self.renderer, command_buffer, render_target)
    }
}
