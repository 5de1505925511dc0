//! Frame loop: preroll, paint, render, submit

use std::sync::Arc;

use kiln_core::Rect;
use kiln_flow::{FrameStatistics, LayerTree, SceneRegistry};
use kiln_paint::{AiksContext, Canvas};
use kiln_renderer::{ColorAttachment, CompletionCallback, Context, RenderTarget};

use crate::config::CompositorConfig;
use crate::error::{CompositorError, Result};

/// What one call to [`Compositor::draw_frame`] produced
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutcome {
    pub frame_number: u64,
    pub paint_bounds: Rect,
    pub stats: FrameStatistics,
    /// Render passes recorded, offscreen layers included
    pub pass_count: usize,
    /// Draw commands recorded across every pass
    pub command_count: usize,
    /// False when some entity failed to encode; the frame is still submitted
    pub complete: bool,
}

pub struct Compositor {
    context: Arc<dyn Context>,
    aiks: AiksContext,
    config: CompositorConfig,
    frame_count: u64,
}

impl Compositor {
    pub fn new(context: Arc<dyn Context>, config: CompositorConfig) -> Self {
        let aiks = AiksContext::new(Arc::clone(&context));
        Self {
            context,
            aiks,
            config,
            frame_count: 0,
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<dyn Context> {
        &self.context
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Allocate an onscreen-sized target from the frame config
    pub fn create_frame_target(&self) -> Result<RenderTarget> {
        let size = self.config.frame.size();
        RenderTarget::create_offscreen(self.context.as_ref(), size, "onscreen", true).ok_or(
            CompositorError::NoRenderTarget {
                width: size.width,
                height: size.height,
            },
        )
    }

    /// Composite `tree` into `target` and submit. `callback` fires exactly
    /// once if this returns `Ok`, and never otherwise.
    pub fn draw_frame(
        &mut self,
        tree: &mut LayerTree,
        target: &RenderTarget,
        scenes: &SceneRegistry,
        callback: CompletionCallback,
    ) -> Result<FrameOutcome> {
        if !self.context.is_valid() || !self.aiks.is_valid() {
            return Err(CompositorError::InvalidContext);
        }
        self.frame_count += 1;
        let frame_number = self.frame_count;
        let _span = tracing::debug_span!("frame", number = frame_number).entered();

        let preroll = tree.preroll();

        let mut canvas = Canvas::new();
        let stats = tree.paint(&mut canvas, scenes)?;
        let picture = canvas.end_recording();

        let mut command_buffer = self
            .context
            .create_command_buffer()
            .ok_or(CompositorError::NoCommandBuffer)?;
        command_buffer.set_label(&format!("Frame {frame_number}"));

        let mut target = target.clone();
        if let Some(color) = target.color_attachment(0).cloned() {
            target.set_color_attachment(
                0,
                ColorAttachment {
                    clear_color: self.config.frame.clear_color,
                    ..color
                },
            );
        }
        let label = target.label().to_string();

        let complete = self.aiks.render(&picture, target, command_buffer.as_mut());
        let passes = command_buffer.render_passes();
        // Offscreen passes come first; the frame's own pass is always last
        if passes.last().map(|pass| pass.label()) != Some(label.as_str()) {
            return Err(CompositorError::NoRenderPass(label));
        }
        if !complete {
            tracing::warn!("frame {} composited partially", frame_number);
        }

        let outcome = FrameOutcome {
            frame_number,
            paint_bounds: preroll.paint_bounds,
            stats,
            pass_count: passes.len(),
            command_count: passes.iter().map(|pass| pass.commands().len()).sum(),
            complete,
        };
        tracing::debug!(
            "frame {}: {} passes, {} commands, bounds {:?}",
            frame_number,
            outcome.pass_count,
            outcome.command_count,
            outcome.paint_bounds
        );

        command_buffer.submit_commands(callback);
        Ok(outcome)
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("config", &self.config)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}
