//! Command buffers

use crate::render_pass::RenderPass;
use crate::render_target::RenderTarget;

/// Outcome of a submitted command buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Error,
    Completed,
}

/// Fired exactly once per submission, possibly on another thread
pub type CompletionCallback = Box<dyn FnOnce(Status) + Send + 'static>;

/// A single-use batch of render passes
///
/// Created per frame by a [`Context`](crate::Context) and used from one
/// thread. Passes are created and recorded in order, then the whole buffer is
/// submitted once. `submit_commands` consumes the buffer, so a submitted
/// buffer cannot be reused.
pub trait CommandBuffer: Send {
    fn is_valid(&self) -> bool;

    fn set_label(&mut self, label: &str);

    /// Create a pass drawing into `target`. Returns `None` when the target's
    /// attachments are unsupported or inconsistent; callers should abandon the
    /// frame rather than retry.
    fn create_render_pass(&mut self, target: RenderTarget) -> Option<&mut RenderPass>;

    /// Passes created so far, in creation order
    fn render_passes(&self) -> &[RenderPass];

    /// Hand the buffer to the GPU. `callback` fires once with `Completed` or
    /// `Error`. Callers must not assume it fires before this returns.
    fn submit_commands(self: Box<Self>, callback: CompletionCallback);
}
