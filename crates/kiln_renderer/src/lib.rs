//! Kiln renderer
//!
//! Backend-agnostic GPU submission model:
//!
//! - A [`Context`] owns the device, the [`PipelineLibrary`] and the
//!   [`ShaderLibrary`], and hands out single-use [`CommandBuffer`]s.
//! - A command buffer creates [`RenderPass`]es from [`RenderTarget`]s; each
//!   pass records [`Command`]s and owns a transient [`HostBuffer`].
//! - Submitting consumes the command buffer and fires a completion callback
//!   exactly once, possibly on another thread.
//!
//! Two backends are provided: [`backend::headless`], which records and
//! validates without a GPU, and (with the `wgpu` feature)
//! `backend::wgpu_backend`.

pub mod attachments;
pub mod backend;
pub mod buffer;
pub mod command_buffer;
pub mod config;
pub mod context;
pub mod error;
pub mod formats;
pub mod pipeline;
pub mod render_pass;
pub mod render_target;
pub mod shader;
pub mod texture;

pub use attachments::{
    ColorAttachmentDescriptor, DepthAttachmentDescriptor, StencilAttachmentDescriptor,
};
pub use backend::headless::{
    CompletionDelivery, HeadlessContext, HeadlessTexture, PassRecord, SubmissionRecord,
};
#[cfg(feature = "wgpu")]
pub use backend::wgpu_backend::{WgpuContext, WgpuTexture};
pub use buffer::{BufferView, HostBuffer, VertexBuffer, VertexBufferBuilder, UNIFORM_ALIGNMENT};
pub use command_buffer::{CommandBuffer, CompletionCallback, Status};
pub use config::RendererConfig;
pub use context::Context;
pub use error::{RendererError, Result};
pub use formats::{
    BlendFactor, BlendMode, BlendOperation, ColorWriteMask, CompareFunction, IndexType,
    LoadAction, PixelFormat, PrimitiveType, ShaderStage, StencilOperation, StoreAction,
    TextureUsage,
};
pub use pipeline::{Pipeline, PipelineDescriptor, PipelineLibrary};
pub use render_pass::{BufferBinding, Command, CommandRejection, RenderPass, TextureBinding};
pub use render_target::{
    Attachment, ColorAttachment, DepthAttachment, RenderPassDescriptor, RenderTarget,
    StencilAttachment,
};
pub use shader::{ShaderFunction, ShaderLibrary, ShaderStageIOSlot, VertexDescriptor, VertexFormat};
pub use texture::{Texture, TextureDescriptor};
