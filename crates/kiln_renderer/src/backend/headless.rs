//! Record-and-validate backend
//!
//! Runs the whole recording path without a GPU. Submission validates every
//! recorded command against its pass, keeps a [`SubmissionRecord`] for
//! inspection, and reports completion either immediately or from a worker
//! thread. Formats can be rejected and submissions failed on demand to drive
//! error paths.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use kiln_core::ISize;

use crate::command_buffer::{CommandBuffer, CompletionCallback, Status};
use crate::config::RendererConfig;
use crate::context::Context;
use crate::formats::{PixelFormat, ShaderStage};
use crate::pipeline::{Pipeline, PipelineDescriptor, PipelineLibrary};
use crate::render_pass::RenderPass;
use crate::render_target::RenderTarget;
use crate::shader::ShaderLibrary;
use crate::texture::{Texture, TextureDescriptor};

/// When completion callbacks fire
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionDelivery {
    /// Before `submit_commands` returns
    #[default]
    Immediate,
    /// From a spawned thread
    Deferred,
}

/// What one render pass recorded
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassRecord {
    pub label: String,
    pub size: ISize,
    pub command_count: usize,
    pub command_labels: Vec<String>,
}

/// What one submission contained and how it ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionRecord {
    pub label: String,
    pub passes: Vec<PassRecord>,
    pub status: Status,
}

impl SubmissionRecord {
    pub fn command_count(&self) -> usize {
        self.passes.iter().map(|p| p.command_count).sum()
    }
}

#[derive(Debug)]
pub struct HeadlessTexture {
    descriptor: TextureDescriptor,
    label: String,
}

impl HeadlessTexture {
    pub fn new(descriptor: TextureDescriptor, label: impl Into<String>) -> Self {
        Self {
            descriptor,
            label: label.into(),
        }
    }
}

impl Texture for HeadlessTexture {
    fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
struct Shared {
    delivery: Mutex<CompletionDelivery>,
    rejected_formats: RwLock<FxHashSet<PixelFormat>>,
    fail_next_submission: AtomicBool,
    submissions: Mutex<Vec<SubmissionRecord>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn supports_format(&self, format: PixelFormat) -> bool {
        format != PixelFormat::Unknown && !self.rejected_formats.read().contains(&format)
    }
}

/// A [`Context`] that records instead of rendering
pub struct HeadlessContext {
    config: RendererConfig,
    shared: Arc<Shared>,
    pipelines: PipelineLibrary,
    shaders: ShaderLibrary,
    valid: AtomicBool,
    texture_count: AtomicUsize,
}

impl HeadlessContext {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            pipelines: PipelineLibrary::new(),
            shaders: ShaderLibrary::new(),
            valid: AtomicBool::new(true),
            texture_count: AtomicUsize::new(0),
        }
    }

    pub fn with_delivery(self, delivery: CompletionDelivery) -> Self {
        self.set_delivery(delivery);
        self
    }

    pub fn set_delivery(&self, delivery: CompletionDelivery) {
        *self.shared.delivery.lock() = delivery;
    }

    /// Treat `format` as unsupported from now on
    pub fn reject_format(&self, format: PixelFormat) {
        self.shared.rejected_formats.write().insert(format);
    }

    /// Make the next submission report `Status::Error`
    pub fn fail_next_submission(&self) {
        self.shared.fail_next_submission.store(true, Ordering::SeqCst);
    }

    /// An invalid context creates no command buffers
    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.shared.submissions.lock().clone()
    }

    pub fn last_submission(&self) -> Option<SubmissionRecord> {
        self.shared.submissions.lock().last().cloned()
    }

    pub fn textures_created(&self) -> usize {
        self.texture_count.load(Ordering::Relaxed)
    }

    /// Deferred callback threads not yet joined or pruned
    pub fn pending_workers(&self) -> usize {
        self.shared.workers.lock().len()
    }

    /// Block until every deferred completion callback has run
    pub fn wait_idle(&self) {
        let workers = std::mem::take(&mut *self.shared.workers.lock());
        for worker in workers {
            if worker.join().is_err() {
                tracing::warn!("completion callback panicked");
            }
        }
    }
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl Context for HeadlessContext {
    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }

    fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn create_command_buffer(&self) -> Option<Box<dyn CommandBuffer>> {
        if !self.is_valid() {
            tracing::warn!("command buffer requested from an invalid context");
            return None;
        }
        Some(Box::new(HeadlessCommandBuffer {
            label: String::new(),
            passes: Vec::new(),
            shared: Arc::clone(&self.shared),
            max_host_buffer_size: self.config.max_host_buffer_size,
        }))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>> {
        if !self.shared.supports_format(descriptor.format) || descriptor.size.is_empty() {
            tracing::warn!(
                "texture rejected: format={:?} size={}x{}",
                descriptor.format,
                descriptor.size.width,
                descriptor.size.height
            );
            return None;
        }
        let id = self.texture_count.fetch_add(1, Ordering::Relaxed);
        Some(Arc::new(HeadlessTexture::new(
            *descriptor,
            format!("headless texture {}", id),
        )))
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        self.shared.supports_format(format)
    }

    fn pipeline_library(&self) -> &PipelineLibrary {
        &self.pipelines
    }

    fn shader_library(&self) -> &ShaderLibrary {
        &self.shaders
    }

    fn compile_pipeline(&self, descriptor: &PipelineDescriptor) -> Option<Pipeline> {
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let Some(function) = descriptor.entrypoint_for_stage(stage) else {
                tracing::warn!("pipeline '{}' has no {:?} entrypoint", descriptor.label(), stage);
                return None;
            };
            if !self.shaders.contains(&function.library_id) {
                tracing::warn!(
                    "pipeline '{}' references unknown shader library '{}'",
                    descriptor.label(),
                    function.library_id
                );
                return None;
            }
        }
        let format = descriptor.legacy_compatible_color_format();
        if !self.supports_format(format) {
            tracing::warn!("pipeline '{}' targets unsupported format {:?}", descriptor.label(), format);
            return None;
        }
        Some(Pipeline::new(descriptor.clone(), ()))
    }
}

struct HeadlessCommandBuffer {
    label: String,
    passes: Vec<RenderPass>,
    shared: Arc<Shared>,
    max_host_buffer_size: usize,
}

impl HeadlessCommandBuffer {
    fn validate(&self) -> Status {
        for pass in &self.passes {
            for command in pass.commands() {
                if let Err(reason) = pass.validate_command(command) {
                    tracing::warn!(
                        "submission '{}': command '{}' in pass '{}' is invalid: {:?}",
                        self.label,
                        command.label,
                        pass.label(),
                        reason
                    );
                    return Status::Error;
                }
            }
        }
        Status::Completed
    }
}

impl CommandBuffer for HeadlessCommandBuffer {
    fn is_valid(&self) -> bool {
        true
    }

    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    fn create_render_pass(&mut self, target: RenderTarget) -> Option<&mut RenderPass> {
        if !target.has_color_attachment(0) {
            tracing::warn!("render pass '{}' has no color attachment", target.label());
            return None;
        }
        if let Some(texture) = target
            .textures()
            .find(|t| !self.shared.supports_format(t.format()))
        {
            tracing::warn!(
                "render pass '{}' uses unsupported format {:?}",
                target.label(),
                texture.format()
            );
            return None;
        }
        if !target.is_consistent() {
            tracing::warn!("render pass '{}' has mismatched attachment sizes", target.label());
            return None;
        }
        self.passes.push(RenderPass::new(target, self.max_host_buffer_size));
        self.passes.last_mut()
    }

    fn render_passes(&self) -> &[RenderPass] {
        &self.passes
    }

    fn submit_commands(self: Box<Self>, callback: CompletionCallback) {
        let status = if self.shared.fail_next_submission.swap(false, Ordering::SeqCst) {
            Status::Error
        } else {
            self.validate()
        };

        let record = SubmissionRecord {
            label: self.label.clone(),
            passes: self
                .passes
                .iter()
                .map(|pass| PassRecord {
                    label: pass.label().to_string(),
                    size: pass.render_target_size(),
                    command_count: pass.commands().len(),
                    command_labels: pass.commands().iter().map(|c| c.label.clone()).collect(),
                })
                .collect(),
            status,
        };
        tracing::debug!(
            "submitted '{}': {} passes, {} commands, {:?}",
            record.label,
            record.passes.len(),
            record.command_count(),
            status
        );
        self.shared.submissions.lock().push(record);

        let delivery = *self.shared.delivery.lock();
        match delivery {
            CompletionDelivery::Immediate => callback(status),
            CompletionDelivery::Deferred => {
                let worker = std::thread::spawn(move || callback(status));
                let mut workers = self.shared.workers.lock();
                workers.retain(|worker| !worker.is_finished());
                workers.push(worker);
            }
        }
    }
}
