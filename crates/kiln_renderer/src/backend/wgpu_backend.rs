//! wgpu backend
//!
//! Pipelines are compiled from WGSL registered in the context's
//! [`ShaderLibrary`] using automatic bind group layouts: uniforms and textures
//! live in group 0 at `binding = slot`, and a texture at slot `n` is paired
//! with a sampler at `n + 1`. Each render pass uploads its host buffer once as
//! a single vertex/index/uniform buffer.

use std::any::Any;
use std::num::NonZeroU64;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::command_buffer::{CommandBuffer, CompletionCallback, Status};
use crate::config::RendererConfig;
use crate::context::Context;
use crate::error::{RendererError, Result};
use crate::formats::{
    self, BlendFactor, BlendOperation, CompareFunction, IndexType, LoadAction, PixelFormat,
    PrimitiveType, ShaderStage, StencilOperation, StoreAction, TextureUsage,
};
use crate::pipeline::{Pipeline, PipelineDescriptor, PipelineLibrary};
use crate::render_pass::RenderPass;
use crate::render_target::RenderTarget;
use crate::shader::{ShaderLibrary, VertexFormat};
use crate::texture::{Texture, TextureDescriptor};

// ─────────────────────────────────────────────────────────────────────────────
// Conversions
// ─────────────────────────────────────────────────────────────────────────────

fn texture_format(format: PixelFormat) -> Option<wgpu::TextureFormat> {
    match format {
        PixelFormat::Unknown => None,
        PixelFormat::R8G8B8A8UNormInt => Some(wgpu::TextureFormat::Rgba8Unorm),
        PixelFormat::B8G8R8A8UNormInt => Some(wgpu::TextureFormat::Bgra8Unorm),
        PixelFormat::R8G8B8A8UNormIntSrgb => Some(wgpu::TextureFormat::Rgba8UnormSrgb),
        PixelFormat::S8UInt => Some(wgpu::TextureFormat::Stencil8),
        PixelFormat::D24UnormS8Uint => Some(wgpu::TextureFormat::Depth24PlusStencil8),
        PixelFormat::D32FloatS8UInt => Some(wgpu::TextureFormat::Depth32FloatStencil8),
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SourceColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSourceColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::SourceAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSourceAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DestinationColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDestinationColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::DestinationAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDestinationAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        BlendFactor::SourceAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
    }
}

fn blend_operation(op: BlendOperation) -> wgpu::BlendOperation {
    match op {
        BlendOperation::Add => wgpu::BlendOperation::Add,
        BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
        BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
    }
}

fn compare_function(compare: CompareFunction) -> wgpu::CompareFunction {
    match compare {
        CompareFunction::Never => wgpu::CompareFunction::Never,
        CompareFunction::Always => wgpu::CompareFunction::Always,
        CompareFunction::Less => wgpu::CompareFunction::Less,
        CompareFunction::Equal => wgpu::CompareFunction::Equal,
        CompareFunction::LessEqual => wgpu::CompareFunction::LessEqual,
        CompareFunction::Greater => wgpu::CompareFunction::Greater,
        CompareFunction::NotEqual => wgpu::CompareFunction::NotEqual,
        CompareFunction::GreaterEqual => wgpu::CompareFunction::GreaterEqual,
    }
}

fn stencil_operation(op: StencilOperation) -> wgpu::StencilOperation {
    match op {
        StencilOperation::Keep => wgpu::StencilOperation::Keep,
        StencilOperation::Zero => wgpu::StencilOperation::Zero,
        StencilOperation::SetToReferenceValue => wgpu::StencilOperation::Replace,
        StencilOperation::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
        StencilOperation::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
        StencilOperation::Invert => wgpu::StencilOperation::Invert,
        StencilOperation::IncrementWrap => wgpu::StencilOperation::IncrementWrap,
        StencilOperation::DecrementWrap => wgpu::StencilOperation::DecrementWrap,
    }
}

fn topology(primitive: PrimitiveType) -> wgpu::PrimitiveTopology {
    match primitive {
        PrimitiveType::Triangle => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveType::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        PrimitiveType::Line => wgpu::PrimitiveTopology::LineList,
        PrimitiveType::Point => wgpu::PrimitiveTopology::PointList,
    }
}

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32 => wgpu::VertexFormat::Float32,
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn texture_usage(descriptor: &TextureDescriptor) -> wgpu::TextureUsages {
    if descriptor.format.is_stencil() || descriptor.sample_count > 1 {
        return wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    let mut usage = wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;
    if descriptor.usage.contains(TextureUsage::RENDER_TARGET) {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if descriptor.usage.contains(TextureUsage::SHADER_READ) {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if descriptor.usage.contains(TextureUsage::SHADER_WRITE) {
        usage |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    usage
}

// ─────────────────────────────────────────────────────────────────────────────
// Texture
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct WgpuTexture {
    descriptor: TextureDescriptor,
    label: String,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl WgpuTexture {
    /// Wrap an existing texture, e.g. a surface frame
    pub fn from_wgpu(texture: wgpu::Texture, descriptor: TextureDescriptor, label: &str) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            descriptor,
            label: label.to_string(),
            texture,
            view,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl Texture for WgpuTexture {
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

fn wgpu_view(texture: &Arc<dyn Texture>) -> Option<&wgpu::TextureView> {
    texture
        .as_any()
        .downcast_ref::<WgpuTexture>()
        .map(WgpuTexture::view)
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// A [`Context`] over a wgpu device and queue
pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    sampler: Arc<wgpu::Sampler>,
    config: RendererConfig,
    pipelines: PipelineLibrary,
    shaders: ShaderLibrary,
}

impl WgpuContext {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, config: RendererConfig) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Kiln Linear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            device,
            queue,
            sampler: Arc::new(sampler),
            config,
            pipelines: PipelineLibrary::new(),
            shaders: ShaderLibrary::new(),
        }
    }

    /// Create a context on the default adapter with no surface
    pub fn new_headless(config: RendererConfig) -> Result<Self> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok_or(RendererError::AdapterNotFound)?;

            let (device, queue) = adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("Kiln GPU Device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: wgpu::MemoryHints::MemoryUsage,
                    },
                    None,
                )
                .await
                .map_err(|e| RendererError::Device(e.to_string()))?;

            Ok::<_, RendererError>(Self::new(Arc::new(device), Arc::new(queue), config))
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Drive completion callbacks. With `wait`, blocks until all submitted
    /// work has finished.
    pub fn poll(&self, wait: bool) {
        let maintain = if wait {
            wgpu::Maintain::Wait
        } else {
            wgpu::Maintain::Poll
        };
        self.device.poll(maintain);
    }
}

impl Context for WgpuContext {
    fn is_valid(&self) -> bool {
        true
    }

    fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn create_command_buffer(&self) -> Option<Box<dyn CommandBuffer>> {
        Some(Box::new(WgpuCommandBuffer {
            device: Arc::clone(&self.device),
            queue: Arc::clone(&self.queue),
            sampler: Arc::clone(&self.sampler),
            label: String::new(),
            passes: Vec::new(),
            max_host_buffer_size: self.config.max_host_buffer_size,
        }))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>> {
        let format = texture_format(descriptor.format)?;
        if descriptor.size.is_empty() || !self.supports_format(descriptor.format) {
            return None;
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Kiln Texture"),
            size: wgpu::Extent3d {
                width: descriptor.size.width,
                height: descriptor.size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: descriptor.sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: texture_usage(descriptor),
            view_formats: &[],
        });
        Some(Arc::new(WgpuTexture::from_wgpu(texture, *descriptor, "Kiln Texture")))
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        match format {
            PixelFormat::Unknown => false,
            PixelFormat::D32FloatS8UInt => self
                .device
                .features()
                .contains(wgpu::Features::DEPTH32FLOAT_STENCIL8),
            _ => true,
        }
    }

    fn pipeline_library(&self) -> &PipelineLibrary {
        &self.pipelines
    }

    fn shader_library(&self) -> &ShaderLibrary {
        &self.shaders
    }

    fn compile_pipeline(&self, descriptor: &PipelineDescriptor) -> Option<Pipeline> {
        let vertex_fn = descriptor.entrypoint_for_stage(ShaderStage::Vertex)?;
        let fragment_fn = descriptor.entrypoint_for_stage(ShaderStage::Fragment)?;

        let attributes: Vec<wgpu::VertexAttribute> = descriptor
            .vertex_descriptor()
            .map(|vd| {
                vd.inputs
                    .iter()
                    .map(|input| wgpu::VertexAttribute {
                        format: vertex_format(input.format),
                        offset: input.offset as u64,
                        shader_location: input.location,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let buffers: Vec<wgpu::VertexBufferLayout> = descriptor
            .vertex_descriptor()
            .map(|vd| wgpu::VertexBufferLayout {
                array_stride: vd.stride as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            })
            .into_iter()
            .collect();

        let target_count = descriptor
            .color_attachment_descriptors()
            .map(|(index, _)| index + 1)
            .max()
            .unwrap_or(0);
        let mut targets: Vec<Option<wgpu::ColorTargetState>> = vec![None; target_count];
        for (index, attachment) in descriptor.color_attachment_descriptors() {
            let format = texture_format(attachment.format)?;
            let blend = attachment.blending_enabled.then(|| wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: blend_factor(attachment.src_color_blend_factor),
                    dst_factor: blend_factor(attachment.dst_color_blend_factor),
                    operation: blend_operation(attachment.color_blend_op),
                },
                alpha: wgpu::BlendComponent {
                    src_factor: blend_factor(attachment.src_alpha_blend_factor),
                    dst_factor: blend_factor(attachment.dst_alpha_blend_factor),
                    operation: blend_operation(attachment.alpha_blend_op),
                },
            });
            targets[*index] = Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::from_bits_truncate(attachment.write_mask.bits() as u32),
            });
        }

        let depth_stencil = texture_format(descriptor.stencil_pixel_format())
            .or_else(|| texture_format(descriptor.depth_pixel_format()))
            .map(|format| {
                let face = |desc: Option<&crate::StencilAttachmentDescriptor>| {
                    let desc = desc.copied().unwrap_or_default();
                    wgpu::StencilFaceState {
                        compare: compare_function(desc.stencil_compare),
                        fail_op: stencil_operation(desc.stencil_failure),
                        depth_fail_op: stencil_operation(desc.depth_failure),
                        pass_op: stencil_operation(desc.depth_stencil_pass),
                    }
                };
                let front = descriptor.front_stencil_attachment_descriptor();
                let depth = descriptor.depth_attachment_descriptor().copied().unwrap_or_default();
                wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: depth.depth_write_enabled,
                    depth_compare: compare_function(depth.depth_compare),
                    stencil: wgpu::StencilState {
                        front: face(front),
                        back: face(descriptor.back_stencil_attachment_descriptor()),
                        read_mask: front.map_or(!0, |d| d.read_mask),
                        write_mask: front.map_or(!0, |d| d.write_mask),
                    },
                    bias: wgpu::DepthBiasState::default(),
                }
            });

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let create_module = |library_id: &str| {
            let source = self.shaders.source(library_id)?;
            Some(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(library_id),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            }))
        };
        let vertex_module = create_module(&vertex_fn.library_id);
        let fragment_module = if fragment_fn.library_id == vertex_fn.library_id {
            None
        } else {
            create_module(&fragment_fn.library_id)
        };
        let (Some(vertex_module), fragment_module) = (vertex_module, fragment_module) else {
            tracing::warn!("pipeline '{}': shader source missing", descriptor.label());
            let _ = pollster::block_on(self.device.pop_error_scope());
            return None;
        };
        let fragment_module = fragment_module.as_ref().unwrap_or(&vertex_module);

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(descriptor.label()),
            layout: None,
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some(vertex_fn.name.as_str()),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: Some(fragment_fn.name.as_str()),
                targets: &targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: topology(descriptor.primitive_type()),
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState {
                count: descriptor.sample_count(),
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            tracing::warn!("pipeline '{}' failed to compile: {}", descriptor.label(), error);
            return None;
        }
        Some(Pipeline::new(descriptor.clone(), pipeline))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command buffer
// ─────────────────────────────────────────────────────────────────────────────

struct WgpuCommandBuffer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    sampler: Arc<wgpu::Sampler>,
    label: String,
    passes: Vec<RenderPass>,
    max_host_buffer_size: usize,
}

impl WgpuCommandBuffer {
    fn encode_pass(&self, encoder: &mut wgpu::CommandEncoder, pass: &RenderPass) -> bool {
        let target = pass.render_target();
        let bytes = pass.transients().as_bytes();
        let buffer = (!bytes.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(pass.label()),
                contents: bytes,
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::INDEX
                    | wgpu::BufferUsages::UNIFORM,
            })
        });

        // Bind groups are built up front so the render pass only borrows them
        let mut bind_groups = Vec::with_capacity(pass.commands().len());
        for command in pass.commands() {
            let Some(pipeline) = command
                .pipeline
                .as_ref()
                .and_then(|p| p.handle::<wgpu::RenderPipeline>())
            else {
                return false;
            };
            let mut entries = Vec::new();
            if let Some(buffer) = &buffer {
                for binding in command.vertex_bindings.iter().chain(&command.fragment_bindings) {
                    entries.push(wgpu::BindGroupEntry {
                        binding: binding.slot,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: binding.view.offset as u64,
                            size: NonZeroU64::new(binding.view.length as u64),
                        }),
                    });
                }
            }
            for binding in &command.textures {
                let Some(view) = wgpu_view(&binding.texture) else {
                    return false;
                };
                entries.push(wgpu::BindGroupEntry {
                    binding: binding.slot,
                    resource: wgpu::BindingResource::TextureView(view),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: binding.slot + 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                });
            }
            let bind_group = (!entries.is_empty()).then(|| {
                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(command.label.as_str()),
                    layout: &pipeline.get_bind_group_layout(0),
                    entries: &entries,
                })
            });
            bind_groups.push(bind_group);
        }

        let mut color_attachments = Vec::new();
        for (_, color) in target.color_attachments() {
            let Some(view) = wgpu_view(&color.attachment.texture) else {
                return false;
            };
            let resolve_target = color.attachment.resolve_texture.as_ref().and_then(wgpu_view);
            let [r, g, b, a] = formats::clear_color(color.clear_color);
            color_attachments.push(Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: match color.attachment.load_action {
                        LoadAction::Clear => wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        LoadAction::Load | LoadAction::DontCare => wgpu::LoadOp::Load,
                    },
                    store: store_op(color.attachment.store_action),
                },
            }));
        }

        let stencil_attachment = match target.stencil_attachment() {
            Some(stencil) => {
                let Some(view) = wgpu_view(&stencil.attachment.texture) else {
                    return false;
                };
                Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: stencil.attachment.texture.format().has_depth().then_some(
                        wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Discard,
                        },
                    ),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(stencil.clear_stencil),
                        store: store_op(stencil.attachment.store_action),
                    }),
                })
            }
            None => None,
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label()),
            color_attachments: &color_attachments,
            depth_stencil_attachment: stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (command, bind_group) in pass.commands().iter().zip(&bind_groups) {
            let (Some(buffer), Some(pipeline), Some(vertices)) = (
                &buffer,
                command
                    .pipeline
                    .as_ref()
                    .and_then(|p| p.handle::<wgpu::RenderPipeline>()),
                command.vertex_buffer.vertex_buffer,
            ) else {
                continue;
            };
            render_pass.set_pipeline(pipeline);
            if let Some(bind_group) = bind_group {
                render_pass.set_bind_group(0, bind_group, &[]);
            }
            render_pass.set_stencil_reference(command.stencil_reference);
            let range = vertices.range();
            render_pass.set_vertex_buffer(0, buffer.slice(range.start as u64..range.end as u64));

            let count = command.vertex_buffer.vertex_count as u32;
            let index_format = match command.vertex_buffer.index_type {
                IndexType::U16 => Some(wgpu::IndexFormat::Uint16),
                IndexType::U32 => Some(wgpu::IndexFormat::Uint32),
                IndexType::None => None,
            };
            match (command.vertex_buffer.index_buffer, index_format) {
                (Some(indices), Some(format)) => {
                    let range = indices.range();
                    render_pass
                        .set_index_buffer(buffer.slice(range.start as u64..range.end as u64), format);
                    render_pass.draw_indexed(0..count, 0, 0..1);
                }
                _ => render_pass.draw(0..count, 0..1),
            }
        }
        true
    }
}

fn store_op(action: StoreAction) -> wgpu::StoreOp {
    match action {
        StoreAction::Store | StoreAction::MultisampleResolve => wgpu::StoreOp::Store,
        StoreAction::DontCare => wgpu::StoreOp::Discard,
    }
}

impl CommandBuffer for WgpuCommandBuffer {
    fn is_valid(&self) -> bool {
        true
    }

    fn set_label(&mut self, label: &str) {
        self.label = label.to_string();
    }

    fn create_render_pass(&mut self, target: RenderTarget) -> Option<&mut RenderPass> {
        let all_wgpu = target
            .textures()
            .all(|t| t.as_any().downcast_ref::<WgpuTexture>().is_some());
        if !target.has_color_attachment(0) || !all_wgpu || !target.is_consistent() {
            tracing::warn!("render pass '{}' has unusable attachments", target.label());
            return None;
        }
        if target.render_target_size().is_empty() {
            return None;
        }
        self.passes.push(RenderPass::new(target, self.max_host_buffer_size));
        self.passes.last_mut()
    }

    fn render_passes(&self) -> &[RenderPass] {
        &self.passes
    }

    fn submit_commands(self: Box<Self>, callback: CompletionCallback) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(self.label.as_str()),
            });

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let encoded = self.passes.iter().all(|pass| self.encode_pass(&mut encoder, pass));
        self.queue.submit(Some(encoder.finish()));
        let error = pollster::block_on(self.device.pop_error_scope());

        if let Some(error) = error {
            tracing::warn!("submission '{}' failed: {}", self.label, error);
            callback(Status::Error);
            return;
        }
        if !encoded {
            tracing::warn!("submission '{}' referenced foreign resources", self.label);
            callback(Status::Error);
            return;
        }
        tracing::debug!("submitted '{}' with {} passes", self.label, self.passes.len());
        self.queue
            .on_submitted_work_done(move || callback(Status::Completed));
    }
}
