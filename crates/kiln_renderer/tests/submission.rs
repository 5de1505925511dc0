//! Command buffer submission on the headless backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use kiln_core::ISize;
use kiln_renderer::{
    ColorAttachmentDescriptor, Command, CompletionDelivery, Context, HeadlessContext,
    PipelineDescriptor, PixelFormat, RenderTarget, RendererConfig, ShaderFunction, ShaderStage,
    Status, VertexBufferBuilder,
};

fn offscreen(context: &HeadlessContext, with_stencil: bool) -> RenderTarget {
    RenderTarget::create_offscreen(context, ISize::new(32, 32), "offscreen", with_stencil).unwrap()
}

fn solid_pipeline_descriptor(format: PixelFormat) -> PipelineDescriptor {
    let mut desc = PipelineDescriptor::new();
    desc.set_label("Solid Fill")
        .add_stage_entrypoint(ShaderFunction::new("solid_fill", "vs_main", ShaderStage::Vertex))
        .add_stage_entrypoint(ShaderFunction::new("solid_fill", "fs_main", ShaderStage::Fragment))
        .set_color_attachment_descriptor(
            0,
            ColorAttachmentDescriptor {
                format,
                ..Default::default()
            },
        );
    desc
}

#[test]
fn test_empty_pass_completes_exactly_once() {
    let context = HeadlessContext::default();
    let mut buffer = context.create_command_buffer().unwrap();
    assert!(buffer.is_valid());
    assert!(buffer.create_render_pass(offscreen(&context, true)).is_some());

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();
    let counter = Arc::clone(&calls);
    buffer.submit_commands(Box::new(move |status| {
        counter.fetch_add(1, Ordering::SeqCst);
        tx.send(status).unwrap();
    }));

    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Status::Completed);
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let record = context.last_submission().unwrap();
    assert_eq!(record.passes.len(), 1);
    assert_eq!(record.command_count(), 0);
}

#[test]
fn test_deferred_delivery_fires_from_another_thread() {
    let context = HeadlessContext::new(RendererConfig::default()).with_delivery(CompletionDelivery::Deferred);
    let mut buffer = context.create_command_buffer().unwrap();
    buffer.create_render_pass(offscreen(&context, true)).unwrap();

    let submitting_thread = std::thread::current().id();
    let (tx, rx) = mpsc::channel();
    buffer.submit_commands(Box::new(move |status| {
        tx.send((status, std::thread::current().id())).unwrap();
    }));

    let (status, thread) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(status, Status::Completed);
    assert_ne!(thread, submitting_thread);
    context.wait_idle();
}

#[test]
fn test_recorded_commands_are_reported() {
    let context = HeadlessContext::default();
    context.shader_library().register("solid_fill", "// wgsl");
    let pipeline = context
        .get_pipeline(&solid_pipeline_descriptor(PixelFormat::R8G8B8A8UNormInt))
        .unwrap();

    let mut buffer = context.create_command_buffer().unwrap();
    buffer.set_label("frame");
    let pass = buffer.create_render_pass(offscreen(&context, false)).unwrap();

    let mut vertices = VertexBufferBuilder::<[f32; 2]>::new();
    vertices.add_vertices([[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    let vertex_buffer = vertices.create_vertex_buffer(pass.transients_buffer()).unwrap();

    let mut command = Command::new("triangle");
    command.pipeline = Some(pipeline);
    command.bind_vertices(vertex_buffer);
    assert!(pass.add_command(command));

    let (tx, rx) = mpsc::channel();
    buffer.submit_commands(Box::new(move |status| tx.send(status).unwrap()));
    assert_eq!(rx.recv().unwrap(), Status::Completed);

    let record = context.last_submission().unwrap();
    assert_eq!(record.label, "frame");
    assert_eq!(record.passes[0].command_labels, vec!["triangle".to_string()]);
    assert_eq!(record.passes[0].size, ISize::new(32, 32));
}

#[test]
fn test_same_descriptor_shares_pipeline() {
    let context = HeadlessContext::default();
    context.shader_library().register("solid_fill", "// wgsl");
    let a = context.get_pipeline(&solid_pipeline_descriptor(PixelFormat::R8G8B8A8UNormInt));
    let b = context.get_pipeline(&solid_pipeline_descriptor(PixelFormat::R8G8B8A8UNormInt));
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(context.pipeline_library().compile_count(), 1);

    context.reject_format(PixelFormat::B8G8R8A8UNormInt);
    assert!(context
        .get_pipeline(&solid_pipeline_descriptor(PixelFormat::B8G8R8A8UNormInt))
        .is_none());
    assert_eq!(context.pipeline_library().len(), 2);
}
