//! Pictures rendered through the headless backend

use std::sync::Arc;

use kiln_core::{Color, ISize, Rect};
use kiln_paint::{AiksContext, Canvas, Paint};
use kiln_renderer::{Context, HeadlessContext, RenderTarget, Status};

fn render(picture: &kiln_paint::Picture) -> (Arc<HeadlessContext>, Status) {
    let headless = Arc::new(HeadlessContext::default());
    let context: Arc<dyn Context> = headless.clone();
    let aiks = AiksContext::new(Arc::clone(&context));
    let target =
        RenderTarget::create_offscreen(context.as_ref(), ISize::new(64, 64), "onscreen", true).unwrap();

    let mut buffer = context.create_command_buffer().unwrap();
    assert!(aiks.render(picture, target, buffer.as_mut()));
    let (tx, rx) = std::sync::mpsc::channel();
    buffer.submit_commands(Box::new(move |status| {
        let _ = tx.send(status);
    }));
    let status = rx.recv().unwrap();
    (headless, status)
}

#[test]
fn test_clip_and_restore_encode_in_order() {
    let mut canvas = Canvas::new();
    canvas.save();
    canvas.clip_rect(Rect::new(8.0, 8.0, 16.0, 16.0));
    canvas.draw_rect(Rect::new(0.0, 0.0, 64.0, 64.0), &Paint::fill(Color::BLUE));
    canvas.restore();
    canvas.draw_rect(Rect::new(40.0, 40.0, 8.0, 8.0), &Paint::fill(Color::RED));

    let (headless, status) = render(&canvas.end_recording());
    assert_eq!(status, Status::Completed);
    let record = headless.last_submission().unwrap();
    assert_eq!(record.passes.len(), 1);
    assert_eq!(
        record.passes[0].command_labels,
        vec!["Clip", "Solid Fill", "Restore Clip", "Solid Fill"]
    );
}

#[test]
fn test_layer_renders_offscreen_first() {
    let mut canvas = Canvas::new();
    canvas.draw_rect(Rect::new(0.0, 0.0, 64.0, 64.0), &Paint::fill(Color::WHITE));
    canvas.save_layer(&Paint::fill(Color::BLACK.with_alpha(0.25)), None);
    canvas.draw_rect(Rect::new(4.0, 4.0, 8.0, 8.0), &Paint::stroke(Color::BLACK, 2.0));
    canvas.restore();

    let (headless, status) = render(&canvas.end_recording());
    assert_eq!(status, Status::Completed);
    let record = headless.last_submission().unwrap();
    assert_eq!(record.passes.len(), 2);
    assert_eq!(record.passes[0].command_labels, vec!["Solid Stroke"]);
    assert_eq!(record.passes[1].command_labels, vec!["Solid Fill", "Texture Fill"]);
}
