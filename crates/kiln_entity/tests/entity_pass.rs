//! Entity passes recorded and submitted through the headless backend

use std::sync::Arc;

use kiln_core::{Color, FillType, ISize, Matrix, Path, PathBuilder, Point, Rect};
use kiln_entity::{ContentContext, Contents, Entity, EntityPass, Geometry};
use kiln_renderer::{Context, HeadlessContext, RenderTarget, Status};

fn setup() -> (Arc<HeadlessContext>, ContentContext, RenderTarget) {
    let headless = Arc::new(HeadlessContext::default());
    let context: Arc<dyn Context> = headless.clone();
    let renderer = ContentContext::new(Arc::clone(&context));
    let target = RenderTarget::create_offscreen(context.as_ref(), ISize::new(100, 100), "onscreen", true)
        .unwrap();
    (headless, renderer, target)
}

fn fill(path: Path, color: Color) -> Entity {
    let path = Arc::new(path);
    let mut entity = Entity::new();
    entity.set_path(Arc::clone(&path));
    entity.set_contents(Some(Contents::solid_color(color, Geometry::fill_path(path))));
    entity
}

fn submit(headless: &HeadlessContext, pass: &EntityPass, renderer: &ContentContext, target: RenderTarget) -> Status {
    let mut buffer = headless.create_command_buffer().unwrap();
    buffer.set_label("frame");
    assert!(pass.render(renderer, buffer.as_mut(), target));
    let (tx, rx) = std::sync::mpsc::channel();
    buffer.submit_commands(Box::new(move |status| {
        let _ = tx.send(status);
    }));
    rx.recv().unwrap()
}

#[test]
fn test_nested_subpasses_submit_in_dependency_order() {
    let (headless, renderer, target) = setup();

    let mut inner = EntityPass::new();
    inner.add_entity(fill(Path::rect(Rect::new(10.0, 10.0, 20.0, 20.0)), Color::BLUE));

    let mut outer = EntityPass::new();
    outer.set_opacity(0.5);
    outer.add_subpass(inner);

    let mut root = EntityPass::new();
    root.add_entity(fill(Path::rect(Rect::new(0.0, 0.0, 100.0, 100.0)), Color::WHITE));
    root.add_subpass(outer);

    assert_eq!(submit(&headless, &root, &renderer, target), Status::Completed);

    let record = headless.last_submission().unwrap();
    assert_eq!(record.passes.len(), 3);
    assert_eq!(record.passes[0].command_labels, vec!["Solid Fill".to_string()]);
    assert_eq!(record.passes[1].command_labels, vec!["Texture Fill".to_string()]);
    assert_eq!(
        record.passes[2].command_labels,
        vec!["Solid Fill".to_string(), "Texture Fill".to_string()]
    );
    assert_eq!(record.passes[2].label, "onscreen");
}

#[test]
fn test_clipped_concave_fill_is_triangulated() {
    let (headless, renderer, target) = setup();

    let mut clip = Entity::new();
    clip.set_path(Path::rect(Rect::new(0.0, 0.0, 50.0, 50.0)));
    clip.set_is_clip(true);

    let star = PathBuilder::new()
        .move_to(Point::new(50.0, 0.0))
        .line_to(Point::new(80.0, 100.0))
        .line_to(Point::new(0.0, 35.0))
        .line_to(Point::new(100.0, 35.0))
        .line_to(Point::new(20.0, 100.0))
        .close()
        .take_path(FillType::NonZero);
    let mut shape = fill(star, Color::RED);
    shape.set_stencil_depth(1);
    shape.set_transform(Matrix::IDENTITY);

    let mut root = EntityPass::new();
    root.add_entity(clip);
    root.add_entity(shape);

    assert_eq!(submit(&headless, &root, &renderer, target), Status::Completed);
    let record = headless.last_submission().unwrap();
    assert_eq!(
        record.passes[0].command_labels,
        vec!["Clip".to_string(), "Solid Fill".to_string()]
    );
}
