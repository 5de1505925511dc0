use std::sync::Arc;

use kiln_compositor::{Compositor, CompositorConfig, SceneDescription};
use kiln_renderer::{HeadlessContext, Status};

const LAYERS: &str = include_str!("../scenes/layers.toml");

#[test]
fn test_sample_scene_renders() {
    let config = CompositorConfig::default();
    let scene = SceneDescription::from_toml_str(LAYERS).unwrap();
    let mut tree = scene.build_tree(config.frame.size()).unwrap();
    let scenes = scene.build_scenes().unwrap();

    let context = Arc::new(HeadlessContext::new(config.renderer.clone()));
    let mut compositor = Compositor::new(context.clone(), config);
    let target = compositor.create_frame_target().unwrap();
    let outcome = compositor
        .draw_frame(&mut tree, &target, &scenes, Box::new(|_| {}))
        .unwrap();

    assert_eq!(outcome.stats.layers_skipped, 0);
    let submission = context.last_submission().unwrap();
    assert_eq!(submission.status, Status::Completed);
    assert_eq!(submission.passes.last().unwrap().label, "onscreen");
}
