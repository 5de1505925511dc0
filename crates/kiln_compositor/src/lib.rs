//! Kiln compositor
//!
//! Drives one frame at a time: [`Compositor::draw_frame`] prerolls a
//! [`kiln_flow::LayerTree`], paints it into a canvas, renders the recorded
//! picture into a command buffer and submits it. Scenes can be described in
//! TOML ([`SceneDescription`]) and frames configured through
//! [`CompositorConfig`].

pub mod compositor;
pub mod config;
pub mod error;
pub mod scene;

pub use compositor::{Compositor, FrameOutcome};
pub use config::{CompositorConfig, FrameConfig};
pub use error::{CompositorError, Result};
pub use scene::{
    record_shapes, ChildSceneDescription, LayerDescription, SceneDescription, ShapeDescription,
};
