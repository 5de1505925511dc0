//! Kiln flow
//!
//! Retained-mode layer tree. Each frame runs two traversals in child order:
//!
//! 1. **Preroll** (bottom-up) computes every layer's paint bounds. A clip
//!    whose children fall outside it ends up with empty bounds.
//! 2. **Paint** (top-down) replays the tree onto a [`kiln_paint::Canvas`],
//!    skipping layers with empty bounds. Canvas state pushed by a layer is
//!    popped by a scoped guard, so an error from a child still leaves the
//!    canvas as it was.
//!
//! Layers are a closed enum; [`Layer::preroll`], [`Layer::paint`] and
//! [`Layer::update_scene`] dispatch over it.

pub mod clip;
pub mod context;
pub mod error;
pub mod layer;
pub mod layer_tree;
pub mod picture;
pub mod transform;

pub use clip::{ClipRRectLayer, ClipRectLayer};
pub use context::{
    AutoRestore, ChildScenePlacement, FrameStatistics, PaintContext, PrerollContext,
    SceneRegistry, SceneToken, SceneUpdateContext,
};
pub use error::{LayerError, Result};
pub use layer::{ContainerLayer, Layer};
pub use layer_tree::{LayerTree, PrerollResult};
pub use picture::{ChildSceneLayer, PictureLayer};
pub use transform::{OpacityLayer, TransformLayer};
