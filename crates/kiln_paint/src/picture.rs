//! Finished recordings

use kiln_core::Rect;
use kiln_entity::EntityPass;

/// An immutable recording produced by [`Canvas::end_recording`]
///
/// [`Canvas::end_recording`]: crate::Canvas::end_recording
#[derive(Clone, Debug, Default)]
pub struct Picture {
    pass: EntityPass,
}

impl Picture {
    pub(crate) fn new(pass: EntityPass) -> Self {
        Self { pass }
    }

    pub fn pass(&self) -> &EntityPass {
        &self.pass
    }

    /// Device-space bounds of everything drawn, `None` when nothing is
    pub fn bounds(&self) -> Option<Rect> {
        self.pass.coverage()
    }

    pub fn is_empty(&self) -> bool {
        self.pass.entity_count() == 0
    }
}
