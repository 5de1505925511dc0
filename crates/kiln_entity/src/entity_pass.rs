//! Trees of entities rendered into one render target
//!
//! A subpass is a group drawn into its own offscreen texture and composited
//! into its parent with an opacity, blend mode and optional color matrix. Offscreen targets have the
//! parent's size, so entity transforms carry over unchanged.

use std::borrow::Cow;
use std::sync::Arc;

use kiln_core::{ColorMatrix, Matrix, Path, Rect};
use kiln_renderer::{
    BlendMode, CommandBuffer, RenderTarget, Texture, TextureDescriptor,
};

use crate::content_context::ContentContext;
use crate::contents::{Contents, FilterContents, FilterInput, TextureContents};
use crate::entity::Entity;

#[derive(Clone, Debug)]
pub enum Element {
    Entity(Entity),
    Subpass(Box<EntityPass>),
}

#[derive(Clone, Debug)]
pub struct EntityPass {
    elements: Vec<Element>,
    /// Declared device-space bounds; coverage never exceeds them
    bounds: Option<Rect>,
    opacity: f32,
    blend_mode: BlendMode,
    color_filter: Option<ColorMatrix>,
    /// Stencil depth of the parent when this pass was opened
    stencil_depth: u32,
}

impl Default for EntityPass {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            bounds: None,
            opacity: 1.0,
            blend_mode: BlendMode::SourceOver,
            color_filter: None,
            stencil_depth: 0,
        }
    }
}

impl EntityPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Option<Rect>) {
        self.bounds = bounds;
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    pub fn color_filter(&self) -> Option<&ColorMatrix> {
        self.color_filter.as_ref()
    }

    /// Run the composited texture through `matrix`. Identity matrices are
    /// dropped.
    pub fn set_color_filter(&mut self, matrix: Option<ColorMatrix>) {
        self.color_filter = matrix.filter(|m| !m.is_identity());
    }

    pub fn stencil_depth(&self) -> u32 {
        self.stencil_depth
    }

    pub fn set_stencil_depth(&mut self, depth: u32) {
        self.stencil_depth = depth;
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.elements.push(Element::Entity(entity));
    }

    pub fn add_subpass(&mut self, pass: EntityPass) {
        self.elements.push(Element::Subpass(Box::new(pass)));
    }

    /// Append every element of `other`
    pub fn add_elements(&mut self, other: EntityPass) {
        self.elements.extend(other.elements);
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Entities in this pass and all subpasses
    pub fn entity_count(&self) -> usize {
        self.elements
            .iter()
            .map(|element| match element {
                Element::Entity(_) => 1,
                Element::Subpass(pass) => pass.entity_count(),
            })
            .sum()
    }

    pub fn subpass_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|element| matches!(element, Element::Subpass(_)))
            .count()
    }

    /// Visit entities depth first; stops early when `visitor` returns false
    pub fn iterate_all_entities<F: FnMut(&Entity) -> bool>(&self, visitor: &mut F) -> bool {
        for element in &self.elements {
            let keep_going = match element {
                Element::Entity(entity) => visitor(entity),
                Element::Subpass(pass) => pass.iterate_all_entities(visitor),
            };
            if !keep_going {
                return false;
            }
        }
        true
    }

    /// Move this pass under `transform` and `stencil_depth`, as when it is
    /// played back inside another recording
    pub fn rebase(&mut self, transform: &Matrix, stencil_depth: u32) {
        self.stencil_depth = self.stencil_depth.saturating_add(stencil_depth);
        self.bounds = self.bounds.map(|bounds| bounds.transform_bounds(transform));
        for element in &mut self.elements {
            match element {
                Element::Entity(entity) => {
                    entity.set_transform(transform.concat(entity.transform()));
                    entity.increment_stencil_depth(stencil_depth);
                }
                Element::Subpass(pass) => pass.rebase(transform, stencil_depth),
            }
        }
    }

    /// Union of the coverage of every element, clipped to the declared
    /// bounds. `None` when nothing is drawn.
    pub fn coverage(&self) -> Option<Rect> {
        let coverage = self
            .elements
            .iter()
            .filter_map(|element| match element {
                Element::Entity(entity) => entity.coverage(),
                Element::Subpass(pass) => pass.coverage(),
            })
            .reduce(|a, b| a.union(&b))?;
        match self.bounds {
            Some(bounds) => coverage.intersection(&bounds),
            None => Some(coverage),
        }
    }

    /// Record this pass into `command_buffer`. Subpasses get their own
    /// render passes, created before the one targeting `target`.
    pub fn render(
        &self,
        renderer: &ContentContext,
        command_buffer: &mut dyn CommandBuffer,
        target: RenderTarget,
    ) -> bool {
        if !renderer.is_valid() {
            return false;
        }
        let size = target.render_target_size();
        let target_rect = size.to_size().to_rect();

        let mut subpass_textures = Vec::with_capacity(self.subpass_count());
        for element in &self.elements {
            if let Element::Subpass(subpass) = element {
                subpass_textures.push(subpass.render_offscreen(renderer, command_buffer, &target_rect));
            }
        }
        let mut subpass_textures = subpass_textures.into_iter();

        let label = target.label().to_string();
        let Some(pass) = command_buffer.create_render_pass(target) else {
            tracing::warn!("could not create render pass '{}'", label);
            return false;
        };

        let mut success = true;
        for element in &self.elements {
            match element {
                Element::Entity(entity) => {
                    if !entity.has_renderable_contents() {
                        continue;
                    }
                    let entity = self.relative_to_floor(entity);
                    if !entity.render(renderer, pass) {
                        tracing::debug!("entity failed to render into '{}'", label);
                        success = false;
                    }
                }
                Element::Subpass(subpass) => {
                    let Some((texture, coverage)) = subpass_textures.next().flatten() else {
                        continue;
                    };
                    let mut composite = Entity::new();
                    composite.set_path(Path::rect(coverage));
                    composite.set_blend_mode(subpass.blend_mode);
                    composite.set_stencil_depth(subpass.stencil_depth.saturating_sub(self.stencil_depth));
                    composite.set_contents(Some(subpass.composite_contents(texture, coverage)));
                    success &= composite.render(renderer, pass);
                }
            }
        }
        success
    }

    /// Contents drawing this pass's offscreen `texture` back over `coverage`
    fn composite_contents(&self, texture: Arc<dyn Texture>, coverage: Rect) -> Contents {
        match self.color_filter {
            Some(matrix) => {
                let input = FilterInput::new(texture)
                    .with_source_rect(coverage)
                    .with_destination(coverage);
                Contents::Filter(FilterContents::color_matrix(matrix, input).with_opacity(self.opacity))
            }
            None => Contents::Texture(
                TextureContents::new(texture)
                    .with_source_rect(coverage)
                    .with_opacity(self.opacity),
            ),
        }
    }

    fn relative_to_floor<'a>(&self, entity: &'a Entity) -> Cow<'a, Entity> {
        if self.stencil_depth == 0 {
            return Cow::Borrowed(entity);
        }
        let mut entity = entity.clone();
        entity.set_stencil_depth(entity.stencil_depth().saturating_sub(self.stencil_depth));
        Cow::Owned(entity)
    }

    /// Render into a fresh target the size of the parent's. Returns the
    /// texture to sample and the rect it covers, or `None` when the pass is
    /// invisible or could not be drawn.
    fn render_offscreen(
        &self,
        renderer: &ContentContext,
        command_buffer: &mut dyn CommandBuffer,
        parent_rect: &Rect,
    ) -> Option<(Arc<dyn Texture>, Rect)> {
        if self.opacity <= 0.0 {
            return None;
        }
        let coverage = self.coverage()?.intersection(parent_rect)?.round_out();
        let coverage = coverage.intersection(parent_rect)?;

        let context = renderer.context();
        let size = kiln_core::ISize::new(parent_rect.width() as u32, parent_rect.height() as u32);
        let Some(mut target) =
            RenderTarget::create_offscreen(context.as_ref(), size, "EntityPass Subpass", true)
        else {
            tracing::warn!("could not allocate a {}x{} subpass target", size.width, size.height);
            return None;
        };

        let mut color = target.color_attachment(0)?.clone();
        let texture = if color.attachment.texture.descriptor().sample_count > 1 {
            let resolve = context.create_texture(&TextureDescriptor::render_target(
                color.attachment.texture.format(),
                size,
                1,
            ))?;
            color.attachment.resolve_texture = Some(Arc::clone(&resolve));
            target.set_color_attachment(0, color);
            resolve
        } else {
            Arc::clone(&color.attachment.texture)
        };

        if !self.render(renderer, command_buffer, target) {
            return None;
        }
        Some((texture, coverage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::{Color, ISize};
    use kiln_renderer::{Context, HeadlessContext};

    use crate::geometry::Geometry;

    fn filled(rect: Rect) -> Entity {
        let path = Arc::new(Path::rect(rect));
        let mut entity = Entity::new();
        entity.set_path(Arc::clone(&path));
        entity.set_contents(Some(Contents::solid_color(Color::RED, Geometry::fill_path(path))));
        entity
    }

    #[test]
    fn test_coverage_is_union_clipped_to_bounds() {
        let mut pass = EntityPass::new();
        assert_eq!(pass.coverage(), None);

        pass.add_entity(filled(Rect::new(0.0, 0.0, 10.0, 10.0)));
        pass.add_entity(filled(Rect::new(20.0, 20.0, 10.0, 10.0)));
        assert_eq!(pass.coverage(), Some(Rect::new(0.0, 0.0, 30.0, 30.0)));

        pass.set_bounds(Some(Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert_eq!(pass.coverage(), Some(Rect::new(5.0, 5.0, 10.0, 10.0)));

        pass.set_bounds(Some(Rect::new(100.0, 100.0, 1.0, 1.0)));
        assert_eq!(pass.coverage(), None);
    }

    #[test]
    fn test_subpass_coverage_counts() {
        let mut sub = EntityPass::new();
        let mut entity = filled(Rect::new(0.0, 0.0, 10.0, 10.0));
        entity.set_transform(Matrix::translation(50.0, 0.0, 0.0));
        sub.add_entity(entity);

        let mut root = EntityPass::new();
        root.add_subpass(sub);
        assert_eq!(root.coverage(), Some(Rect::new(50.0, 0.0, 10.0, 10.0)));
        assert_eq!(root.entity_count(), 1);
        assert_eq!(root.subpass_count(), 1);
    }

    #[test]
    fn test_subpass_renders_before_parent() {
        let context: Arc<dyn Context> = Arc::new(HeadlessContext::default());
        let renderer = ContentContext::new(Arc::clone(&context));
        let target =
            RenderTarget::create_offscreen(context.as_ref(), ISize::new(64, 64), "root", true).unwrap();

        let mut sub = EntityPass::new();
        sub.set_opacity(0.5);
        sub.add_entity(filled(Rect::new(0.0, 0.0, 10.0, 10.0)));

        let mut root = EntityPass::new();
        root.add_entity(filled(Rect::new(20.0, 20.0, 10.0, 10.0)));
        root.add_subpass(sub);

        let mut buffer = context.create_command_buffer().unwrap();
        assert!(root.render(&renderer, buffer.as_mut(), target));

        let passes = buffer.render_passes();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].label(), "EntityPass Subpass");
        assert_eq!(passes[0].commands().len(), 1);
        let root_labels: Vec<_> = passes[1].commands().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(root_labels, vec!["Solid Fill", "Texture Fill"]);
    }

    #[test]
    fn test_invisible_subpass_is_skipped() {
        let context: Arc<dyn Context> = Arc::new(HeadlessContext::default());
        let renderer = ContentContext::new(Arc::clone(&context));
        let target =
            RenderTarget::create_offscreen(context.as_ref(), ISize::new(64, 64), "root", true).unwrap();

        let mut transparent = EntityPass::new();
        transparent.set_opacity(0.0);
        transparent.add_entity(filled(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let mut offscreen = EntityPass::new();
        offscreen.add_entity(filled(Rect::new(500.0, 500.0, 10.0, 10.0)));

        let mut root = EntityPass::new();
        root.add_subpass(transparent);
        root.add_subpass(offscreen);

        let mut buffer = context.create_command_buffer().unwrap();
        assert!(root.render(&renderer, buffer.as_mut(), target));
        assert_eq!(buffer.render_passes().len(), 1);
        assert!(buffer.render_passes()[0].commands().is_empty());
    }

    #[test]
    fn test_rebase_moves_entities_and_subpasses() {
        let mut sub = EntityPass::new();
        sub.set_bounds(Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        sub.add_entity(filled(Rect::new(0.0, 0.0, 5.0, 5.0)));

        let mut pass = EntityPass::new();
        pass.add_entity(filled(Rect::new(0.0, 0.0, 10.0, 10.0)));
        pass.add_subpass(sub);
        pass.rebase(&Matrix::translation(10.0, 20.0, 0.0), 2);

        assert_eq!(pass.stencil_depth(), 2);
        assert_eq!(pass.coverage(), Some(Rect::new(10.0, 20.0, 10.0, 10.0)));
        let mut depths = Vec::new();
        pass.iterate_all_entities(&mut |entity| {
            depths.push(entity.stencil_depth());
            true
        });
        assert_eq!(depths, vec![2, 2]);
        match &pass.elements()[1] {
            Element::Subpass(sub) => {
                assert_eq!(sub.stencil_depth(), 2);
                assert_eq!(sub.bounds(), Some(Rect::new(10.0, 20.0, 5.0, 5.0)));
            }
            Element::Entity(_) => panic!("expected a subpass"),
        }
    }

    #[test]
    fn test_stencil_depth_is_relative_inside_subpass() {
        let mut sub = EntityPass::new();
        sub.set_stencil_depth(2);
        let mut entity = filled(Rect::new(0.0, 0.0, 10.0, 10.0));
        entity.set_stencil_depth(3);
        assert_eq!(sub.relative_to_floor(&entity).stencil_depth(), 1);
    }

    #[test]
    fn test_color_filtered_subpass_composites_through_filter() {
        let context: Arc<dyn Context> = Arc::new(HeadlessContext::default());
        let renderer = ContentContext::new(Arc::clone(&context));
        let target =
            RenderTarget::create_offscreen(context.as_ref(), ISize::new(64, 64), "root", true).unwrap();

        let mut sub = EntityPass::new();
        sub.set_color_filter(Some(ColorMatrix::IDENTITY));
        assert!(sub.color_filter().is_none());
        sub.set_color_filter(Some(ColorMatrix::saturation(0.0)));
        sub.add_entity(filled(Rect::new(0.0, 0.0, 10.0, 10.0)));

        let mut root = EntityPass::new();
        root.add_subpass(sub);

        let mut buffer = context.create_command_buffer().unwrap();
        assert!(root.render(&renderer, buffer.as_mut(), target));
        let passes = buffer.render_passes();
        assert_eq!(passes.len(), 2);
        let root_labels: Vec<_> = passes[1].commands().iter().map(|c| c.label.as_str()).collect();
        assert_eq!(root_labels, vec!["Color Matrix Filter"]);
    }
}
