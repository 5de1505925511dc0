//! Pipeline descriptors and the shared pipeline cache
//!
//! A [`PipelineDescriptor`] is the complete configuration of a GPU pipeline.
//! Descriptors are compared and hashed by value, and the
//! [`PipelineLibrary`] uses them as keys so that identical configurations are
//! compiled once per [`Context`](crate::Context) and shared across frames and
//! threads.

use std::any::Any;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};

use crate::attachments::{
    ColorAttachmentDescriptor, DepthAttachmentDescriptor, StencilAttachmentDescriptor,
};
use crate::formats::{PixelFormat, PrimitiveType, ShaderStage};
use crate::shader::{ShaderFunction, VertexDescriptor};

/// Complete, hashable pipeline configuration
///
/// Every field participates in both equality and hashing, including the
/// label. Mutators return `&mut Self` for chaining.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineDescriptor {
    label: String,
    sample_count: u32,
    entrypoints: BTreeMap<ShaderStage, ShaderFunction>,
    color_attachment_descriptors: BTreeMap<usize, ColorAttachmentDescriptor>,
    vertex_descriptor: Option<VertexDescriptor>,
    depth_pixel_format: PixelFormat,
    stencil_pixel_format: PixelFormat,
    depth_attachment_descriptor: Option<DepthAttachmentDescriptor>,
    front_stencil_attachment_descriptor: Option<StencilAttachmentDescriptor>,
    back_stencil_attachment_descriptor: Option<StencilAttachmentDescriptor>,
    primitive_type: PrimitiveType,
}

impl Default for PipelineDescriptor {
    fn default() -> Self {
        Self {
            label: String::new(),
            sample_count: 1,
            entrypoints: BTreeMap::new(),
            color_attachment_descriptors: BTreeMap::new(),
            vertex_descriptor: None,
            depth_pixel_format: PixelFormat::Unknown,
            stencil_pixel_format: PixelFormat::Unknown,
            depth_attachment_descriptor: None,
            front_stencil_attachment_descriptor: None,
            back_stencil_attachment_descriptor: None,
            primitive_type: PrimitiveType::Triangle,
        }
    }
}

impl PipelineDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn is_equal(&self, other: &PipelineDescriptor) -> bool {
        self == other
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutators
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    pub fn set_sample_count(&mut self, samples: u32) -> &mut Self {
        self.sample_count = samples;
        self
    }

    /// Set the entrypoint for the function's stage, replacing any previous one
    pub fn add_stage_entrypoint(&mut self, function: ShaderFunction) -> &mut Self {
        self.entrypoints.insert(function.stage, function);
        self
    }

    pub fn set_vertex_descriptor(&mut self, descriptor: VertexDescriptor) -> &mut Self {
        self.vertex_descriptor = Some(descriptor);
        self
    }

    pub fn set_color_attachment_descriptor(
        &mut self,
        index: usize,
        descriptor: ColorAttachmentDescriptor,
    ) -> &mut Self {
        self.color_attachment_descriptors.insert(index, descriptor);
        self
    }

    pub fn set_depth_stencil_attachment_descriptor(
        &mut self,
        descriptor: DepthAttachmentDescriptor,
    ) -> &mut Self {
        self.depth_attachment_descriptor = Some(descriptor);
        self
    }

    /// Same stencil state for front and back faces
    pub fn set_stencil_attachment_descriptors(
        &mut self,
        front_and_back: StencilAttachmentDescriptor,
    ) -> &mut Self {
        self.set_stencil_attachment_descriptors_front_back(front_and_back, front_and_back)
    }

    pub fn set_stencil_attachment_descriptors_front_back(
        &mut self,
        front: StencilAttachmentDescriptor,
        back: StencilAttachmentDescriptor,
    ) -> &mut Self {
        self.front_stencil_attachment_descriptor = Some(front);
        self.back_stencil_attachment_descriptor = Some(back);
        self
    }

    pub fn set_depth_pixel_format(&mut self, format: PixelFormat) -> &mut Self {
        self.depth_pixel_format = format;
        self
    }

    pub fn set_stencil_pixel_format(&mut self, format: PixelFormat) -> &mut Self {
        self.stencil_pixel_format = format;
        self
    }

    pub fn set_primitive_type(&mut self, primitive_type: PrimitiveType) -> &mut Self {
        self.primitive_type = primitive_type;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Getters
    // ─────────────────────────────────────────────────────────────────────────

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn entrypoint_for_stage(&self, stage: ShaderStage) -> Option<&ShaderFunction> {
        self.entrypoints.get(&stage)
    }

    pub fn stage_entrypoints(&self) -> impl Iterator<Item = &ShaderFunction> {
        self.entrypoints.values()
    }

    pub fn color_attachment_descriptor(&self, index: usize) -> Option<&ColorAttachmentDescriptor> {
        self.color_attachment_descriptors.get(&index)
    }

    pub fn color_attachment_descriptors(
        &self,
    ) -> impl Iterator<Item = (&usize, &ColorAttachmentDescriptor)> {
        self.color_attachment_descriptors.iter()
    }

    /// Format of the color attachment at index 0
    pub fn legacy_compatible_color_format(&self) -> PixelFormat {
        self.color_attachment_descriptor(0)
            .map_or(PixelFormat::Unknown, |d| d.format)
    }

    pub fn vertex_descriptor(&self) -> Option<&VertexDescriptor> {
        self.vertex_descriptor.as_ref()
    }

    pub fn depth_attachment_descriptor(&self) -> Option<&DepthAttachmentDescriptor> {
        self.depth_attachment_descriptor.as_ref()
    }

    pub fn front_stencil_attachment_descriptor(&self) -> Option<&StencilAttachmentDescriptor> {
        self.front_stencil_attachment_descriptor.as_ref()
    }

    pub fn back_stencil_attachment_descriptor(&self) -> Option<&StencilAttachmentDescriptor> {
        self.back_stencil_attachment_descriptor.as_ref()
    }

    pub fn has_stencil_attachment_descriptors(&self) -> bool {
        self.front_stencil_attachment_descriptor.is_some()
    }

    pub fn depth_pixel_format(&self) -> PixelFormat {
        self.depth_pixel_format
    }

    pub fn stencil_pixel_format(&self) -> PixelFormat {
        self.stencil_pixel_format
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }
}

/// A compiled pipeline plus the backend object implementing it
pub struct Pipeline {
    descriptor: PipelineDescriptor,
    handle: Box<dyn Any + Send + Sync>,
}

impl Pipeline {
    pub fn new(descriptor: PipelineDescriptor, handle: impl Any + Send + Sync) -> Self {
        Self {
            descriptor,
            handle: Box::new(handle),
        }
    }

    pub fn descriptor(&self) -> &PipelineDescriptor {
        &self.descriptor
    }

    /// The backend object, if it is a `T`
    pub fn handle<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("label", &self.descriptor.label())
            .finish_non_exhaustive()
    }
}

/// Shared, read-mostly pipeline cache keyed by descriptor value
///
/// Lookups take the read lock. A miss takes the write lock and checks the
/// entry again before compiling, so concurrent misses on one descriptor
/// compile it exactly once. Failed compiles are cached as `None`.
#[derive(Default)]
pub struct PipelineLibrary {
    pipelines: RwLock<FxHashMap<PipelineDescriptor, Option<Arc<Pipeline>>>>,
    compile_count: AtomicUsize,
}

impl PipelineLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_pipeline<F>(&self, descriptor: &PipelineDescriptor, compile: F) -> Option<Arc<Pipeline>>
    where
        F: FnOnce(&PipelineDescriptor) -> Option<Pipeline>,
    {
        if let Some(entry) = self.pipelines.read().get(descriptor) {
            return entry.clone();
        }

        let mut pipelines = self.pipelines.write();
        if let Some(entry) = pipelines.get(descriptor) {
            return entry.clone();
        }

        tracing::debug!(
            "pipeline cache miss: '{}' (hash {:#x})",
            descriptor.label(),
            descriptor.get_hash()
        );
        self.compile_count.fetch_add(1, Ordering::Relaxed);
        let pipeline = compile(descriptor).map(Arc::new);
        if pipeline.is_none() {
            tracing::warn!("pipeline compile failed: '{}'", descriptor.label());
        }
        pipelines.insert(descriptor.clone(), pipeline.clone());
        pipeline
    }

    pub fn len(&self) -> usize {
        self.pipelines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.read().is_empty()
    }

    /// Number of compiles attempted, successful or not
    pub fn compile_count(&self) -> usize {
        self.compile_count.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for PipelineLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineLibrary")
            .field("len", &self.len())
            .field("compile_count", &self.compile_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{BlendMode, CompareFunction, StencilOperation};

    fn solid_fill(format: PixelFormat) -> PipelineDescriptor {
        let mut desc = PipelineDescriptor::new();
        desc.set_label("Solid Fill")
            .set_sample_count(4)
            .add_stage_entrypoint(ShaderFunction::new("solid_fill", "vs_main", ShaderStage::Vertex))
            .add_stage_entrypoint(ShaderFunction::new("solid_fill", "fs_main", ShaderStage::Fragment))
            .set_color_attachment_descriptor(
                0,
                ColorAttachmentDescriptor::from_blend_mode(BlendMode::SourceOver, format),
            )
            .set_stencil_pixel_format(PixelFormat::S8UInt)
            .set_stencil_attachment_descriptors(StencilAttachmentDescriptor::new(
                CompareFunction::Equal,
                StencilOperation::Keep,
            ));
        desc
    }

    #[test]
    fn test_identical_sequences_are_equal() {
        let a = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        let b = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        assert!(a.is_equal(&b));
        assert_eq!(a.get_hash(), b.get_hash());
    }

    #[test]
    fn test_attachment_format_flips_equality() {
        let a = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        let b = solid_fill(PixelFormat::B8G8R8A8UNormInt);
        assert!(!a.is_equal(&b));
    }

    #[test]
    fn test_label_participates_in_equality() {
        let a = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        let mut b = a.clone();
        b.set_label("Other");
        assert!(!a.is_equal(&b));
    }

    #[test]
    fn test_front_back_stencil_differs_from_shared() {
        let a = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        let mut b = a.clone();
        b.set_stencil_attachment_descriptors_front_back(
            StencilAttachmentDescriptor::new(CompareFunction::Equal, StencilOperation::Keep),
            StencilAttachmentDescriptor::new(CompareFunction::Equal, StencilOperation::IncrementWrap),
        );
        assert!(!a.is_equal(&b));
    }

    #[test]
    fn test_library_compiles_once() {
        let library = PipelineLibrary::new();
        let desc = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        let first = library.get_pipeline(&desc, |d| Some(Pipeline::new(d.clone(), ())));
        let second = library.get_pipeline(&desc, |_| panic!("cached pipeline recompiled"));
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
        assert_eq!(library.compile_count(), 1);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_library_caches_failures() {
        let library = PipelineLibrary::new();
        let desc = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        assert!(library.get_pipeline(&desc, |_| None).is_none());
        assert!(library
            .get_pipeline(&desc, |d| Some(Pipeline::new(d.clone(), ())))
            .is_none());
        assert_eq!(library.compile_count(), 1);
    }

    #[test]
    fn test_concurrent_misses_compile_once() {
        let library = Arc::new(PipelineLibrary::new());
        let desc = solid_fill(PixelFormat::R8G8B8A8UNormInt);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let library = Arc::clone(&library);
                let desc = desc.clone();
                std::thread::spawn(move || {
                    library
                        .get_pipeline(&desc, |d| Some(Pipeline::new(d.clone(), ())))
                        .is_some()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(library.compile_count(), 1);
    }

    #[test]
    fn test_handle_downcast() {
        let pipeline = Pipeline::new(PipelineDescriptor::new(), 42u32);
        assert_eq!(pipeline.handle::<u32>(), Some(&42));
        assert!(pipeline.handle::<String>().is_none());
    }
}
