//! Transient CPU-side buffers
//!
//! Every render pass owns a [`HostBuffer`]. Vertex data and uniforms for the
//! pass are appended to it while commands are recorded, and the backend
//! uploads it as a single GPU buffer at submission. Commands refer to ranges of
//! it through [`BufferView`]s.

use std::ops::Range;

use bytemuck::Pod;

use crate::formats::IndexType;

/// Uniform bindings must start on this boundary
pub const UNIFORM_ALIGNMENT: usize = 256;

const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// A byte range inside a pass's host buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferView {
    pub offset: usize,
    pub length: usize,
}

impl BufferView {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Growable byte arena, reset once per frame
#[derive(Debug)]
pub struct HostBuffer {
    data: Vec<u8>,
    max_size: usize,
}

impl HostBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            data: Vec::new(),
            max_size,
        }
    }

    /// Append `value` aligned to its own alignment
    pub fn emplace<T: Pod>(&mut self, value: &T) -> Option<BufferView> {
        self.emplace_bytes(bytemuck::bytes_of(value), std::mem::align_of::<T>())
    }

    pub fn emplace_slice<T: Pod>(&mut self, values: &[T]) -> Option<BufferView> {
        self.emplace_bytes(bytemuck::cast_slice(values), std::mem::align_of::<T>())
    }

    /// Append `value` on a uniform binding boundary
    pub fn emplace_uniform<T: Pod>(&mut self, value: &T) -> Option<BufferView> {
        self.emplace_bytes(bytemuck::bytes_of(value), UNIFORM_ALIGNMENT)
    }

    /// Append raw bytes. Returns `None` when the buffer would grow past its
    /// maximum size.
    pub fn emplace_bytes(&mut self, bytes: &[u8], alignment: usize) -> Option<BufferView> {
        let alignment = alignment.max(1).next_power_of_two();
        let offset = align_up(self.data.len(), alignment);
        let end = offset.checked_add(bytes.len())?;
        if end > self.max_size {
            tracing::warn!(
                "host buffer full: requested {} bytes at offset {}, max {}",
                bytes.len(),
                offset,
                self.max_size
            );
            return None;
        }
        self.data.resize(offset, 0);
        self.data.extend_from_slice(bytes);
        Some(BufferView {
            offset,
            length: bytes.len(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn view_bytes(&self, view: &BufferView) -> Option<&[u8]> {
        self.data.get(view.range())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }
}

/// Vertex (and optional index) data for one draw
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexBuffer {
    pub vertex_buffer: Option<BufferView>,
    pub index_buffer: Option<BufferView>,
    /// Number of vertices (or indices, when indexed) to draw
    pub vertex_count: usize,
    pub index_type: IndexType,
}

impl VertexBuffer {
    /// The zero-vertex buffer. Drawing it is a no-op.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

/// Accumulates vertices on the CPU before they are written to a host buffer
#[derive(Clone, Debug)]
pub struct VertexBufferBuilder<V: Pod> {
    vertices: Vec<V>,
    indices: Vec<u16>,
    label: String,
}

impl<V: Pod> Default for VertexBufferBuilder<V> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            label: String::new(),
        }
    }
}

impl<V: Pod> VertexBufferBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn reserve(&mut self, count: usize) -> &mut Self {
        self.vertices.reserve(count);
        self
    }

    pub fn append_vertex(&mut self, vertex: V) -> &mut Self {
        self.vertices.push(vertex);
        self
    }

    pub fn add_vertices(&mut self, vertices: impl IntoIterator<Item = V>) -> &mut Self {
        self.vertices.extend(vertices);
        self
    }

    pub fn append_index(&mut self, index: u16) -> &mut Self {
        self.indices.push(index);
        self
    }

    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_vertices(&self) -> bool {
        !self.vertices.is_empty()
    }

    /// Write the vertices, and an index list, to `host_buffer`. Without
    /// explicit indices the index list is sequential.
    pub fn create_vertex_buffer(&self, host_buffer: &mut HostBuffer) -> Option<VertexBuffer> {
        if self.vertices.is_empty() {
            return Some(VertexBuffer::empty());
        }
        let vertex_buffer = host_buffer.emplace_slice(&self.vertices)?;

        let (index_buffer, index_type, count) = if !self.indices.is_empty() {
            let view = host_buffer.emplace_slice(&self.indices)?;
            (view, IndexType::U16, self.indices.len())
        } else if self.vertices.len() <= u16::MAX as usize + 1 {
            let indices: Vec<u16> = (0..self.vertices.len()).map(|i| i as u16).collect();
            (host_buffer.emplace_slice(&indices)?, IndexType::U16, indices.len())
        } else {
            let indices: Vec<u32> = (0..self.vertices.len()).map(|i| i as u32).collect();
            (host_buffer.emplace_slice(&indices)?, IndexType::U32, indices.len())
        };

        Some(VertexBuffer {
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
            vertex_count: count,
            index_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniforms_are_256_aligned() {
        let mut buffer = HostBuffer::new(4096);
        buffer.emplace(&1u8).unwrap();
        let view = buffer.emplace_uniform(&[1.0f32; 4]).unwrap();
        assert_eq!(view.offset, 256);
        assert_eq!(view.length, 16);
        let next = buffer.emplace_uniform(&[2.0f32; 4]).unwrap();
        assert_eq!(next.offset, 512);
    }

    #[test]
    fn test_emplace_respects_type_alignment() {
        let mut buffer = HostBuffer::new(64);
        buffer.emplace(&1u8).unwrap();
        let view = buffer.emplace(&7u32).unwrap();
        assert_eq!(view.offset, 4);
        assert_eq!(buffer.view_bytes(&view).unwrap(), &7u32.to_ne_bytes());
    }

    #[test]
    fn test_growth_past_max_fails() {
        let mut buffer = HostBuffer::new(8);
        assert!(buffer.emplace(&[0u32; 2]).is_some());
        assert!(buffer.emplace(&0u32).is_none());
        buffer.reset();
        assert!(buffer.is_empty());
        assert!(buffer.emplace(&0u32).is_some());
    }

    #[test]
    fn test_builder_sequential_indices() {
        let mut builder = VertexBufferBuilder::<[f32; 2]>::new();
        builder
            .append_vertex([0.0, 0.0])
            .append_vertex([1.0, 0.0])
            .append_vertex([0.0, 1.0]);
        let mut host = HostBuffer::new(1024);
        let vb = builder.create_vertex_buffer(&mut host).unwrap();
        assert_eq!(vb.vertex_count, 3);
        assert_eq!(vb.index_type, IndexType::U16);
        let indices = host.view_bytes(&vb.index_buffer.unwrap()).unwrap();
        assert_eq!(bytemuck::pod_collect_to_vec::<u8, u16>(indices), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_builder_gives_empty_buffer() {
        let builder = VertexBufferBuilder::<[f32; 2]>::new();
        let mut host = HostBuffer::new(16);
        let vb = builder.create_vertex_buffer(&mut host).unwrap();
        assert!(vb.is_empty());
        assert!(host.is_empty());
    }
}
