//! Shader functions, shader sources and vertex layouts

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::formats::ShaderStage;

/// One entrypoint of a shader library
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderFunction {
    pub library_id: String,
    pub name: String,
    pub stage: ShaderStage,
}

impl ShaderFunction {
    pub fn new(library_id: impl Into<String>, name: impl Into<String>, stage: ShaderStage) -> Self {
        Self {
            library_id: library_id.into(),
            name: name.into(),
            stage,
        }
    }
}

/// WGSL sources by library id, for backends that compile shader text
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    sources: RwLock<FxHashMap<String, String>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source` under `library_id`. Returns false if the id was
    /// already registered; the existing source is kept.
    pub fn register(&self, library_id: &str, source: &str) -> bool {
        let mut sources = self.sources.write();
        if sources.contains_key(library_id) {
            return false;
        }
        sources.insert(library_id.to_string(), source.to_string());
        true
    }

    pub fn source(&self, library_id: &str) -> Option<String> {
        self.sources.read().get(library_id).cloned()
    }

    pub fn contains(&self, library_id: &str) -> bool {
        self.sources.read().contains_key(library_id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn byte_size(&self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

/// A vertex shader input
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderStageIOSlot {
    pub name: String,
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Interleaved layout of the vertex buffer a pipeline reads
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexDescriptor {
    pub stride: u32,
    pub inputs: Vec<ShaderStageIOSlot>,
}

impl VertexDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input at the next free offset and location
    pub fn add_input(&mut self, name: impl Into<String>, format: VertexFormat) -> &mut Self {
        let location = self.inputs.len() as u32;
        let offset = self.stride;
        self.inputs.push(ShaderStageIOSlot {
            name: name.into(),
            location,
            format,
            offset,
        });
        self.stride += format.byte_size();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_descriptor_offsets() {
        let mut desc = VertexDescriptor::new();
        desc.add_input("position", VertexFormat::Float32x2)
            .add_input("uv", VertexFormat::Float32x2);
        assert_eq!(desc.stride, 16);
        assert_eq!(desc.inputs[1].offset, 8);
        assert_eq!(desc.inputs[1].location, 1);
    }

    #[test]
    fn test_register_keeps_first_source() {
        let library = ShaderLibrary::new();
        assert!(library.register("solid_fill", "a"));
        assert!(!library.register("solid_fill", "b"));
        assert_eq!(library.source("solid_fill").as_deref(), Some("a"));
        assert!(library.source("missing").is_none());
    }
}
